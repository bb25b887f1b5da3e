//! 2-D drag pad for positioning a box inside the render target
//!
//! The pad shows the render target scaled to fit, the (rotated) outline of the
//! box and a handle at its top-left corner. Dragging anywhere on the pad moves
//! the box; the position stays inside the render target.

use egui::{Color32, Response, Sense, Stroke, Ui, Widget};

pub const DEFAULT_PAD_SIZE: f32 = 200.0;

/// Clamp `pos` into `[0, bounds]` on both axes.
pub fn clamp_position(pos: [f32; 2], bounds: [f32; 2]) -> [f32; 2] {
    [pos[0].clamp(0.0, bounds[0].max(0.0)), pos[1].clamp(0.0, bounds[1].max(0.0))]
}

pub struct Box2D<'a> {
    pos: &'a mut [f32; 2],
    size: [f32; 2],
    rotation: f32,
    bounds: [f32; 2],
    pad_size: f32,
}

impl<'a> Box2D<'a> {
    /// `pos` and `size` are in render-target pixels; `bounds` is the render-target size.
    pub fn new(pos: &'a mut [f32; 2], size: [f32; 2], rotation: f32, bounds: [u32; 2]) -> Self {
        Self {
            pos,
            size,
            rotation,
            bounds: [bounds[0].max(1) as f32, bounds[1].max(1) as f32],
            pad_size: DEFAULT_PAD_SIZE,
        }
    }

    pub fn pad_size(mut self, pad_size: f32) -> Self {
        self.pad_size = pad_size;
        self
    }
}

impl Widget for Box2D<'_> {
    fn ui(self, ui: &mut Ui) -> Response {
        let (rect, mut response) = ui.allocate_exact_size(egui::vec2(self.pad_size, self.pad_size), Sense::drag());

        let scale = self.pad_size / self.bounds[0].max(self.bounds[1]);
        let area = egui::Rect::from_center_size(rect.center(), egui::vec2(self.bounds[0], self.bounds[1]) * scale);
        let to_screen = |p: egui::Vec2| area.min + p * scale;

        if response.dragged() {
            let delta = response.drag_delta() / scale;
            let moved = [self.pos[0] + delta.x, self.pos[1] + delta.y];
            *self.pos = clamp_position(moved, self.bounds);
            response.mark_changed();
        }

        if ui.is_rect_visible(rect) {
            let painter = ui.painter_at(rect);
            let visuals = ui.visuals();
            painter.rect_filled(rect, 2.0, visuals.extreme_bg_color);
            painter.rect_stroke(area, 0.0, visuals.widgets.noninteractive.bg_stroke, egui::StrokeKind::Inside);

            let pos = egui::vec2(self.pos[0], self.pos[1]);
            let half = egui::vec2(self.size[0], self.size[1]) * 0.5;
            let center = pos + half;
            let (sin, cos) = self.rotation.sin_cos();
            let corners = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)]
                .into_iter()
                .map(|(sx, sy)| {
                    let local = egui::vec2(sx * half.x, sy * half.y);
                    let rotated = egui::vec2(local.x * cos - local.y * sin, local.x * sin + local.y * cos);
                    to_screen(center + rotated)
                })
                .collect::<Vec<_>>();

            let accent = visuals.selection.bg_fill;
            painter.add(egui::Shape::closed_line(corners, Stroke::new(1.5, accent)));
            painter.circle_filled(to_screen(pos), 4.0, if response.dragged() { Color32::WHITE } else { accent });
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_position() {
        assert_eq!(clamp_position([10.0, 20.0], [64.0, 64.0]), [10.0, 20.0]);
        assert_eq!(clamp_position([-5.0, 100.0], [64.0, 32.0]), [0.0, 32.0]);
    }

    #[test]
    fn test_pad_without_input_keeps_position() {
        let mut pos = [12.0, 8.0];
        let ctx = egui::Context::default();
        let _ = ctx.run(egui::RawInput::default(), |ctx| {
            egui::CentralPanel::default().show(ctx, |ui| {
                let response = ui.add(Box2D::new(&mut pos, [4.0, 4.0], 0.3, [64, 64]).pad_size(100.0));
                assert!(!response.changed());
            });
        });
        assert_eq!(pos, [12.0, 8.0]);
    }
}
