//! Parameter widgets shared by the stage editors
//!
//! Every numeric widget resets to its default on right-click, so each stage UI
//! gets a per-field "revert" for free.

use std::ops::RangeInclusive;

use egui::{DragValue, PointerButton, Response, Slider, Ui};

// ============================================================================
// Resettable Widget Builder
// ============================================================================

/// Slider or drag value that resets to `default` on right-click.
///
/// ```ignore
/// Resettable::drag(&mut params.radius, 1.0)
///     .speed(0.01)
///     .range(0.0..=10.0)
///     .show(ui);
/// ```
pub struct Resettable<'a, T: Copy + egui::emath::Numeric> {
    value: &'a mut T,
    default: T,
    range: Option<RangeInclusive<T>>,
    speed: Option<f64>,
    is_slider: bool,
}

impl<'a, T: Copy + egui::emath::Numeric> Resettable<'a, T> {
    pub fn slider(value: &'a mut T, range: RangeInclusive<T>, default: T) -> Self {
        Self {
            value,
            default,
            range: Some(range),
            speed: None,
            is_slider: true,
        }
    }

    pub fn drag(value: &'a mut T, default: T) -> Self {
        Self {
            value,
            default,
            range: None,
            speed: None,
            is_slider: false,
        }
    }

    pub fn range(mut self, range: RangeInclusive<T>) -> Self {
        self.range = Some(range);
        self
    }

    pub fn speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }

    pub fn show(self, ui: &mut Ui) -> Response {
        let mut response = match (self.is_slider, self.range) {
            (true, Some(range)) => ui.add(Slider::new(self.value, range)),
            (_, range) => {
                let mut drag = DragValue::new(self.value);
                if let Some(range) = range {
                    drag = drag.range(range);
                }
                if let Some(speed) = self.speed {
                    drag = drag.speed(speed);
                }
                ui.add(drag)
            }
        };

        if response.clicked_by(PointerButton::Secondary) {
            *self.value = self.default;
            response.mark_changed();
        }
        response
    }
}

// ============================================================================
// Labeled Rows
// ============================================================================

/// Labeled drag value. Returns true when the value changed.
pub fn drag_f32(ui: &mut Ui, label: &str, value: &mut f32, default: f32, speed: f64) -> bool {
    ui.horizontal(|ui| {
        let changed = Resettable::drag(value, default).speed(speed).show(ui).changed();
        ui.label(label);
        changed
    })
    .inner
}

/// Labeled row of drag values for a fixed-size vector.
///
/// `range` clamps every component. Returns true when any component changed.
pub fn drag_vector<const N: usize>(
    ui: &mut Ui,
    label: &str,
    values: &mut [f32; N],
    defaults: [f32; N],
    speed: f64,
    range: Option<RangeInclusive<f32>>,
) -> bool {
    ui.horizontal(|ui| {
        let mut changed = false;
        for (value, default) in values.iter_mut().zip(defaults) {
            let mut widget = Resettable::drag(value, default).speed(speed);
            if let Some(range) = range.clone() {
                widget = widget.range(range);
            }
            changed |= widget.show(ui).changed();
        }
        ui.label(label);
        changed
    })
    .inner
}

/// Dropdown over `options`, writing the chosen index. Returns true on change.
pub fn combo_index(ui: &mut Ui, label: &str, selected: &mut usize, options: &[&str]) -> bool {
    let before = *selected;
    let current = options.get(*selected).copied().unwrap_or("");
    egui::ComboBox::from_label(label)
        .selected_text(current)
        .show_ui(ui, |ui| {
            for (index, option) in options.iter().enumerate() {
                ui.selectable_value(selected, index, *option);
            }
        });
    *selected != before
}

/// Checkbox bound to one bit of a control word. Returns true on change.
pub fn flag_checkbox(ui: &mut Ui, label: &str, control: &mut u32, bit: u32) -> bool {
    let mut enabled = *control & bit != 0;
    if ui.checkbox(&mut enabled, label).changed() {
        *control ^= bit;
        return true;
    }
    false
}

// ============================================================================
// Texture Helpers
// ============================================================================

/// Full UV rect (0,0) to (1,1) for rendering an entire texture.
pub const FULL_UV: egui::Rect = egui::Rect {
    min: egui::pos2(0.0, 0.0),
    max: egui::pos2(1.0, 1.0),
};

/// Draw a placeholder when no texture is available.
pub fn draw_texture_placeholder(painter: &egui::Painter, rect: egui::Rect, message: &str) {
    painter.rect_filled(rect, 4.0, egui::Color32::from_gray(30));
    painter.text(
        rect.center(),
        egui::Align2::CENTER_CENTER,
        message,
        egui::FontId::default(),
        egui::Color32::GRAY,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_ui(mut add_contents: impl FnMut(&mut Ui)) {
        let ctx = egui::Context::default();
        let _ = ctx.run(egui::RawInput::default(), |ctx| {
            egui::CentralPanel::default().show(ctx, |ui| add_contents(ui));
        });
    }

    #[test]
    fn test_flag_checkbox_leaves_value_without_input() {
        let mut control = 0b10;
        run_ui(|ui| {
            assert!(!flag_checkbox(ui, "color", &mut control, 1));
        });
        assert_eq!(control, 0b10);
    }

    #[test]
    fn test_widgets_render_headless() {
        let mut values = [0.5_f32, 0.25];
        let mut selected = 1;
        run_ui(|ui| {
            assert!(!drag_vector(ui, "shift", &mut values, [0.0, 0.0], 0.01, Some(-1.0..=1.0)));
            assert!(!combo_index(ui, "mode", &mut selected, &["a", "b", "c"]));
        });
        assert_eq!(values, [0.5, 0.25]);
        assert_eq!(selected, 1);
    }
}
