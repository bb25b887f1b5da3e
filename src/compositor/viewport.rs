//! Pan and zoom for the output preview
//!
//! Only the on-screen presentation is affected; the render targets keep their
//! resolution.

/// Minimum zoom level (10%)
pub const MIN_ZOOM: f32 = 0.1;
/// Maximum zoom level (10000%)
pub const MAX_ZOOM: f32 = 100.0;
/// Zoom change per scroll notch
pub const ZOOM_STEP: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayState {
    /// 1.0 = fit to the preview region
    zoom: f32,
    /// Pan in render-target pixels, applied before zoom
    offset: egui::Vec2,
}

impl Default for DisplayState {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            offset: egui::Vec2::ZERO,
        }
    }
}

impl DisplayState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn offset(&self) -> egui::Vec2 {
        self.offset
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Zoom by `notches` scroll steps (positive zooms in).
    pub fn on_scroll(&mut self, notches: f32) {
        self.zoom = (self.zoom + notches * ZOOM_STEP).clamp(MIN_ZOOM, MAX_ZOOM);
    }

    /// Pan by a screen-space drag delta.
    pub fn on_drag(&mut self, delta: egui::Vec2) {
        self.offset += delta / self.zoom;
    }

    /// Screen rect for a texture of `texture_size` shown inside `region`.
    ///
    /// The texture is fitted by the smaller of the two axis ratios, centered,
    /// then scaled by zoom around the region center and shifted by the pan.
    pub fn fit_rect(&self, region: egui::Rect, texture_size: [u32; 2]) -> egui::Rect {
        let texture = egui::vec2(texture_size[0].max(1) as f32, texture_size[1].max(1) as f32);
        let ratio = (region.width() / texture.x).min(region.height() / texture.y);
        let size = texture * ratio * self.zoom;
        let center = region.center() + self.offset * self.zoom;
        egui::Rect::from_center_size(center, size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_display_state() {
        let state = DisplayState::new();
        assert_eq!(state.zoom(), 1.0);
        assert_eq!(state.offset(), egui::Vec2::ZERO);
    }

    #[test]
    fn test_zoom_clamping() {
        let mut state = DisplayState::new();
        for _ in 0..5000 {
            state.on_scroll(1.0);
        }
        assert_eq!(state.zoom(), MAX_ZOOM);

        for _ in 0..5000 {
            state.on_scroll(-1.0);
        }
        assert_eq!(state.zoom(), MIN_ZOOM);
    }

    #[test]
    fn test_scroll_step() {
        let mut state = DisplayState::new();
        state.on_scroll(2.0);
        assert!((state.zoom() - 1.2).abs() < 1e-6);
    }

    #[test]
    fn test_drag_is_scaled_by_zoom() {
        let mut state = DisplayState::new();
        state.on_scroll(10.0);
        state.on_drag(egui::vec2(20.0, -10.0));
        assert_eq!(state.offset(), egui::vec2(10.0, -5.0));

        state.reset();
        assert_eq!(state, DisplayState::default());
    }

    #[test]
    fn test_fit_rect_uses_min_ratio() {
        let state = DisplayState::new();
        let region = egui::Rect::from_min_size(egui::pos2(0.0, 0.0), egui::vec2(400.0, 400.0));

        let wide = state.fit_rect(region, [200, 100]);
        assert_eq!(wide.size(), egui::vec2(400.0, 200.0));
        assert_eq!(wide.center(), region.center());

        let tall = state.fit_rect(region, [100, 200]);
        assert_eq!(tall.size(), egui::vec2(200.0, 400.0));
    }

    #[test]
    fn test_fit_rect_applies_zoom_and_pan() {
        let mut state = DisplayState::new();
        state.on_scroll(10.0);
        state.on_drag(egui::vec2(50.0, 0.0));
        let region = egui::Rect::from_min_size(egui::pos2(0.0, 0.0), egui::vec2(100.0, 100.0));

        let rect = state.fit_rect(region, [10, 10]);
        assert_eq!(rect.size(), egui::vec2(200.0, 200.0));
        assert_eq!(rect.center(), egui::pos2(100.0, 50.0));
    }
}
