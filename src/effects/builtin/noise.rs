//! Film-grain noise
//!
//! `control` bit 0 selects per-channel bounds (`colored_*`) instead of one
//! scalar range for all channels; bit 1 re-rolls the grain every frame.
//! Lower bounds never exceed upper bounds: an edit that would cross them is
//! clamped to the opposite bound.

use crate::effects::pipeline::UniformBlock;
use crate::effects::stage::{StageEnv, StageVariant};
use crate::shaders;
use crate::ui::widgets::{drag_vector, flag_checkbox, Resettable};

pub const CONTROL_COLOR: u32 = 1;
pub const CONTROL_DYNAMIC: u32 = 2;

const BOUND_RANGE: std::ops::RangeInclusive<f32> = -1.0..=1.0;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct NoiseUniforms {
    pub colored_min: [f32; 3],
    pub min: f32,
    pub colored_max: [f32; 3],
    pub max: f32,
    pub control: u32,
    pub seed: u32,
    _pad: [u32; 2],
}

const _: () = assert!(std::mem::size_of::<NoiseUniforms>() % 16 == 0);

impl Default for NoiseUniforms {
    fn default() -> Self {
        Self {
            colored_min: [-0.1; 3],
            min: -0.1,
            colored_max: [0.1; 3],
            max: 0.1,
            control: CONTROL_COLOR | CONTROL_DYNAMIC,
            seed: 0,
            _pad: [0; 2],
        }
    }
}

/// Which side of the range was just edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Min,
    Max,
}

impl NoiseUniforms {
    pub fn color_mode(&self) -> bool {
        self.control & CONTROL_COLOR != 0
    }

    pub fn dynamic(&self) -> bool {
        self.control & CONTROL_DYNAMIC != 0
    }

    /// Restore `min <= max` after editing `edited`, per channel in color mode.
    ///
    /// The edited side yields: a min raised above the max becomes the max and
    /// vice versa. Returns true if anything was corrected.
    pub fn clamp_after_edit(&mut self, edited: Bound) -> bool {
        let mut corrected = false;
        if self.color_mode() {
            for channel in 0..3 {
                corrected |= clamp_pair(&mut self.colored_min[channel], &mut self.colored_max[channel], edited);
            }
        } else {
            corrected |= clamp_pair(&mut self.min, &mut self.max, edited);
        }
        if corrected {
            tracing::warn!("Noise bounds crossed after editing {:?}, clamped", edited);
        }
        corrected
    }
}

fn clamp_pair(min: &mut f32, max: &mut f32, edited: Bound) -> bool {
    if *min <= *max {
        return false;
    }
    match edited {
        Bound::Min => *min = *max,
        Bound::Max => *max = *min,
    }
    true
}

pub struct NoiseEffect {
    uniforms: UniformBlock<NoiseUniforms>,
}

impl NoiseEffect {
    pub fn new(device: &wgpu::Device) -> Self {
        Self {
            uniforms: UniformBlock::new(device, "Noise Uniforms", NoiseUniforms::default()),
        }
    }

    pub fn uniforms(&self) -> &NoiseUniforms {
        &self.uniforms.values
    }

    pub fn uniforms_mut(&mut self) -> &mut NoiseUniforms {
        &mut self.uniforms.values
    }
}

impl StageVariant for NoiseEffect {
    fn fragment_source(&self) -> &'static str {
        shaders::NOISE
    }

    fn bind_group_layouts(&self) -> Vec<&wgpu::BindGroupLayout> {
        vec![self.uniforms.layout()]
    }

    fn set_bind_groups(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_bind_group(1, self.uniforms.bind_group(), &[]);
    }

    fn write_buffers(&self, queue: &wgpu::Queue) {
        self.uniforms.write(queue);
    }

    fn display(&mut self, ui: &mut egui::Ui, _env: &StageEnv<'_>) {
        let defaults = NoiseUniforms::default();
        let values = &mut self.uniforms.values;

        flag_checkbox(ui, "color mode", &mut values.control, CONTROL_COLOR);
        flag_checkbox(ui, "dynamic", &mut values.control, CONTROL_DYNAMIC);

        ui.horizontal(|ui| {
            Resettable::drag(&mut values.seed, defaults.seed).show(ui);
            ui.label("seed");
            if ui.small_button("🎲").on_hover_text("Random seed").clicked() {
                values.seed = rand::random::<u32>() >> 1;
            }
        });

        if values.color_mode() {
            if drag_vector(ui, "min", &mut values.colored_min, defaults.colored_min, 0.01, Some(BOUND_RANGE)) {
                values.clamp_after_edit(Bound::Min);
            }
            if drag_vector(ui, "max", &mut values.colored_max, defaults.colored_max, 0.01, Some(BOUND_RANGE)) {
                values.clamp_after_edit(Bound::Max);
            }
        } else {
            let [mut min, mut max] = [[values.min], [values.max]];
            if drag_vector(ui, "min", &mut min, [defaults.min], 0.01, Some(BOUND_RANGE)) {
                values.min = min[0];
                values.clamp_after_edit(Bound::Min);
            }
            if drag_vector(ui, "max", &mut max, [defaults.max], 0.01, Some(BOUND_RANGE)) {
                values.max = max[0];
                values.clamp_after_edit(Bound::Max);
            }
        }
    }

    fn reset(&mut self) {
        self.uniforms.values = NoiseUniforms::default();
    }

    fn uniform_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(&self.uniforms.values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{offset_of, size_of};

    #[test]
    fn test_uniform_layout_matches_shader() {
        assert_eq!(size_of::<NoiseUniforms>(), 48);
        assert_eq!(offset_of!(NoiseUniforms, min), 12);
        assert_eq!(offset_of!(NoiseUniforms, colored_max), 16);
        assert_eq!(offset_of!(NoiseUniforms, control), 32);
        assert_eq!(offset_of!(NoiseUniforms, seed), 36);
    }

    #[test]
    fn test_defaults() {
        let defaults = NoiseUniforms::default();
        assert!(defaults.color_mode());
        assert!(defaults.dynamic());
        assert_eq!(defaults.control, 3);
        assert_eq!(defaults.colored_min, [-0.1; 3]);
        assert_eq!(defaults.max, 0.1);
    }

    #[test]
    fn test_min_above_max_is_forced_down() {
        let mut uniforms = NoiseUniforms::default();
        uniforms.control = 0;
        uniforms.min = 0.5;
        assert!(uniforms.clamp_after_edit(Bound::Min));
        assert_eq!(uniforms.min, 0.1);
        assert_eq!(uniforms.max, 0.1);
    }

    #[test]
    fn test_max_below_min_is_forced_up() {
        let mut uniforms = NoiseUniforms::default();
        uniforms.control = 0;
        uniforms.max = -0.7;
        assert!(uniforms.clamp_after_edit(Bound::Max));
        assert_eq!(uniforms.max, -0.1);
        assert_eq!(uniforms.min, -0.1);
    }

    #[test]
    fn test_color_mode_clamps_per_channel() {
        let mut uniforms = NoiseUniforms::default();
        uniforms.colored_min = [0.0, 0.3, -0.5];
        uniforms.colored_max = [0.2, 0.2, 0.2];
        assert!(uniforms.clamp_after_edit(Bound::Min));
        assert_eq!(uniforms.colored_min, [0.0, 0.2, -0.5]);
        assert_eq!(uniforms.colored_max, [0.2, 0.2, 0.2]);

        uniforms.colored_max = [-0.4, 0.2, 0.9];
        assert!(uniforms.clamp_after_edit(Bound::Max));
        assert_eq!(uniforms.colored_max, [0.0, 0.2, 0.9]);
    }

    #[test]
    fn test_valid_bounds_untouched() {
        let mut uniforms = NoiseUniforms::default();
        assert!(!uniforms.clamp_after_edit(Bound::Min));
        assert!(!uniforms.clamp_after_edit(Bound::Max));
        assert_eq!(uniforms, NoiseUniforms::default());
    }
}
