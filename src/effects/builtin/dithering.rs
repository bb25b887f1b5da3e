//! Dithering
//!
//! Threshold dithering against one luma threshold, or per channel in color
//! mode. The random, halftone and ordered modes can be selected and edited,
//! but the shader currently passes the input through for them.

use crate::effects::pipeline::UniformBlock;
use crate::effects::stage::{StageEnv, StageVariant};
use crate::shaders;
use crate::ui::widgets::{combo_index, drag_f32, drag_vector, flag_checkbox, Resettable};

const CONTROL_COLOR: u32 = 1;
const CONTROL_DYNAMIC: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DitherMode {
    Threshold = 0,
    Random = 1,
    Halftone = 2,
    Bayer = 3,
    VoidAndCluster = 4,
}

impl DitherMode {
    pub const ALL: [DitherMode; 5] = [
        DitherMode::Threshold,
        DitherMode::Random,
        DitherMode::Halftone,
        DitherMode::Bayer,
        DitherMode::VoidAndCluster,
    ];
    const LABELS: [&'static str; 5] = [
        "Threshold",
        "Random",
        "Halftone",
        "Ordered (bayer)",
        "Ordered (void-and-cluster)",
    ];

    pub fn from_raw(raw: u32) -> Self {
        Self::ALL.get(raw as usize).copied().unwrap_or(DitherMode::Threshold)
    }

    /// Whether the shader renders this mode.
    pub fn is_implemented(self) -> bool {
        matches!(self, DitherMode::Threshold)
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DitheringUniforms {
    mode: u32,
    pub control: u32,
    pub threshold: f32,
    _pad0: f32,
    pub threshold_rgb: [f32; 3],
    _pad1: f32,
    pub random_min_rgb: [f32; 3],
    _pad2: f32,
    pub random_max_rgb: [f32; 3],
    pub random_min: f32,
    pub random_max: f32,
    pub halftone_scale: f32,
    pub halftone_angle: f32,
    pub bayer_steps: u32,
}

const _: () = assert!(std::mem::size_of::<DitheringUniforms>() % 16 == 0);

impl Default for DitheringUniforms {
    fn default() -> Self {
        Self {
            mode: DitherMode::Threshold as u32,
            control: 0,
            threshold: 0.5,
            _pad0: 0.0,
            threshold_rgb: [0.5; 3],
            _pad1: 0.0,
            random_min_rgb: [0.0; 3],
            _pad2: 0.0,
            random_max_rgb: [1.0; 3],
            random_min: 0.0,
            random_max: 1.0,
            halftone_scale: 10.0,
            halftone_angle: 0.0,
            bayer_steps: 3,
        }
    }
}

impl DitheringUniforms {
    pub fn mode(&self) -> DitherMode {
        DitherMode::from_raw(self.mode)
    }

    pub fn set_mode(&mut self, mode: DitherMode) {
        self.mode = mode as u32;
    }

    pub fn color_mode(&self) -> bool {
        self.control & CONTROL_COLOR != 0
    }
}

pub struct DitheringEffect {
    uniforms: UniformBlock<DitheringUniforms>,
}

impl DitheringEffect {
    pub fn new(device: &wgpu::Device) -> Self {
        Self {
            uniforms: UniformBlock::new(device, "Dithering Uniforms", DitheringUniforms::default()),
        }
    }

    pub fn uniforms(&self) -> &DitheringUniforms {
        &self.uniforms.values
    }

    pub fn uniforms_mut(&mut self) -> &mut DitheringUniforms {
        &mut self.uniforms.values
    }
}

impl StageVariant for DitheringEffect {
    fn fragment_source(&self) -> &'static str {
        shaders::DITHERING
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
        let defaults = DitheringUniforms::default();
        let values = &mut self.uniforms.values;

        let mut mode = values.mode() as usize;
        if combo_index(ui, "mode", &mut mode, &DitherMode::LABELS) {
            values.set_mode(DitherMode::from_raw(mode as u32));
        }
        flag_checkbox(ui, "color mode", &mut values.control, CONTROL_COLOR);

        let color = values.color_mode();
        match values.mode() {
            DitherMode::Threshold if color => {
                drag_vector(ui, "threshold", &mut values.threshold_rgb, defaults.threshold_rgb, 0.001, None);
            }
            DitherMode::Threshold => {
                drag_f32(ui, "threshold", &mut values.threshold, defaults.threshold, 0.001);
            }
            DitherMode::Random => {
                flag_checkbox(ui, "dynamic", &mut values.control, CONTROL_DYNAMIC);
                if color {
                    drag_vector(ui, "min threshold", &mut values.random_min_rgb, defaults.random_min_rgb, 0.001, None);
                    drag_vector(ui, "max threshold", &mut values.random_max_rgb, defaults.random_max_rgb, 0.001, None);
                } else {
                    drag_f32(ui, "min threshold", &mut values.random_min, defaults.random_min, 0.001);
                    drag_f32(ui, "max threshold", &mut values.random_max, defaults.random_max, 0.001);
                }
            }
            DitherMode::Halftone => {
                drag_f32(ui, "size", &mut values.halftone_scale, defaults.halftone_scale, 0.1);
                drag_f32(ui, "orientation", &mut values.halftone_angle, defaults.halftone_angle, 0.01);
            }
            DitherMode::Bayer => {
                ui.horizontal(|ui| {
                    Resettable::slider(&mut values.bayer_steps, 0..=10, defaults.bayer_steps).show(ui);
                    ui.label("steps");
                });
            }
            DitherMode::VoidAndCluster => {}
        }

        if !values.mode().is_implemented() {
            ui.weak("Preview not available for this mode yet");
        }
    }

    fn reset(&mut self) {
        self.uniforms.values = DitheringUniforms::default();
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
        assert_eq!(size_of::<DitheringUniforms>(), 80);
        assert_eq!(offset_of!(DitheringUniforms, threshold_rgb), 16);
        assert_eq!(offset_of!(DitheringUniforms, random_min_rgb), 32);
        assert_eq!(offset_of!(DitheringUniforms, random_max_rgb), 48);
        assert_eq!(offset_of!(DitheringUniforms, random_min), 60);
        assert_eq!(offset_of!(DitheringUniforms, bayer_steps), 76);
    }

    #[test]
    fn test_defaults() {
        let defaults = DitheringUniforms::default();
        assert_eq!(defaults.mode(), DitherMode::Threshold);
        assert!(!defaults.color_mode());
        assert_eq!(defaults.threshold, 0.5);
        assert_eq!(defaults.random_max_rgb, [1.0; 3]);
        assert_eq!(defaults.halftone_scale, 10.0);
        assert_eq!(defaults.bayer_steps, 3);
    }

    #[test]
    fn test_only_threshold_is_implemented() {
        let implemented: Vec<_> = DitherMode::ALL.into_iter().filter(|m| m.is_implemented()).collect();
        assert_eq!(implemented, vec![DitherMode::Threshold]);
        assert_eq!(DitherMode::from_raw(4), DitherMode::VoidAndCluster);
        assert_eq!(DitherMode::from_raw(99), DitherMode::Threshold);
    }
}
