//! Chromatic aberration
//!
//! Offsets the red, green and blue samples independently. In `Uniform` mode
//! each channel has its own constant shift; the scaling modes push channels
//! away from `scale_center` linearly or quadratically with distance. Fields
//! not used by the active mode are kept, so switching back restores them.

use crate::effects::pipeline::UniformBlock;
use crate::effects::stage::{StageEnv, StageVariant};
use crate::shaders;
use crate::ui::widgets::{combo_index, drag_vector};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AberrationMode {
    Uniform = 0,
    Linear = 1,
    Quadratic = 2,
}

impl AberrationMode {
    pub const ALL: [AberrationMode; 3] = [AberrationMode::Uniform, AberrationMode::Linear, AberrationMode::Quadratic];
    const LABELS: [&'static str; 3] = ["Uniform", "Linear scaling", "Quadratic scaling"];

    /// Unknown values fall back to `Uniform`.
    pub fn from_raw(raw: u32) -> Self {
        Self::ALL.get(raw as usize).copied().unwrap_or(AberrationMode::Uniform)
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct AberrationUniforms {
    pub red_shift: [f32; 2],
    pub green_shift: [f32; 2],
    pub blue_shift: [f32; 2],
    pub scale_center: [f32; 2],
    pub scale_intensity: [f32; 3],
    mode: u32,
}

const _: () = assert!(std::mem::size_of::<AberrationUniforms>() % 16 == 0);

impl Default for AberrationUniforms {
    fn default() -> Self {
        Self {
            red_shift: [0.0; 2],
            green_shift: [0.0; 2],
            blue_shift: [0.0; 2],
            scale_center: [0.5, 0.5],
            scale_intensity: [0.0; 3],
            mode: AberrationMode::Uniform as u32,
        }
    }
}

impl AberrationUniforms {
    pub fn mode(&self) -> AberrationMode {
        AberrationMode::from_raw(self.mode)
    }

    pub fn set_mode(&mut self, mode: AberrationMode) {
        self.mode = mode as u32;
    }
}

pub struct AberrationEffect {
    uniforms: UniformBlock<AberrationUniforms>,
}

impl AberrationEffect {
    pub fn new(device: &wgpu::Device) -> Self {
        Self {
            uniforms: UniformBlock::new(device, "Chromatic Aberration Uniforms", AberrationUniforms::default()),
        }
    }

    pub fn uniforms(&self) -> &AberrationUniforms {
        &self.uniforms.values
    }

    pub fn uniforms_mut(&mut self) -> &mut AberrationUniforms {
        &mut self.uniforms.values
    }
}

impl StageVariant for AberrationEffect {
    fn fragment_source(&self) -> &'static str {
        shaders::CHROMATIC_ABERRATION
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
        let defaults = AberrationUniforms::default();
        let values = &mut self.uniforms.values;

        let mut mode = values.mode() as usize;
        if combo_index(ui, "mode", &mut mode, &AberrationMode::LABELS) {
            values.set_mode(AberrationMode::from_raw(mode as u32));
        }

        match values.mode() {
            AberrationMode::Uniform => {
                drag_vector(ui, "red", &mut values.red_shift, defaults.red_shift, 0.001, None);
                drag_vector(ui, "green", &mut values.green_shift, defaults.green_shift, 0.001, None);
                drag_vector(ui, "blue", &mut values.blue_shift, defaults.blue_shift, 0.001, None);
            }
            AberrationMode::Linear | AberrationMode::Quadratic => {
                drag_vector(ui, "center", &mut values.scale_center, defaults.scale_center, 0.01, None);
                drag_vector(ui, "intensity", &mut values.scale_intensity, defaults.scale_intensity, 0.001, None);
            }
        }
    }

    fn reset(&mut self) {
        self.uniforms.values = AberrationUniforms::default();
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
        assert_eq!(size_of::<AberrationUniforms>(), 48);
        assert_eq!(offset_of!(AberrationUniforms, scale_center), 24);
        assert_eq!(offset_of!(AberrationUniforms, scale_intensity), 32);
        assert_eq!(offset_of!(AberrationUniforms, mode), 44);
    }

    #[test]
    fn test_defaults() {
        let defaults = AberrationUniforms::default();
        assert_eq!(defaults.mode(), AberrationMode::Uniform);
        assert_eq!(defaults.red_shift, [0.0, 0.0]);
        assert_eq!(defaults.scale_center, [0.5, 0.5]);
    }

    #[test]
    fn test_mode_switch_keeps_other_fields() {
        let mut uniforms = AberrationUniforms::default();
        uniforms.red_shift = [0.02, -0.01];
        uniforms.set_mode(AberrationMode::Quadratic);
        uniforms.scale_intensity = [0.1, 0.0, -0.1];
        uniforms.set_mode(AberrationMode::Uniform);

        assert_eq!(uniforms.red_shift, [0.02, -0.01]);
        assert_eq!(uniforms.scale_intensity, [0.1, 0.0, -0.1]);
    }

    #[test]
    fn test_unknown_mode_falls_back() {
        assert_eq!(AberrationMode::from_raw(7), AberrationMode::Uniform);
        assert_eq!(AberrationMode::from_raw(1), AberrationMode::Linear);
    }
}
