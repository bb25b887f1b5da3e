//! Circle mask
//!
//! Keeps the input inside a circle, draws a white border ring and blacks out
//! everything else. Coordinates are normalized device coordinates with the x
//! axis scaled by the aspect ratio, so the circle stays round.

use crate::effects::pipeline::UniformBlock;
use crate::effects::stage::{StageEnv, StageVariant};
use crate::shaders;
use crate::ui::widgets::{drag_vector, Resettable};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CircleUniforms {
    pub center_x: f32,
    pub center_y: f32,
    pub radius: f32,
    pub border_width: f32,
}

const _: () = assert!(std::mem::size_of::<CircleUniforms>() % 16 == 0);

impl Default for CircleUniforms {
    fn default() -> Self {
        Self {
            center_x: 0.0,
            center_y: 0.0,
            radius: 1.0,
            border_width: 0.1,
        }
    }
}

pub struct CircleEffect {
    uniforms: UniformBlock<CircleUniforms>,
}

impl CircleEffect {
    pub fn new(device: &wgpu::Device) -> Self {
        Self {
            uniforms: UniformBlock::new(device, "Circle Uniforms", CircleUniforms::default()),
        }
    }

    pub fn uniforms(&self) -> &CircleUniforms {
        &self.uniforms.values
    }

    pub fn uniforms_mut(&mut self) -> &mut CircleUniforms {
        &mut self.uniforms.values
    }
}

impl StageVariant for CircleEffect {
    fn fragment_source(&self) -> &'static str {
        shaders::CIRCLE
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
        let defaults = CircleUniforms::default();
        let values = &mut self.uniforms.values;

        let mut center = [values.center_x, values.center_y];
        if drag_vector(ui, "position", &mut center, [defaults.center_x, defaults.center_y], 0.01, None) {
            [values.center_x, values.center_y] = center;
        }
        ui.horizontal(|ui| {
            Resettable::drag(&mut values.radius, defaults.radius)
                .speed(0.01)
                .range(0.0..=f32::MAX)
                .show(ui);
            ui.label("radius");
        });
        ui.horizontal(|ui| {
            Resettable::drag(&mut values.border_width, defaults.border_width)
                .speed(0.01)
                .range(0.0..=10.0)
                .show(ui);
            ui.label("border width");
        });
    }

    fn reset(&mut self) {
        self.uniforms.values = CircleUniforms::default();
    }

    fn uniform_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(&self.uniforms.values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu_context::test_support;

    #[test]
    fn test_default_uniforms() {
        let defaults = CircleUniforms::default();
        assert_eq!(
            bytemuck::cast::<_, [f32; 4]>(defaults),
            [0.0, 0.0, 1.0, 0.1]
        );
    }

    #[test]
    fn test_reset_restores_defaults() {
        let Some(gpu) = test_support::gpu() else { return };
        let mut circle = CircleEffect::new(gpu.device());
        circle.uniforms_mut().radius = 0.25;
        circle.uniforms_mut().center_x = -0.5;
        circle.reset();
        assert_eq!(*circle.uniforms(), CircleUniforms::default());
    }
}
