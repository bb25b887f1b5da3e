//! Copies its input unchanged.

use crate::effects::stage::{StageEnv, StageVariant};
use crate::shaders;

#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughEffect;

impl StageVariant for PassthroughEffect {
    fn fragment_source(&self) -> &'static str {
        shaders::PASSTHROUGH
    }

    fn bind_group_layouts(&self) -> Vec<&wgpu::BindGroupLayout> {
        Vec::new()
    }

    fn set_bind_groups(&self, _pass: &mut wgpu::RenderPass<'_>) {}

    fn write_buffers(&self, _queue: &wgpu::Queue) {}

    fn display(&mut self, ui: &mut egui::Ui, _env: &StageEnv<'_>) {
        ui.weak("No parameters");
    }

    fn reset(&mut self) {}

    fn uniform_bytes(&self) -> &[u8] {
        &[]
    }
}
