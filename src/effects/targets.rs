//! Ping-pong render targets and the shared default bind group
//!
//! `RenderTargets` is built in one piece: both textures, their views, and the
//! two group-0 bind groups that sample them. A resize replaces the whole value,
//! so a bind group can never refer to a view from an older allocation.

use crate::effects::pipeline::{sampler_entry, texture_entry, uniform_buffer, uniform_entry, TARGET_FORMAT};
use crate::effects::ping_pong::{PingPong, Slot};

/// Per-frame constants visible to every stage (group 0, binding 2).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DefaultUniforms {
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Seconds since the manager was created
    pub time: f32,
    pub _pad: f32,
}

const _: () = assert!(std::mem::size_of::<DefaultUniforms>() % 16 == 0);

pub struct RenderTargets {
    size: [u32; 2],
    generation: u64,
    textures: PingPong<wgpu::Texture>,
    views: PingPong<wgpu::TextureView>,
    /// Group 0 instances; the one stored under a slot samples that slot's view.
    sampling_groups: PingPong<wgpu::BindGroup>,
    layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    _sampler: wgpu::Sampler,
}

impl RenderTargets {
    /// Allocate targets of `size` (each axis at least 1 pixel).
    pub fn new(device: &wgpu::Device, size: [u32; 2], generation: u64) -> Self {
        let size = [size[0].max(1), size[1].max(1)];

        let textures = PingPong::from_fn(|slot| create_target(device, size, slot));
        let views = textures.map(|texture| texture.create_view(&wgpu::TextureViewDescriptor::default()));

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Stage Input Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let uniform_buffer = uniform_buffer::<DefaultUniforms>(device, "Default Uniforms");

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Default Bind Group Layout"),
            entries: &[
                texture_entry(0),
                sampler_entry(1),
                uniform_entry::<DefaultUniforms>(2, wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT),
            ],
        });

        let sampling_groups = views.map(|view| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Default Bind Group"),
                layout: &layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&sampler),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: uniform_buffer.as_entire_binding(),
                    },
                ],
            })
        });

        tracing::debug!("Allocated ping-pong targets {}x{} (generation {})", size[0], size[1], generation);

        Self {
            size,
            generation,
            textures,
            views,
            sampling_groups,
            layout,
            uniform_buffer,
            _sampler: sampler,
        }
    }

    pub fn size(&self) -> [u32; 2] {
        self.size
    }

    /// Incremented by the owner on every reallocation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn texture(&self, slot: Slot) -> &wgpu::Texture {
        self.textures.get(slot)
    }

    pub fn view(&self, slot: Slot) -> &wgpu::TextureView {
        self.views.get(slot)
    }

    /// Group 0 that samples `slot`.
    pub fn sampling_group(&self, slot: Slot) -> &wgpu::BindGroup {
        self.sampling_groups.get(slot)
    }

    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }

    pub fn write_uniforms(&self, queue: &wgpu::Queue, time: f32) {
        let uniforms = DefaultUniforms {
            viewport_width: self.size[0],
            viewport_height: self.size[1],
            time,
            _pad: 0.0,
        };
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));
    }
}

fn create_target(device: &wgpu::Device, size: [u32; 2], slot: Slot) -> wgpu::Texture {
    let label = match slot {
        Slot::A => "Stage Target A",
        Slot::B => "Stage Target B",
    };
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: size[0],
            height: size[1],
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: TARGET_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu_context::test_support;

    #[test]
    fn test_default_uniform_layout() {
        assert_eq!(std::mem::size_of::<DefaultUniforms>(), 16);
        assert_eq!(std::mem::offset_of!(DefaultUniforms, time), 8);
    }

    #[test]
    fn test_targets_match_requested_size() {
        let Some(gpu) = test_support::gpu() else { return };
        let targets = RenderTargets::new(gpu.device(), [64, 32], 3);
        assert_eq!(targets.size(), [64, 32]);
        assert_eq!(targets.generation(), 3);
        for slot in [Slot::A, Slot::B] {
            assert_eq!(targets.texture(slot).width(), 64);
            assert_eq!(targets.texture(slot).height(), 32);
            assert_eq!(targets.texture(slot).format(), TARGET_FORMAT);
        }
    }

    #[test]
    fn test_zero_size_is_clamped() {
        let Some(gpu) = test_support::gpu() else { return };
        let targets = RenderTargets::new(gpu.device(), [0, 10], 0);
        assert_eq!(targets.size(), [1, 10]);
    }
}
