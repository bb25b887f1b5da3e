//! Image compositing
//!
//! Draws an imported image over the input at a pixel position, size, rotation
//! and opacity. The stage refers to the image by id and keeps its group 1 in
//! sync through a resource subscription: when the image is re-imported the
//! bind group is rebuilt against the new texture view immediately.

use std::cell::RefCell;
use std::rc::Rc;

use crate::effects::pipeline::{sampler_entry, texture_entry, uniform_buffer, uniform_entry};
use crate::effects::stage::{StageEnv, StageVariant};
use crate::resources::{ImageId, ImageUpdate, LifetimeToken, ResourceError, ResourceManager};
use crate::shaders;
use crate::ui::box2d::{clamp_position, Box2D};
use crate::ui::widgets::{drag_f32, drag_vector, Resettable};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ImageUniforms {
    /// Width and height in render-target pixels
    pub size: [f32; 2],
    /// Top-left corner in render-target pixels
    pub pos: [f32; 2],
    /// Radians, about the image center
    pub rotation: f32,
    pub opacity: f32,
    _pad: [f32; 2],
}

const _: () = assert!(std::mem::size_of::<ImageUniforms>() % 16 == 0);

impl ImageUniforms {
    /// Defaults for an image of `width`×`height`: native size at the origin, opaque.
    pub fn for_image(width: u32, height: u32) -> Self {
        Self {
            size: [width as f32, height as f32],
            pos: [0.0, 0.0],
            rotation: 0.0,
            opacity: 1.0,
            _pad: [0.0; 2],
        }
    }
}

/// Group 1 as currently bound, and which upload of the image it points at.
struct ImageBinding {
    bind_group: wgpu::BindGroup,
    revision: u64,
    size: [u32; 2],
}

/// Everything needed to rebuild group 1 for a new texture view.
#[derive(Clone)]
struct BindingParts {
    device: wgpu::Device,
    layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    buffer: wgpu::Buffer,
}

impl BindingParts {
    fn bind(&self, view: &wgpu::TextureView) -> wgpu::BindGroup {
        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Image Stage Bind Group"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: self.buffer.as_entire_binding(),
                },
            ],
        })
    }
}

pub struct ImageEffect {
    image: ImageId,
    uniforms: ImageUniforms,
    parts: BindingParts,
    binding: Rc<RefCell<ImageBinding>>,
    render_size: [u32; 2],
    _lifetime: LifetimeToken,
}

impl ImageEffect {
    /// Bind `image` and subscribe to its updates. Fails if the id is unknown.
    pub fn new(
        device: &wgpu::Device,
        resources: &mut ResourceManager,
        image: ImageId,
        render_size: [u32; 2],
    ) -> Result<Self, ResourceError> {
        let (view, size, revision) = {
            let resource = resources.get_image(image)?;
            (resource.view().clone(), [resource.width(), resource.height()], resource.revision())
        };

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Image Stage Bind Group Layout"),
            entries: &[
                texture_entry(0),
                sampler_entry(1),
                uniform_entry::<ImageUniforms>(2, wgpu::ShaderStages::FRAGMENT),
            ],
        });
        let parts = BindingParts {
            device: device.clone(),
            layout,
            sampler: resources.default_sampler().clone(),
            buffer: uniform_buffer::<ImageUniforms>(device, "Image Stage Uniforms"),
        };

        let binding = Rc::new(RefCell::new(ImageBinding {
            bind_group: parts.bind(&view),
            revision,
            size,
        }));

        let lifetime = LifetimeToken::new();
        let rebind_parts = parts.clone();
        let target = Rc::downgrade(&binding);
        resources.subscribe(image, &lifetime, move |update: &ImageUpdate| {
            if let Some(binding) = target.upgrade() {
                *binding.borrow_mut() = ImageBinding {
                    bind_group: rebind_parts.bind(&update.view),
                    revision: update.revision,
                    size: [update.width, update.height],
                };
                tracing::debug!("Image stage rebound to {} (revision {})", update.id, update.revision);
            }
        })?;

        Ok(Self {
            image,
            uniforms: ImageUniforms::for_image(size[0], size[1]),
            parts,
            binding,
            render_size,
            _lifetime: lifetime,
        })
    }

    pub fn image(&self) -> ImageId {
        self.image
    }

    pub fn uniforms(&self) -> &ImageUniforms {
        &self.uniforms
    }

    pub fn uniforms_mut(&mut self) -> &mut ImageUniforms {
        &mut self.uniforms
    }

    /// Revision of the image upload group 1 currently samples.
    pub fn bound_revision(&self) -> u64 {
        self.binding.borrow().revision
    }

    /// Pixel size of the texture group 1 currently samples.
    pub fn bound_size(&self) -> [u32; 2] {
        self.binding.borrow().size
    }

    /// Bounds of the drag pad. The position is pulled back inside them.
    pub fn set_render_size(&mut self, render_size: [u32; 2]) {
        self.render_size = render_size;
        self.uniforms.pos = clamp_position(self.uniforms.pos, self.bounds());
    }

    fn bounds(&self) -> [f32; 2] {
        [self.render_size[0] as f32, self.render_size[1] as f32]
    }
}

impl StageVariant for ImageEffect {
    fn fragment_source(&self) -> &'static str {
        shaders::IMAGE
    }

    fn bind_group_layouts(&self) -> Vec<&wgpu::BindGroupLayout> {
        vec![&self.parts.layout]
    }

    fn set_bind_groups(&self, pass: &mut wgpu::RenderPass<'_>) {
        let binding = self.binding.borrow();
        pass.set_bind_group(1, &binding.bind_group, &[]);
    }

    fn write_buffers(&self, queue: &wgpu::Queue) {
        queue.write_buffer(&self.parts.buffer, 0, bytemuck::bytes_of(&self.uniforms));
    }

    fn display(&mut self, ui: &mut egui::Ui, env: &StageEnv<'_>) {
        let size = self.bound_size();
        let defaults = ImageUniforms::for_image(size[0], size[1]);
        let bounds = self.bounds();
        let values = &mut self.uniforms;

        match env.resources.get_image(self.image) {
            Ok(image) => ui.weak(format!("{} ({}x{})", image.name(), size[0], size[1])),
            Err(_) => ui.weak(format!("image {}", self.image)),
        };

        ui.add(Box2D::new(&mut values.pos, values.size, values.rotation, self.render_size));
        drag_vector(ui, "position", &mut values.pos, defaults.pos, 1.0, None);
        values.pos = clamp_position(values.pos, bounds);
        drag_vector(ui, "size", &mut values.size, defaults.size, 1.0, Some(0.0..=f32::MAX));
        drag_f32(ui, "rotation", &mut values.rotation, defaults.rotation, 0.01);
        ui.horizontal(|ui| {
            Resettable::slider(&mut values.opacity, 0.0..=1.0, defaults.opacity).show(ui);
            ui.label("opacity");
        });
    }

    /// Native size of the currently bound image, at the origin, opaque.
    fn reset(&mut self) {
        let size = self.bound_size();
        self.uniforms = ImageUniforms::for_image(size[0], size[1]);
    }

    fn uniform_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(&self.uniforms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu_context::test_support;
    use crate::resources::{solid_image, ImageSource};
    use std::mem::{offset_of, size_of};

    #[test]
    fn test_uniform_layout_matches_shader() {
        assert_eq!(size_of::<ImageUniforms>(), 32);
        assert_eq!(offset_of!(ImageUniforms, pos), 8);
        assert_eq!(offset_of!(ImageUniforms, rotation), 16);
        assert_eq!(offset_of!(ImageUniforms, opacity), 20);
    }

    #[test]
    fn test_defaults_follow_image_size() {
        let uniforms = ImageUniforms::for_image(640, 480);
        assert_eq!(uniforms.size, [640.0, 480.0]);
        assert_eq!(uniforms.pos, [0.0, 0.0]);
        assert_eq!(uniforms.opacity, 1.0);
    }

    #[test]
    fn test_rebinds_on_image_update() {
        let Some(gpu) = test_support::gpu() else { return };
        let mut resources = ResourceManager::new(&gpu);
        let id = resources
            .add_image("red", ImageSource::Pixels(solid_image(2, 2, [255, 0, 0, 255])))
            .unwrap();

        let mut stage = ImageEffect::new(gpu.device(), &mut resources, id, [64, 64]).unwrap();
        assert_eq!(stage.bound_size(), [2, 2]);
        assert_eq!(stage.bound_revision(), resources.get_image(id).unwrap().revision());
        assert_eq!(stage.uniforms().size, [2.0, 2.0]);

        resources
            .update_image(id, ImageSource::Pixels(solid_image(4, 4, [0, 0, 255, 255])))
            .unwrap();
        assert_eq!(stage.bound_size(), [4, 4]);
        assert_eq!(stage.bound_revision(), resources.get_image(id).unwrap().revision());

        // Edited values survive the rebind; reset picks up the new native size.
        stage.uniforms_mut().opacity = 0.5;
        resources.notify_update(id).unwrap();
        assert_eq!(stage.uniforms().opacity, 0.5);
        stage.reset();
        assert_eq!(stage.uniforms().size, [4.0, 4.0]);
    }

    #[test]
    fn test_position_stays_inside_render_target() {
        let Some(gpu) = test_support::gpu() else { return };
        let mut resources = ResourceManager::new(&gpu);
        let id = resources
            .add_image("red", ImageSource::Pixels(solid_image(2, 2, [255, 0, 0, 255])))
            .unwrap();
        let mut stage = ImageEffect::new(gpu.device(), &mut resources, id, [64, 64]).unwrap();

        stage.uniforms_mut().pos = [60.0, 10.0];
        stage.set_render_size([32, 48]);
        assert_eq!(stage.uniforms().pos, [32.0, 10.0]);

        stage.set_render_size([128, 128]);
        assert_eq!(stage.uniforms().pos, [32.0, 10.0]);

        // A typed position outside the target is pulled back by the editor.
        stage.uniforms_mut().pos = [500.0, -5.0];
        let env = StageEnv {
            render_size: [128, 128],
            resources: &resources,
        };
        let ctx = egui::Context::default();
        let _ = ctx.run(egui::RawInput::default(), |ctx| {
            egui::CentralPanel::default().show(ctx, |ui| stage.display(ui, &env));
        });
        assert_eq!(stage.uniforms().pos, [128.0, 0.0]);
    }

    #[test]
    fn test_dropped_stage_unsubscribes() {
        let Some(gpu) = test_support::gpu() else { return };
        let mut resources = ResourceManager::new(&gpu);
        let id = resources
            .add_image("red", ImageSource::Pixels(solid_image(2, 2, [255, 0, 0, 255])))
            .unwrap();

        let stage = ImageEffect::new(gpu.device(), &mut resources, id, [64, 64]).unwrap();
        assert_eq!(resources.get_image(id).unwrap().subscriber_count(), 1);
        drop(stage);

        assert_eq!(resources.notify_update(id).unwrap(), 0);
        assert_eq!(resources.get_image(id).unwrap().subscriber_count(), 0);
    }
}
