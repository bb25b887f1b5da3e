//! Effect stages
//!
//! A stage is one fullscreen fragment pass in the chain. The set of effects is
//! closed: `Effect` is a sum type over the builtin variants and every per-frame
//! call is a `match`. Variants implement `StageVariant` for their own hooks and
//! share pipeline construction through `PipelineBuilder`.
//!
//! Bind group 0 belongs to the manager (previous output, sampler, globals);
//! variants own groups 1 and up.

use crate::effects::builtin::{
    AberrationEffect, CircleEffect, DitheringEffect, ImageEffect, NoiseEffect, PassthroughEffect,
};
use crate::effects::pipeline::PipelineBuilder;
use crate::resources::{ImageId, ResourceError, ResourceManager};
use crate::shader_cache::ShaderCache;
use crate::shaders;

#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("cannot create stage: {0}")]
    Resource(#[from] ResourceError),
}

/// What a stage UI may look at while drawing.
pub struct StageEnv<'a> {
    /// Size of the ping-pong targets in pixels
    pub render_size: [u32; 2],
    pub resources: &'a ResourceManager,
}

// ═══════════════════════════════════════════════════════════════════════════════
// VARIANT CONTRACT
// ═══════════════════════════════════════════════════════════════════════════════

/// Hooks each effect variant provides.
pub trait StageVariant {
    /// WGSL source with an `fs_main` fragment entry point.
    fn fragment_source(&self) -> &'static str;

    /// Layouts of the variant's own bind groups, starting at group 1.
    fn bind_group_layouts(&self) -> Vec<&wgpu::BindGroupLayout>;

    /// Pipeline layout: the shared default group followed by the variant's groups.
    fn make_pipeline_layout(
        &self,
        builder: &PipelineBuilder<'_>,
        default_layout: &wgpu::BindGroupLayout,
    ) -> wgpu::PipelineLayout {
        let mut groups = vec![default_layout];
        groups.extend(self.bind_group_layouts());
        builder.layout(&groups)
    }

    /// Bind the variant's groups (index 1 and up).
    fn set_bind_groups(&self, pass: &mut wgpu::RenderPass<'_>);

    /// Upload the current uniform values.
    fn write_buffers(&self, queue: &wgpu::Queue);

    /// Edit the uniform values in place.
    fn display(&mut self, ui: &mut egui::Ui, env: &StageEnv<'_>);

    /// Restore the documented defaults.
    fn reset(&mut self);

    /// Raw bytes of the uniform struct as uploaded.
    fn uniform_bytes(&self) -> &[u8];
}

// ═══════════════════════════════════════════════════════════════════════════════
// KINDS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectKind {
    Passthrough,
    Circle,
    ChromaticAberration,
    Noise,
    Dithering,
    Image,
}

impl EffectKind {
    pub const ALL: [EffectKind; 6] = [
        EffectKind::Passthrough,
        EffectKind::Circle,
        EffectKind::ChromaticAberration,
        EffectKind::Noise,
        EffectKind::Dithering,
        EffectKind::Image,
    ];

    /// Name given to new stages of this kind.
    pub fn default_name(self) -> &'static str {
        match self {
            EffectKind::Passthrough => "passthrough",
            EffectKind::Circle => "circle",
            EffectKind::ChromaticAberration => "chromatic aberration",
            EffectKind::Noise => "noise",
            EffectKind::Dithering => "dithering",
            EffectKind::Image => "image",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            EffectKind::Passthrough => "Passthrough",
            EffectKind::Circle => "Circle",
            EffectKind::ChromaticAberration => "Chromatic Aberration",
            EffectKind::Noise => "Noise",
            EffectKind::Dithering => "Dithering",
            EffectKind::Image => "Image",
        }
    }

    /// Whether creating a stage of this kind needs an imported image.
    pub fn needs_image(self) -> bool {
        matches!(self, EffectKind::Image)
    }
}

/// Everything needed to create one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewStage {
    Passthrough,
    Circle,
    ChromaticAberration,
    Noise,
    Dithering,
    Image(ImageId),
}

impl NewStage {
    pub fn kind(self) -> EffectKind {
        match self {
            NewStage::Passthrough => EffectKind::Passthrough,
            NewStage::Circle => EffectKind::Circle,
            NewStage::ChromaticAberration => EffectKind::ChromaticAberration,
            NewStage::Noise => EffectKind::Noise,
            NewStage::Dithering => EffectKind::Dithering,
            NewStage::Image(_) => EffectKind::Image,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EFFECT SUM TYPE
// ═══════════════════════════════════════════════════════════════════════════════

pub enum Effect {
    Passthrough(PassthroughEffect),
    Circle(CircleEffect),
    ChromaticAberration(AberrationEffect),
    Noise(NoiseEffect),
    Dithering(DitheringEffect),
    Image(ImageEffect),
}

macro_rules! dispatch {
    ($effect:expr, $variant:ident => $body:expr) => {
        match $effect {
            Effect::Passthrough($variant) => $body,
            Effect::Circle($variant) => $body,
            Effect::ChromaticAberration($variant) => $body,
            Effect::Noise($variant) => $body,
            Effect::Dithering($variant) => $body,
            Effect::Image($variant) => $body,
        }
    };
}

impl Effect {
    /// Build the variant-specific GPU state for `request`.
    pub fn create(
        request: NewStage,
        device: &wgpu::Device,
        resources: &mut ResourceManager,
        render_size: [u32; 2],
    ) -> Result<Self, StageError> {
        Ok(match request {
            NewStage::Passthrough => Effect::Passthrough(PassthroughEffect),
            NewStage::Circle => Effect::Circle(CircleEffect::new(device)),
            NewStage::ChromaticAberration => Effect::ChromaticAberration(AberrationEffect::new(device)),
            NewStage::Noise => Effect::Noise(NoiseEffect::new(device)),
            NewStage::Dithering => Effect::Dithering(DitheringEffect::new(device)),
            NewStage::Image(id) => Effect::Image(ImageEffect::new(device, resources, id, render_size)?),
        })
    }

    pub fn kind(&self) -> EffectKind {
        match self {
            Effect::Passthrough(_) => EffectKind::Passthrough,
            Effect::Circle(_) => EffectKind::Circle,
            Effect::ChromaticAberration(_) => EffectKind::ChromaticAberration,
            Effect::Noise(_) => EffectKind::Noise,
            Effect::Dithering(_) => EffectKind::Dithering,
            Effect::Image(_) => EffectKind::Image,
        }
    }

    pub fn fragment_source(&self) -> &'static str {
        dispatch!(self, v => v.fragment_source())
    }

    pub fn make_pipeline_layout(
        &self,
        builder: &PipelineBuilder<'_>,
        default_layout: &wgpu::BindGroupLayout,
    ) -> wgpu::PipelineLayout {
        dispatch!(self, v => v.make_pipeline_layout(builder, default_layout))
    }

    pub fn set_bind_groups(&self, pass: &mut wgpu::RenderPass<'_>) {
        dispatch!(self, v => v.set_bind_groups(pass))
    }

    pub fn write_buffers(&self, queue: &wgpu::Queue) {
        dispatch!(self, v => v.write_buffers(queue))
    }

    pub fn display(&mut self, ui: &mut egui::Ui, env: &StageEnv<'_>) {
        dispatch!(self, v => v.display(ui, env))
    }

    pub fn reset(&mut self) {
        dispatch!(self, v => v.reset())
    }

    pub fn uniform_bytes(&self) -> &[u8] {
        dispatch!(self, v => v.uniform_bytes())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EFFECT STAGE
// ═══════════════════════════════════════════════════════════════════════════════

/// Stable identity of a stage within its manager, independent of list position.
pub type StageId = u64;

/// A named effect with its render pipeline. Only exists fully initialized.
pub struct EffectStage {
    id: StageId,
    name: String,
    effect: Effect,
    pipeline: wgpu::RenderPipeline,
}

impl EffectStage {
    pub fn new(
        id: StageId,
        name: impl Into<String>,
        effect: Effect,
        device: &wgpu::Device,
        shader_cache: &mut ShaderCache,
        default_layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let name = name.into();
        let pipeline = build_pipeline(&name, &effect, device, shader_cache, default_layout);
        tracing::debug!("Created stage '{}' ({:?})", name, effect.kind());
        Self {
            id,
            name,
            effect,
            pipeline,
        }
    }

    /// Rebuild the pipeline against a new default layout. Uniform values are kept.
    pub fn init_pipeline(
        &mut self,
        device: &wgpu::Device,
        shader_cache: &mut ShaderCache,
        default_layout: &wgpu::BindGroupLayout,
    ) {
        self.pipeline = build_pipeline(&self.name, &self.effect, device, shader_cache, default_layout);
    }

    pub fn id(&self) -> StageId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> EffectKind {
        self.effect.kind()
    }

    pub fn effect(&self) -> &Effect {
        &self.effect
    }

    pub fn effect_mut(&mut self) -> &mut Effect {
        &mut self.effect
    }

    pub fn write_buffers(&self, queue: &wgpu::Queue) {
        self.effect.write_buffers(queue);
    }

    pub fn display(&mut self, ui: &mut egui::Ui, env: &StageEnv<'_>) {
        self.effect.display(ui, env);
    }

    pub fn reset(&mut self) {
        self.effect.reset();
    }

    pub fn uniform_bytes(&self) -> &[u8] {
        self.effect.uniform_bytes()
    }

    /// Record the draw into `pass`, reading the previous output through `default_group`.
    pub fn record(&self, pass: &mut wgpu::RenderPass<'_>, default_group: &wgpu::BindGroup) {
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, default_group, &[]);
        self.effect.set_bind_groups(pass);
        pass.draw(0..3, 0..1);
    }
}

fn build_pipeline(
    name: &str,
    effect: &Effect,
    device: &wgpu::Device,
    shader_cache: &mut ShaderCache,
    default_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let vertex = shader_cache.get(device, shaders::FULLSCREEN_VERTEX);
    let fragment = shader_cache.get(device, effect.fragment_source());
    let builder = PipelineBuilder::new(device, name);
    let layout = effect.make_pipeline_layout(&builder, default_layout);
    builder.build(&layout, &vertex, &fragment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::targets::RenderTargets;
    use crate::gpu_context::test_support;
    use crate::resources::{solid_image, ImageSource};

    #[test]
    fn test_kind_names() {
        assert_eq!(EffectKind::ALL.len(), 6);
        assert_eq!(EffectKind::ChromaticAberration.default_name(), "chromatic aberration");
        assert!(EffectKind::Image.needs_image());
        assert!(!EffectKind::Noise.needs_image());
    }

    #[test]
    fn test_request_kind() {
        let mut ids = crate::resources::IdAllocator::default();
        assert_eq!(NewStage::Image(ids.allocate()).kind(), EffectKind::Image);
        assert_eq!(NewStage::Dithering.kind(), EffectKind::Dithering);
    }

    #[test]
    fn test_reset_is_idempotent_for_every_variant() {
        let Some(gpu) = test_support::gpu() else { return };
        let device = gpu.device();
        let mut resources = ResourceManager::new(&gpu);
        let mut cache = ShaderCache::new();
        let targets = RenderTargets::new(device, [32, 32], 0);
        let image = resources
            .add_image("checker", ImageSource::Pixels(solid_image(8, 4, [0, 255, 0, 255])))
            .unwrap();

        let requests = [
            NewStage::Passthrough,
            NewStage::Circle,
            NewStage::ChromaticAberration,
            NewStage::Noise,
            NewStage::Dithering,
            NewStage::Image(image),
        ];
        for (id, request) in requests.into_iter().enumerate() {
            let effect = Effect::create(request, device, &mut resources, [32, 32]).unwrap();
            let mut stage = EffectStage::new(id as StageId, "stage", effect, device, &mut cache, targets.layout());
            assert_eq!(stage.kind(), request.kind());

            stage.reset();
            let once = stage.uniform_bytes().to_vec();
            stage.reset();
            assert_eq!(stage.uniform_bytes(), once.as_slice(), "{:?}", request);
        }

        // One vertex module shared by all, plus one fragment module per variant.
        assert_eq!(cache.len(), 1 + requests.len());
    }

    #[test]
    fn test_image_stage_requires_known_image() {
        let Some(gpu) = test_support::gpu() else { return };
        let mut resources = ResourceManager::new(&gpu);
        let mut ids = crate::resources::IdAllocator::default();
        let unknown = ids.allocate();

        let result = Effect::create(NewStage::Image(unknown), gpu.device(), &mut resources, [16, 16]);
        assert!(matches!(result, Err(StageError::Resource(ResourceError::UnknownImage(_)))));
    }
}
