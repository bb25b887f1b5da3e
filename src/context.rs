//! Shared state handed to the pipeline manager

use crate::gpu_context::GpuContext;
use crate::resources::ResourceManager;
use crate::shader_cache::ShaderCache;

/// Device handles, compiled shaders and imported images.
pub struct Context<'g> {
    pub gpu: &'g GpuContext,
    pub shaders: ShaderCache,
    pub resources: ResourceManager,
}

impl<'g> Context<'g> {
    pub fn new(gpu: &'g GpuContext) -> Self {
        Self {
            gpu,
            shaders: ShaderCache::new(),
            resources: ResourceManager::new(gpu),
        }
    }
}
