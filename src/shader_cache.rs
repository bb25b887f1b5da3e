//! Compiled shader module cache
//!
//! Modules are memoized by the address and length of their source text, so
//! the same `static` source compiles once no matter how many stages use it.
//! Two distinct buffers holding identical text are compiled separately.

use std::collections::HashMap;

/// Identity of a source buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceKey {
    ptr: usize,
    len: usize,
}

impl SourceKey {
    pub fn of(source: &'static str) -> Self {
        Self {
            ptr: source.as_ptr() as usize,
            len: source.len(),
        }
    }
}

/// Shader modules compiled so far. Entries are never evicted.
#[derive(Default)]
pub struct ShaderCache {
    modules: HashMap<SourceKey, wgpu::ShaderModule>,
}

impl ShaderCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Module for `source`, compiling it on first use.
    pub fn get(&mut self, device: &wgpu::Device, source: &'static str) -> wgpu::ShaderModule {
        self.modules
            .entry(SourceKey::of(source))
            .or_insert_with(|| {
                tracing::debug!(bytes = source.len(), "Compiling shader module");
                device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some("Cached Shader Module"),
                    source: wgpu::ShaderSource::Wgsl(source.into()),
                })
            })
            .clone()
    }

    pub fn contains(&self, source: &'static str) -> bool {
        self.modules.contains_key(&SourceKey::of(source))
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}
