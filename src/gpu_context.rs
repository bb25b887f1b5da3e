//! Process-wide GPU context
//!
//! `GpuContext` owns the wgpu instance, adapter, device and queue. Every other
//! GPU object in the crate is created from it and must not outlive it.
//!
//! A context can be used directly (tests create headless ones), or installed
//! once into the process-wide slot with [`init`] and fetched with [`get`].

use std::sync::OnceLock;

// ═══════════════════════════════════════════════════════════════════════════════
// ERRORS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error("GPU context is already initialized")]
    AlreadyInitialized,
    #[error("GPU context accessed before initialization")]
    NotInitialized,
    #[error("no suitable GPU adapter found")]
    NoAdapter,
    #[error("failed to create GPU device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
}

// ═══════════════════════════════════════════════════════════════════════════════
// GPU CONTEXT
// ═══════════════════════════════════════════════════════════════════════════════

/// Instance, adapter and logical device shared by the whole renderer.
pub struct GpuContext {
    instance: wgpu::Instance,
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
}

impl GpuContext {
    /// Create a context on a fresh instance.
    ///
    /// `compatible_surface` steers adapter selection toward one that can present
    /// to the window; pass `None` for offscreen use.
    pub async fn new(
        instance: wgpu::Instance,
        compatible_surface: Option<&wgpu::Surface<'_>>,
    ) -> Result<Self, GpuError> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;

        let info = adapter.get_info();
        tracing::info!("Using GPU: {}", info.name);
        tracing::info!("Backend: {:?}", info.backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Shader Stack Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: adapter.limits(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await?;

        // Validation errors raised outside an error scope land here instead of panicking.
        device.on_uncaptured_error(Box::new(|error| {
            tracing::error!(target: "wgpu", "Uncaptured GPU error: {error}");
        }));

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
        })
    }

    /// Offscreen context on the default backends.
    pub async fn headless() -> Result<Self, GpuError> {
        Self::new(default_instance(), None).await
    }

    pub fn instance(&self) -> &wgpu::Instance {
        &self.instance
    }

    pub fn adapter(&self) -> &wgpu::Adapter {
        &self.adapter
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }
}

/// Instance over every backend the platform offers.
pub fn default_instance() -> wgpu::Instance {
    wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROCESS-WIDE SLOT
// ═══════════════════════════════════════════════════════════════════════════════

static GPU: OnceLock<GpuContext> = OnceLock::new();

/// Install `context` as the process-wide GPU context.
///
/// A second call is rejected with a warning; the first context stays installed.
pub fn init(context: GpuContext) -> Result<&'static GpuContext, GpuError> {
    if GPU.set(context).is_err() {
        tracing::warn!("GPU context already initialized, ignoring second init");
        return Err(GpuError::AlreadyInitialized);
    }
    get()
}

/// The installed process-wide GPU context.
pub fn get() -> Result<&'static GpuContext, GpuError> {
    GPU.get().ok_or(GpuError::NotInitialized)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::GpuContext;

    /// Headless context for GPU-backed tests, or `None` on machines without an adapter.
    pub fn gpu() -> Option<GpuContext> {
        match pollster::block_on(GpuContext::headless()) {
            Ok(gpu) => Some(gpu),
            Err(e) => {
                eprintln!("skipping GPU test: {e}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            GpuError::NotInitialized.to_string(),
            "GPU context accessed before initialization"
        );
        assert_eq!(GpuError::AlreadyInitialized.to_string(), "GPU context is already initialized");
    }

    #[test]
    fn test_init_once() {
        let Some(first) = test_support::gpu() else { return };
        // Other tests never touch the global slot, so this one owns it.
        let installed = init(first).expect("first init succeeds");
        assert!(std::ptr::eq(installed, get().unwrap()));

        let Some(second) = test_support::gpu() else { return };
        assert!(matches!(init(second), Err(GpuError::AlreadyInitialized)));
        assert!(std::ptr::eq(installed, get().unwrap()));
    }
}
