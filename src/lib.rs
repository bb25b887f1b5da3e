//! Shader Stack
//!
//! An interactive preview for chains of fullscreen fragment effects. Stages
//! run in list order over a pair of ping-pong render targets; the last written
//! target is shown in a pannable, zoomable preview.

pub mod app;
pub mod compositor;
pub mod context;
pub mod effects;
pub mod file_loader;
pub mod gpu_context;
pub mod resources;
pub mod settings;
pub mod shader_cache;
pub mod shaders;
pub mod telemetry;
pub mod ui;

pub use app::{AppError, ShaderStackApp};
pub use context::Context;
pub use effects::{EffectKind, NewStage, PipelineManager};
pub use gpu_context::GpuContext;
pub use resources::{ImageId, ImageSource, ResourceManager};
pub use settings::PreviewSettings;
