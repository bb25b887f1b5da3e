//! Effect chain
//!
//! - `stage`: the closed set of effects and the per-stage pipeline
//! - `builtin`: the effect variants
//! - `manager`: stage list, ping-pong targets and frame orchestration

pub mod builtin;
pub mod manager;
pub mod ping_pong;
pub mod pipeline;
pub mod stage;
pub mod targets;

pub use manager::{reorder, FrameReport, PipelineManager};
pub use ping_pong::{PingPong, Slot};
pub use stage::{Effect, EffectKind, EffectStage, NewStage, StageError, StageId};
pub use targets::RenderTargets;
