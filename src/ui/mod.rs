//! Immediate-mode UI for the effect chain

pub mod box2d;
pub mod stage_list;
pub mod widgets;

pub use box2d::Box2D;
pub use stage_list::{AddStageDialog, StageAction};
