//! Presentation of the composited output
//!
//! The effect chain renders at a fixed resolution; this module only decides how
//! that image is shown on screen.

pub mod viewport;

pub use viewport::{DisplayState, MAX_ZOOM, MIN_ZOOM};
