//! WGSL sources compiled into the binary
//!
//! Every fragment shader is prefixed with `common.wgsl`, which declares the
//! shared group 0 (previous stage output, sampler, frame globals).
//!
//! These are statics rather than consts: the shader cache keys modules by the
//! address of the source text, so each source must live at one address.

/// Fullscreen triangle vertex stage shared by all effects (`vs_main`).
pub static FULLSCREEN_VERTEX: &str = include_str!("fullscreen.wgsl");

pub static PASSTHROUGH: &str = concat!(include_str!("common.wgsl"), include_str!("effects/passthrough.wgsl"));

pub static CIRCLE: &str = concat!(include_str!("common.wgsl"), include_str!("effects/circle.wgsl"));

pub static CHROMATIC_ABERRATION: &str = concat!(
    include_str!("common.wgsl"),
    include_str!("effects/chromatic_aberration.wgsl")
);

pub static NOISE: &str = concat!(include_str!("common.wgsl"), include_str!("effects/noise.wgsl"));

pub static DITHERING: &str = concat!(include_str!("common.wgsl"), include_str!("effects/dithering.wgsl"));

pub static IMAGE: &str = concat!(include_str!("common.wgsl"), include_str!("effects/image.wgsl"));
