//! Builtin effect variants

mod chromatic_aberration;
mod circle;
mod dithering;
mod image;
mod noise;
mod passthrough;

pub use chromatic_aberration::{AberrationEffect, AberrationMode, AberrationUniforms};
pub use circle::{CircleEffect, CircleUniforms};
pub use dithering::{DitherMode, DitheringEffect, DitheringUniforms};
pub use image::{ImageEffect, ImageUniforms};
pub use noise::{Bound, NoiseEffect, NoiseUniforms, CONTROL_COLOR, CONTROL_DYNAMIC};
pub use passthrough::PassthroughEffect;
