//! Image preprocessing stages for training and evaluation.

mod image_ops;
mod inception_crop;
mod normalize;
mod preprocessor;

pub use image_ops::*;
pub use inception_crop::*;
pub use normalize::*;
pub use preprocessor::*;

use crate::common::*;

/// An RGB image with `f32` samples on the `[0, 255]` scale.
pub type FloatImage = ImageBuffer<Rgb<f32>, Vec<f32>>;
