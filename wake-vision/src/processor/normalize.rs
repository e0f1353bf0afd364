use super::FloatImage;
use crate::{common::*, config::NormalizationConfig};

/// The per-sample affine map `x * scale + offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalize {
    scale: f32,
    offset: f32,
}

impl Normalize {
    pub fn new(config: &NormalizationConfig) -> Result<Self> {
        let NormalizationConfig { scale, offset } = *config;
        ensure!(scale != 0.0, "normalization scale must be non-zero");
        Ok(Self {
            scale: scale.raw() as f32,
            offset: offset.raw() as f32,
        })
    }

    pub fn forward(&self, mut image: FloatImage) -> FloatImage {
        let Self { scale, offset } = *self;
        image
            .iter_mut()
            .for_each(|sample| *sample = *sample * scale + offset);
        image
    }
}
