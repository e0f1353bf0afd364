//! The random area and aspect ratio crop.

use super::{crop, FloatImage};
use crate::{common::*, config::InceptionCropConfig};

#[derive(Debug, Clone, PartialEq)]
pub struct InceptionCropInit {
    /// Range of the crop area as a fraction of the image area.
    pub area_range: [f64; 2],
    /// Range of the crop width to height ratio.
    pub aspect_ratio_range: [f64; 2],
    /// Attempts to fit a crop before falling back to the full image.
    pub max_attempts: usize,
}

impl InceptionCropInit {
    pub fn build(self) -> Result<InceptionCrop> {
        let Self {
            area_range: [min_area, max_area],
            aspect_ratio_range: [min_ratio, max_ratio],
            max_attempts,
        } = self;

        ensure!(
            min_area > 0.0 && min_area <= max_area && max_area <= 1.0,
            "invalid area range [{}, {}]",
            min_area,
            max_area
        );
        ensure!(
            min_ratio > 0.0 && min_ratio <= max_ratio && max_ratio.is_finite(),
            "invalid aspect ratio range [{}, {}]",
            min_ratio,
            max_ratio
        );
        ensure!(max_attempts > 0, "max_attempts must be positive");

        Ok(InceptionCrop {
            min_area,
            max_area,
            min_ratio,
            max_ratio,
            max_attempts,
        })
    }
}

impl From<&InceptionCropConfig> for InceptionCropInit {
    fn from(config: &InceptionCropConfig) -> Self {
        Self {
            area_range: [config.min_area.to_f64(), config.max_area.to_f64()],
            aspect_ratio_range: [
                config.min_aspect_ratio.raw(),
                config.max_aspect_ratio.raw(),
            ],
            max_attempts: config.max_attempts,
        }
    }
}

impl Default for InceptionCropInit {
    fn default() -> Self {
        Self::from(&InceptionCropConfig::default())
    }
}

#[derive(Debug, Clone)]
pub struct InceptionCrop {
    min_area: f64,
    max_area: f64,
    min_ratio: f64,
    max_ratio: f64,
    max_attempts: usize,
}

impl InceptionCrop {
    /// Sample a window `[top, left, height, width]` in pixels.
    pub fn sample_window<R>(&self, size: &HW<usize>, rng: &mut R) -> [usize; 4]
    where
        R: Rng,
    {
        let [image_h, image_w] = size.hw();
        let image_area = (image_h * image_w) as f64;

        for _ in 0..self.max_attempts {
            let area = rng.gen_range(self.min_area..=self.max_area) * image_area;
            let ratio = rng.gen_range(self.min_ratio..=self.max_ratio);
            let crop_h = (area / ratio).sqrt().round() as usize;
            let crop_w = (area * ratio).sqrt().round() as usize;

            if (1..=image_h).contains(&crop_h) && (1..=image_w).contains(&crop_w) {
                let top = rng.gen_range(0..=(image_h - crop_h));
                let left = rng.gen_range(0..=(image_w - crop_w));
                return [top, left, crop_h, crop_w];
            }
        }

        [0, 0, image_h, image_w]
    }

    pub fn forward<R>(&self, image: FloatImage, rng: &mut R) -> Result<FloatImage>
    where
        R: Rng,
    {
        let size = HW::try_from_positive_hw([image.height() as usize, image.width() as usize])?;
        let [top, left, h, w] = self.sample_window(&size, rng);
        crop(image, top, left, &HW::try_from_positive_hw([h, w])?)
    }
}
