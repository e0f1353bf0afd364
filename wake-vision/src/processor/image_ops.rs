//! Geometric image operations.

use super::FloatImage;
use crate::common::*;
use image::imageops::FilterType;

/// Cast an HWC byte tensor to a float image.
pub fn to_float_image(pixels: &Array3<u8>) -> Result<FloatImage> {
    let (h, w, c) = pixels.dim();
    ensure!(c == 3, "expect 3 channels, but get {}", c);
    let samples: Vec<f32> = pixels.iter().map(|&value| value as f32).collect();
    ImageBuffer::from_raw(w as u32, h as u32, samples)
        .ok_or_else(|| format_err!("unable to build a {}x{} image", h, w))
}

/// Pack a float image into an HWC tensor.
pub fn to_array(image: &FloatImage) -> Result<Array3<f32>> {
    let shape = (image.height() as usize, image.width() as usize, 3);
    let array = Array3::from_shape_vec(shape, image.as_raw().clone())?;
    Ok(array)
}

pub fn image_size(image: &FloatImage) -> [usize; 2] {
    [image.height() as usize, image.width() as usize]
}

/// Resize with bilinear filtering. The image is returned as is if the size matches.
pub fn resize(image: FloatImage, size: &HW<usize>) -> FloatImage {
    let [h, w] = size.hw();
    if image_size(&image) == [h, w] {
        return image;
    }
    imageops::resize(&image, w as u32, h as u32, FilterType::Triangle)
}

/// Resize so that the short side matches the target height, by the same rule
/// [CenterCrop] predicts box positions with.
pub fn resize_small(image: FloatImage, target_size: &HW<usize>) -> Result<(FloatImage, CenterCrop)> {
    let orig_size = HW::try_from_positive_hw(image_size(&image))?;
    let crop = CenterCrop::new(orig_size, *target_size)?;
    let resized = resize(image, crop.resized_size());
    Ok((resized, crop))
}

/// Cut the window at `[top, left]` with the given size.
pub fn crop(image: FloatImage, top: usize, left: usize, size: &HW<usize>) -> Result<FloatImage> {
    let [h, w] = size.hw();
    let [image_h, image_w] = image_size(&image);
    ensure!(
        top + h <= image_h && left + w <= image_w,
        "the crop window {}x{} at ({}, {}) exceeds the image size {}x{}",
        h,
        w,
        top,
        left,
        image_h,
        image_w
    );

    if [top, left, h, w] == [0, 0, image_h, image_w] {
        return Ok(image);
    }
    let cropped = imageops::crop_imm(&image, left as u32, top as u32, w as u32, h as u32).to_image();
    Ok(cropped)
}

/// Resize the short side then cut the center window of the target size.
///
/// An image of the target size is returned as is.
pub fn center_crop(image: FloatImage, target_size: &HW<usize>) -> Result<FloatImage> {
    if image_size(&image) == target_size.hw() {
        return Ok(image);
    }
    let (resized, crop) = resize_small(image, target_size)?;
    let [dy, dx] = crop.offset();
    self::crop(resized, dy, dx, target_size)
}

pub fn flip_horizontal(image: &FloatImage) -> FloatImage {
    imageops::flip_horizontal(image)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(h: usize, w: usize) -> Array3<u8> {
        Array3::from_shape_fn((h, w, 3), |(y, x, c)| ((y * 7 + x * 3 + c) % 256) as u8)
    }

    fn hw(h: usize, w: usize) -> HW<usize> {
        HW::try_from_positive_hw([h, w]).unwrap()
    }

    #[test]
    fn float_image_conversion() -> Result<()> {
        let pixels = gradient(5, 4);
        let image = to_float_image(&pixels)?;
        assert_eq!(image_size(&image), [5, 4]);
        assert_eq!(image.get_pixel(2, 3).0, [27.0, 28.0, 29.0]);

        let array = to_array(&image)?;
        assert_eq!(array, pixels.mapv(|value| value as f32));
        Ok(())
    }

    #[test]
    fn center_crop_portrait_image() -> Result<()> {
        let image = to_float_image(&gradient(100, 50))?;
        let (resized, crop) = resize_small(image.clone(), &hw(20, 20))?;
        assert_eq!(image_size(&resized), [40, 20]);
        assert_eq!(crop.offset(), [10, 0]);

        let cropped = center_crop(image, &hw(20, 20))?;
        assert_eq!(image_size(&cropped), [20, 20]);
        Ok(())
    }

    #[test]
    fn sized_image_is_untouched() -> Result<()> {
        let image = to_float_image(&gradient(8, 8))?;
        let cropped = center_crop(image.clone(), &hw(8, 8))?;
        assert_eq!(cropped, image);

        // the short side rule would upscale a non-square image first
        let image = to_float_image(&gradient(16, 12))?;
        let cropped = center_crop(image.clone(), &hw(16, 12))?;
        assert_eq!(cropped, image);
        Ok(())
    }

    #[test]
    fn crop_window_bounds() -> Result<()> {
        let image = to_float_image(&gradient(6, 6))?;
        let cropped = crop(image.clone(), 1, 2, &hw(3, 4))?;
        assert_eq!(image_size(&cropped), [3, 4]);
        assert_eq!(cropped.get_pixel(0, 0), image.get_pixel(2, 1));
        assert!(crop(image, 4, 0, &hw(3, 3)).is_err());
        Ok(())
    }

    #[test]
    fn flip_mirrors_columns() -> Result<()> {
        let image = to_float_image(&gradient(3, 5))?;
        let flipped = flip_horizontal(&image);
        assert_eq!(flipped.get_pixel(0, 1), image.get_pixel(4, 1));
        Ok(())
    }
}
