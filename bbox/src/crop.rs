//! Geometry of the resize-short-side then center-crop transform.
//!
//! [CenterCrop] predicts where a normalized box lands after an image is
//! resized so that its short side matches the target height and is then
//! center cropped to the target size. No pixel is touched.

use crate::{common::*, Rect, RectNum, Transform, HW, TLBR};

/// The resize then center-crop transform for one original image size.
#[derive(Debug, Clone, PartialEq)]
pub struct CenterCrop {
    orig_size: HW<usize>,
    target_size: HW<usize>,
    resized_size: HW<usize>,
    offset: [usize; 2],
    window: TLBR<f32>,
    to_crop: Transform<f64>,
}

impl CenterCrop {
    pub fn new(orig_size: HW<usize>, target_size: HW<usize>) -> Result<Self> {
        let [orig_h, orig_w] = orig_size.hw();
        let [target_h, target_w] = target_size.hw();
        ensure!(
            orig_h > 0 && orig_w > 0,
            "original image size must be positive, but get {}x{}",
            orig_h,
            orig_w
        );
        ensure!(
            target_h > 0 && target_w > 0,
            "target size must be positive, but get {}x{}",
            target_h,
            target_w
        );

        // the short side is scaled to the target height
        let scale = target_h as f64 / orig_h.min(orig_w) as f64;
        let resized_h = ((orig_h as f64 * scale).round() as usize).max(target_h);
        let resized_w = ((orig_w as f64 * scale).round() as usize).max(target_w);
        let resized_size = HW::try_from_positive_hw([resized_h, resized_w])?;

        let dy = (resized_h - target_h) / 2;
        let dx = (resized_w - target_w) / 2;

        // edge decisions are made in single precision, like the annotations
        let window = TLBR::try_from_tlbr([
            dy as f32 / resized_h as f32,
            dx as f32 / resized_w as f32,
            (dy + target_h) as f32 / resized_h as f32,
            (dx + target_w) as f32 / resized_w as f32,
        ])?;
        let pixel_window =
            TLBR::try_from_tlhw([dy as f64, dx as f64, target_h as f64, target_w as f64])?;
        let to_crop = Transform::to_unit(&pixel_window)?;

        Ok(Self {
            orig_size,
            target_size,
            resized_size,
            offset: [dy, dx],
            window,
            to_crop,
        })
    }

    pub fn orig_size(&self) -> &HW<usize> {
        &self.orig_size
    }

    pub fn target_size(&self) -> &HW<usize> {
        &self.target_size
    }

    /// The image size after the short side resize.
    pub fn resized_size(&self) -> &HW<usize> {
        &self.resized_size
    }

    /// The crop offset `[dy, dx]` in resized pixels.
    pub fn offset(&self) -> [usize; 2] {
        self.offset
    }

    /// The crop window in normalized coordinates of the resized image.
    pub fn window(&self) -> &TLBR<f32> {
        &self.window
    }

    /// Project a normalized box into crop-relative coordinates.
    ///
    /// It returns `None` if the box does not overlap the crop window. An edge
    /// reaching the crop boundary, or projected beyond it, is extended to the
    /// frame edge, i.e. exactly `0.0` for top/left and `1.0` for bottom/right.
    /// The result always lies in `[0, 1]` and may have zero area.
    pub fn project(&self, bbox: &TLBR<f64>) -> Option<TLBR<f64>> {
        let window = &self.window;
        let bbox = TLBR {
            t: bbox.t as f32,
            l: bbox.l as f32,
            b: bbox.b as f32,
            r: bbox.r as f32,
        };
        if !bbox.overlaps_with(window) {
            return None;
        }

        // The box is measured in original pixels while the crop offset is
        // measured in resized pixels. Area fractions depend on this mix.
        let [orig_h, orig_w] = self.orig_size.hw();
        let to_pixel = |value: f32, size: usize| (value * size as f32).trunc() as f64;
        let pixel = TLBR {
            t: to_pixel(bbox.t, orig_h),
            l: to_pixel(bbox.l, orig_w),
            b: to_pixel(bbox.b, orig_h),
            r: to_pixel(bbox.r, orig_w),
        };
        let mapped = &self.to_crop * &pixel;

        let t = near_edge(bbox.t > window.t, mapped.t);
        let l = near_edge(bbox.l > window.l, mapped.l);
        let b = far_edge(bbox.b < window.b, mapped.b).max(t);
        let r = far_edge(bbox.r < window.r, mapped.r).max(l);

        Some(TLBR { t, l, b, r })
    }

    /// The area fraction of the projected box, zero if it misses the crop.
    pub fn projected_area(&self, bbox: &TLBR<f64>) -> f64 {
        self.project(bbox).map(|rect| rect.area()).unwrap_or(0.0)
    }
}

fn near_edge(inside: bool, value: f64) -> f64 {
    if inside && value > 0.0 {
        value.min(1.0)
    } else {
        0.0
    }
}

fn far_edge(inside: bool, value: f64) -> f64 {
    if inside && value < 1.0 {
        value.max(0.0)
    } else {
        1.0
    }
}
