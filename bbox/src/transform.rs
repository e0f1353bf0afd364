use super::{Rect, TLBR};
use crate::common::*;

/// Axis-aligned affine transform, `y' = y * sy + ty` and `x' = x * sx + tx`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Transform<T> {
    pub sy: T,
    pub sx: T,
    pub ty: T,
    pub tx: T,
}

impl<T> Transform<T>
where
    T: Copy + Num + PartialOrd,
{
    /// The transform that maps `src` onto `tgt`.
    pub fn from_rects<R>(src: &R, tgt: &R) -> Self
    where
        R: Rect<Type = T>,
    {
        let sy = tgt.h() / src.h();
        let sx = tgt.w() / src.w();
        let ty = tgt.t() - src.t() * sy;
        let tx = tgt.l() - src.l() * sx;

        Self { sy, sx, ty, tx }
    }

    /// The transform that maps the window `[t, b] × [l, r]` onto the unit square.
    pub fn to_unit(window: &TLBR<T>) -> Result<Self> {
        let zero = T::zero();
        let one = T::one();
        ensure!(
            window.h() > zero && window.w() > zero,
            "the window must have positive height and width"
        );
        let unit = TLBR {
            t: zero,
            l: zero,
            b: one,
            r: one,
        };
        Ok(Self::from_rects(window, &unit))
    }
}

impl<T> Mul<&TLBR<T>> for &Transform<T>
where
    T: Copy + Num,
{
    type Output = TLBR<T>;

    fn mul(self, rhs: &TLBR<T>) -> Self::Output {
        rhs.transform(self)
    }
}
