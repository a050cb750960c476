use crate::{common::*, Rect};

/// Size of a rectangle without position.
///
/// As a [Rect] it is centered at the origin, which is how anchor shapes
/// are compared to boxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HW<T> {
    h: T,
    w: T,
}

impl<T> HW<T>
where
    T: Num + PartialOrd + Copy,
{
    pub fn try_from_hw(hw: [T; 2]) -> Result<Self> {
        let [h, w] = hw;
        let zero = T::zero();
        ensure!(
            h >= zero && w >= zero,
            "height and width parameters must be non-negative"
        );
        Ok(Self { w, h })
    }

    pub fn try_from_wh(wh: [T; 2]) -> Result<Self> {
        let [w, h] = wh;
        Self::try_from_hw([h, w])
    }

    pub fn from_hw(hw: [T; 2]) -> Self {
        Self::try_from_hw(hw).unwrap()
    }

    pub fn from_wh(wh: [T; 2]) -> Self {
        Self::try_from_wh(wh).unwrap()
    }

    /// Express this size in units of `reference`, e.g. pixels to ratios of
    /// the image size.
    pub fn try_normalize(&self, reference: &HW<T>) -> Result<Self> {
        let zero = T::zero();
        ensure!(
            reference.h > zero && reference.w > zero,
            "reference height and width must be positive"
        );
        Ok(Self {
            h: self.h / reference.h,
            w: self.w / reference.w,
        })
    }

    pub fn w(&self) -> T {
        self.w
    }

    pub fn h(&self) -> T {
        self.h
    }
}

impl<T> Rect for HW<T>
where
    T: Num + PartialOrd + Copy,
{
    type Type = T;

    fn t(&self) -> Self::Type {
        T::zero() - self.h / (T::one() + T::one())
    }

    fn l(&self) -> Self::Type {
        T::zero() - self.w / (T::one() + T::one())
    }

    fn b(&self) -> Self::Type {
        self.h / (T::one() + T::one())
    }

    fn r(&self) -> Self::Type {
        self.w / (T::one() + T::one())
    }

    fn cy(&self) -> Self::Type {
        T::zero()
    }

    fn cx(&self) -> Self::Type {
        T::zero()
    }

    fn h(&self) -> Self::Type {
        self.h
    }

    fn w(&self) -> Self::Type {
        self.w
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn size_order() {
        let size = HW::from_hw([3.0, 2.0]);
        assert_eq!(size, HW::from_wh([2.0, 3.0]));
        assert!(HW::try_from_hw([-1.0, 2.0]).is_err());
    }

    #[test]
    fn normalize_by_reference() {
        let anchor = HW::from_wh([16.0, 30.0]);
        let reference = HW::from_wh([416.0, 208.0]);
        let normalized = anchor.try_normalize(&reference).unwrap();
        assert_abs_diff_eq!(normalized.w(), 16.0 / 416.0);
        assert_abs_diff_eq!(normalized.h(), 30.0 / 208.0);

        let degenerate = HW::from_wh([0.0, 416.0]);
        assert!(anchor.try_normalize(&degenerate).is_err());
    }

    #[test]
    fn centered_at_origin() {
        let anchor = HW::from_wh([4.0, 2.0]);
        assert_abs_diff_eq!(anchor.l(), -2.0);
        assert_abs_diff_eq!(anchor.t(), -1.0);
        assert_abs_diff_eq!(anchor.r(), 2.0);
        assert_abs_diff_eq!(anchor.b(), 1.0);
    }
}
