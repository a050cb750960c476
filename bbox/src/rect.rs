use crate::common::*;

/// The generic rectangle.
pub trait Rect {
    type Type;

    fn t(&self) -> Self::Type;
    fn l(&self) -> Self::Type;
    fn b(&self) -> Self::Type;
    fn r(&self) -> Self::Type;
    fn cy(&self) -> Self::Type;
    fn cx(&self) -> Self::Type;
    fn h(&self) -> Self::Type;
    fn w(&self) -> Self::Type;
}

pub trait RectNum: Rect
where
    Self::Type: Num + PartialOrd,
{
    fn cycxhw(&self) -> [Self::Type; 4] {
        [self.cy(), self.cx(), self.h(), self.w()]
    }

    fn cxcywh(&self) -> [Self::Type; 4] {
        [self.cx(), self.cy(), self.w(), self.h()]
    }
}

pub trait RectFloat: RectNum
where
    Self::Type: Float,
{
    /// Intersection area of the two rectangles after moving both centers to
    /// the origin. Only the heights and widths take part.
    fn shape_intersection_area_with<R>(&self, other: &R) -> Self::Type
    where
        R: Rect<Type = Self::Type>,
    {
        self.h().min(other.h()) * self.w().min(other.w())
    }

    /// Intersection-over-union of the two rectangles after moving both
    /// centers to the origin.
    ///
    /// A rectangle with zero area has zero IoU with anything, including
    /// another empty rectangle.
    fn shape_iou_with<R>(&self, other: &R) -> Self::Type
    where
        R: Rect<Type = Self::Type>,
    {
        let zero = Self::Type::zero();
        let self_area = self.h() * self.w();
        let other_area = other.h() * other.w();
        if self_area <= zero || other_area <= zero {
            return zero;
        }

        let inter_area = self.shape_intersection_area_with(other);
        let union_area = self_area + other_area - inter_area;
        if union_area <= zero {
            return zero;
        }

        (inter_area / union_area).max(zero).min(Self::Type::one())
    }
}

impl<T> RectNum for T
where
    T: Rect,
    T::Type: Num + PartialOrd,
{
}

impl<T> RectFloat for T
where
    T: Rect,
    T::Type: Float,
{
}
