use super::Rect;
use crate::{common::*, Transform};

/// Bounding box in CyCxHW format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CyCxHW<T> {
    pub(crate) cy: T,
    pub(crate) cx: T,
    pub(crate) h: T,
    pub(crate) w: T,
}

impl<T> CyCxHW<T>
where
    T: Copy + Num + PartialOrd,
{
    pub fn try_from_cycxhw(cycxhw: [T; 4]) -> Result<Self> {
        let [cy, cx, h, w] = cycxhw;
        let zero = T::zero();
        ensure!(
            h >= zero && w >= zero,
            "box height and width must be non-negative"
        );

        Ok(Self { cy, cx, h, w })
    }

    /// Build a box from the center-x, center-y, width, height order used by
    /// dataset records.
    pub fn try_from_cxcywh(cxcywh: [T; 4]) -> Result<Self> {
        let [cx, cy, w, h] = cxcywh;
        Self::try_from_cycxhw([cy, cx, h, w])
    }

    pub fn from_cycxhw(cycxhw: [T; 4]) -> Self {
        Self::try_from_cycxhw(cycxhw).unwrap()
    }

    pub fn from_cxcywh(cxcywh: [T; 4]) -> Self {
        Self::try_from_cxcywh(cxcywh).unwrap()
    }

    /// Apply the affine transform. The transform must not flip the box.
    pub fn try_transform(&self, transform: &Transform<T>) -> Result<Self> {
        Self::try_from_cycxhw([
            self.cy * transform.sy + transform.ty,
            self.cx * transform.sx + transform.tx,
            self.h * transform.sy,
            self.w * transform.sx,
        ])
    }

    pub fn transform(&self, transform: &Transform<T>) -> Self {
        self.try_transform(transform).unwrap()
    }
}

impl<T> Rect for CyCxHW<T>
where
    T: Copy + Num + PartialOrd,
{
    type Type = T;

    fn t(&self) -> Self::Type {
        let two = T::one() + T::one();
        self.cy - self.h / two
    }

    fn l(&self) -> Self::Type {
        let two = T::one() + T::one();
        self.cx - self.w / two
    }

    fn b(&self) -> Self::Type {
        let two = T::one() + T::one();
        self.cy + self.h / two
    }

    fn r(&self) -> Self::Type {
        let two = T::one() + T::one();
        self.cx + self.w / two
    }

    fn cy(&self) -> Self::Type {
        self.cy
    }

    fn cx(&self) -> Self::Type {
        self.cx
    }

    fn h(&self) -> Self::Type {
        self.h
    }

    fn w(&self) -> Self::Type {
        self.w
    }
}
