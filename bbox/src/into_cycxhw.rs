use crate::{common::*, CyCxHW};

/// Unchecked bounding box in CyCxHW format.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CyCxHW_<T> {
    pub cy: T,
    pub cx: T,
    pub h: T,
    pub w: T,
}

impl<T> CyCxHW_<T> {
    /// Read a box stored as `[cx, cy, w, h]`.
    pub fn from_cxcywh_slice(values: &[T]) -> Result<Self>
    where
        T: Copy,
    {
        ensure!(
            values.len() == 4,
            "a box must have exactly 4 components, but get {}",
            values.len()
        );
        Ok(Self {
            cx: values[0],
            cy: values[1],
            w: values[2],
            h: values[3],
        })
    }
}

impl<T> TryFrom<&CyCxHW_<T>> for CyCxHW<T>
where
    T: Copy + Num + PartialOrd,
{
    type Error = anyhow::Error;

    fn try_from(from: &CyCxHW_<T>) -> Result<Self, Self::Error> {
        let CyCxHW_ { cy, cx, h, w } = *from;
        Self::try_from_cycxhw([cy, cx, h, w])
    }
}

impl<T> TryFrom<CyCxHW_<T>> for CyCxHW<T>
where
    T: Copy + Num + PartialOrd,
{
    type Error = anyhow::Error;

    fn try_from(from: CyCxHW_<T>) -> Result<Self, Self::Error> {
        Self::try_from(&from)
    }
}
