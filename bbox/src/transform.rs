use crate::common::*;

/// Per-axis affine transform `y' = sy * y + ty`, `x' = sx * x + tx`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Transform<T> {
    pub sy: T,
    pub sx: T,
    pub ty: T,
    pub tx: T,
}

impl<T> Transform<T>
where
    T: Copy + Num,
{
    pub fn identity() -> Self {
        Self {
            sy: T::one(),
            sx: T::one(),
            ty: T::zero(),
            tx: T::zero(),
        }
    }

    pub fn translation(ty: T, tx: T) -> Self {
        Self {
            ty,
            tx,
            ..Self::identity()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CyCxHW, RectNum};
    use approx::assert_abs_diff_eq;

    #[test]
    fn translate_box() {
        let bbox = CyCxHW::from_cxcywh([0.3, 0.6, 0.2, 0.1]);
        let [cx, cy, w, h] = bbox.transform(&Transform::translation(-0.1, 0.05)).cxcywh();
        assert_abs_diff_eq!(cx, 0.35, epsilon = 1e-12);
        assert_abs_diff_eq!(cy, 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(w, 0.2);
        assert_abs_diff_eq!(h, 0.1);

        assert_eq!(bbox.transform(&Transform::identity()), bbox);
    }
}
