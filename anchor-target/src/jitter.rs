//! Box-level augmentation applied before matching.

use crate::{common::*, error::*, ratio::Ratio};

/// Derive the random generator of one image.
///
/// The generator depends only on the seed and the image index, so images
/// processed in parallel draw the same values in any order.
pub fn image_rng(seed: u64, image_index: usize) -> StdRng {
    StdRng::seed_from_u64(seed ^ (image_index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

/// Random perturbation of box centers and sizes.
///
/// Each box draws four independent values from `U(-j, j)`. The first two
/// shift the center, the other two scale the width and height by `1 + u`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxJitter {
    max_jitter: R64,
}

impl BoxJitter {
    /// The magnitude must be below 1 so that scaled boxes keep a
    /// non-negative size.
    pub fn new(max_jitter: Ratio) -> Result<Self> {
        let max_jitter = max_jitter.to_r64();
        if max_jitter >= 1.0 {
            return Err(TargetError::malformed(format!(
                "box jitter must be less than 1, but get {}",
                max_jitter
            )));
        }
        Ok(Self { max_jitter })
    }

    pub fn max_jitter(&self) -> R64 {
        self.max_jitter
    }

    pub fn jitter<R>(
        &self,
        labels: &ImageLabels<R64, i64>,
        rng: &mut R,
    ) -> Result<ImageLabels<R64, i64>>
    where
        R: Rng,
    {
        if self.max_jitter == 0.0 {
            return Ok(labels.clone());
        }

        let j = self.max_jitter.raw();
        let jittered = labels.try_map_boxes(|rect| {
            let mut draw = || r64(rng.gen_range(-j..=j));
            let (dx, dy, sw, sh) = (draw(), draw(), draw(), draw());
            let [cx, cy, w, h] = rect.cxcywh();
            CyCxHW::try_from_cxcywh([cx + dx, cy + dy, w * (sw + 1.0), h * (sh + 1.0)])
        })?;
        Ok(jittered)
    }
}

/// A [BoxJitter] drawing from per-image generators of a fixed seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeededJitter {
    pub jitter: BoxJitter,
    pub seed: u64,
}

impl SeededJitter {
    pub fn apply(
        &self,
        labels: &ImageLabels<R64, i64>,
        image_index: usize,
    ) -> Result<ImageLabels<R64, i64>> {
        let mut rng = image_rng(self.seed, image_index);
        self.jitter.jitter(labels, &mut rng)
    }
}

/// Shift every box by the same offset. Sizes and classes are kept.
pub fn translate_boxes(
    labels: &ImageLabels<R64, i64>,
    translate_x: R64,
    translate_y: R64,
) -> Result<ImageLabels<R64, i64>> {
    Ok(labels.try_transform(&Transform::translation(translate_y, translate_x))?)
}
