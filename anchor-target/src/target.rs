//! Per-image target building.

use crate::{
    anchors::AnchorCatalog,
    batch::MatchScope,
    common::*,
    error::*,
    jitter::SeededJitter,
    matching::{
        accepted_width, rank_anchors, Matching, OverflowPolicy, DEFAULT_ACCEPTANCE_THRESHOLD,
    },
    overlap::OverlapMatrix,
    padding::{InstancePadder, PaddedInstanceSet},
    ratio::Ratio,
};

/// The unvalidated annotations of one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Boxes in `[cx, cy, w, h]` order, normalized to the image size.
    pub boxes: Vec<Vec<f64>>,
    pub classes: Vec<i64>,
}

impl RawRecord {
    pub fn new(boxes: Vec<Vec<f64>>, classes: Vec<i64>) -> Self {
        Self { boxes, classes }
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// Validate the record. Every box needs four finite components and a
    /// non-negative size, and each box needs a class.
    pub fn to_labels(&self) -> Result<ImageLabels<R64, i64>> {
        let boxes: Vec<Vec<R64>> = self
            .boxes
            .iter()
            .enumerate()
            .map(|(index, values)| {
                values
                    .iter()
                    .map(|&value| R64::try_new(value))
                    .collect::<Option<Vec<_>>>()
                    .ok_or_else(|| {
                        TargetError::malformed(format!(
                            "box at index {} has a non-finite component",
                            index
                        ))
                    })
            })
            .collect::<Result<_>>()?;

        Ok(ImageLabels::try_from_parallel(&boxes, &self.classes)?)
    }
}

/// The training targets of one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters, CopyGetters)]
pub struct ImageTarget {
    #[get = "pub"]
    instances: PaddedInstanceSet,
    /// The candidate width the image was ranked with.
    #[get_copy = "pub"]
    width: usize,
    /// The number of boxes that lost accepted anchors to truncation.
    #[get_copy = "pub"]
    num_truncated: usize,
}

/// The validated labels and overlap of one image, ready to be ranked.
#[derive(Debug, Clone)]
pub(crate) struct PreparedImage {
    pub labels: ImageLabels<R64, i64>,
    pub overlap: OverlapMatrix,
}

/// Options of a [TargetBuilder]. Unset fields take their defaults.
#[derive(Debug, Clone, Default)]
pub struct TargetBuilderInit {
    pub catalog: Option<AnchorCatalog>,
    pub acceptance_threshold: Option<Ratio>,
    pub overflow_policy: Option<OverflowPolicy>,
    pub match_scope: Option<MatchScope>,
    pub jitter: Option<SeededJitter>,
    pub padder: Option<InstancePadder>,
}

impl TargetBuilderInit {
    pub fn build(self) -> Result<TargetBuilder> {
        let Self {
            catalog,
            acceptance_threshold,
            overflow_policy,
            match_scope,
            jitter,
            padder,
        } = self;

        let catalog = catalog.unwrap_or_default();
        let threshold = match acceptance_threshold {
            Some(threshold) => threshold.to_r64(),
            None => r64(DEFAULT_ACCEPTANCE_THRESHOLD),
        };
        let overflow_policy = overflow_policy.unwrap_or_default();
        let match_scope = match_scope.unwrap_or_default();
        let padder = padder.unwrap_or_default();

        let [cx, cy, w, h] = *padder.pad_box();
        if ![cx, cy, w, h].iter().all(|value| value.is_finite()) || w < 0.0 || h < 0.0 {
            return Err(TargetError::malformed(format!(
                "invalid pad box {:?}",
                padder.pad_box()
            )));
        }

        Ok(TargetBuilder {
            catalog,
            threshold,
            overflow_policy,
            match_scope,
            jitter,
            padder,
        })
    }
}

/// Turns raw annotations into fixed-size training targets.
#[derive(Debug, Clone, Getters, CopyGetters)]
pub struct TargetBuilder {
    #[get = "pub"]
    catalog: AnchorCatalog,
    #[get_copy = "pub"]
    threshold: R64,
    #[get_copy = "pub"]
    overflow_policy: OverflowPolicy,
    #[get_copy = "pub"]
    match_scope: MatchScope,
    #[get_copy = "pub"]
    jitter: Option<SeededJitter>,
    #[get = "pub"]
    padder: InstancePadder,
}

impl TargetBuilder {
    /// Build the targets of a single image.
    ///
    /// The image index selects the jitter generator and has no other
    /// effect. The candidate width is always reduced over this image alone.
    pub fn build_image(&self, record: &RawRecord, image_index: usize) -> Result<ImageTarget> {
        let prepared = self.prepare(record, image_index)?;
        let width = accepted_width(iter::once(&prepared.overlap), self.threshold);
        self.finish(prepared, width)
    }

    pub(crate) fn prepare(&self, record: &RawRecord, image_index: usize) -> Result<PreparedImage> {
        let labels = record.to_labels()?;
        let labels = match &self.jitter {
            Some(jitter) => jitter.apply(&labels, image_index)?,
            None => labels,
        };
        let boxes: Vec<_> = labels.boxes().copied().collect();
        let overlap = self.catalog.overlap(&boxes);
        Ok(PreparedImage { labels, overlap })
    }

    pub(crate) fn finish(&self, prepared: PreparedImage, width: usize) -> Result<ImageTarget> {
        let PreparedImage { labels, overlap } = prepared;
        let Matching {
            assignments,
            width,
            num_truncated,
        } = rank_anchors(&overlap, self.threshold, width, self.overflow_policy)?;

        let boxes: Vec<[f32; 4]> = labels
            .boxes()
            .map(|rect| rect.cxcywh().map(|value| value.raw() as f32))
            .collect();
        let classes: Vec<i64> = labels.classes().collect();
        let instances = self.padder.pad(boxes, classes, assignments)?;

        Ok(ImageTarget {
            instances,
            width,
            num_truncated,
        })
    }
}

impl Default for TargetBuilder {
    fn default() -> Self {
        Self {
            catalog: AnchorCatalog::default(),
            threshold: r64(DEFAULT_ACCEPTANCE_THRESHOLD),
            overflow_policy: OverflowPolicy::default(),
            match_scope: MatchScope::default(),
            jitter: None,
            padder: InstancePadder::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::NONE_INDEX;
    use approx::assert_abs_diff_eq;

    #[test]
    fn build_default_image() {
        let builder = TargetBuilder::default();
        let record = RawRecord::new(
            vec![vec![0.5, 0.5, 0.1, 0.1], vec![0.3, 0.6, 0.8, 0.7]],
            vec![2, 5],
        );
        let target = builder.build_image(&record, 0).unwrap();
        let instances = target.instances();

        assert_eq!(instances.max_count(), 200);
        assert_eq!(instances.num_valid(), 2);
        assert_eq!(instances.num_dropped(), 0);
        assert_eq!(instances.classes()[1], 5);
        assert_abs_diff_eq!(instances.boxes()[[1, 0]], 0.3f32);
        assert_abs_diff_eq!(instances.boxes()[[1, 3]], 0.7f32);
        assert!(instances.anchors()[[0, 0]] >= 0);
        assert!(instances.anchors()[[1, 0]] >= 0);
        assert!(instances
            .anchors()
            .slice(ndarray::s![2.., ..])
            .iter()
            .all(|&index| index == NONE_INDEX));
    }

    #[test]
    fn reject_malformed_record() {
        let builder = TargetBuilder::default();

        let nan = RawRecord::new(vec![vec![0.5, f64::NAN, 0.1, 0.1]], vec![0]);
        let err = builder.build_image(&nan, 0).unwrap_err();
        assert!(matches!(err, TargetError::MalformedInput { .. }));

        let short = RawRecord::new(vec![vec![0.5, 0.5, 0.1]], vec![0]);
        assert!(builder.build_image(&short, 0).is_err());

        let negative = RawRecord::new(vec![vec![0.5, 0.5, -0.1, 0.1]], vec![0]);
        assert!(builder.build_image(&negative, 0).is_err());

        let mismatch = RawRecord::new(vec![vec![0.5, 0.5, 0.1, 0.1]], vec![0, 1]);
        assert!(builder.build_image(&mismatch, 0).is_err());
    }

    #[test]
    fn empty_record_is_all_padding() {
        let builder = TargetBuilderInit {
            padder: Some(InstancePadder::new(4)),
            ..Default::default()
        }
        .build()
        .unwrap();
        let target = builder.build_image(&RawRecord::new(vec![], vec![]), 0).unwrap();
        assert_eq!(target.instances().num_valid(), 0);
        assert_eq!(target.width(), 1);
        assert!(target
            .instances()
            .anchors()
            .iter()
            .all(|&index| index == NONE_INDEX));
    }

    #[test]
    fn reject_invalid_pad_box() {
        let result = TargetBuilderInit {
            padder: Some(InstancePadder::with_pad_values(
                3,
                [0.0, 0.0, -1.0, 0.0],
                0,
                Default::default(),
            )),
            ..Default::default()
        }
        .build();
        assert!(result.is_err());
    }
}
