//! Batched target building.

use crate::{
    common::*,
    error::*,
    matching::{accepted_width, ASSIGNMENT_WIDTH, NONE_INDEX},
    target::{ImageTarget, RawRecord, TargetBuilder},
};

/// The set of boxes whose rows share one candidate width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchScope {
    /// Each image reduces its own width.
    Image,
    /// The width is reduced once over all boxes of the batch.
    Batch,
}

impl Default for MatchScope {
    fn default() -> Self {
        Self::Image
    }
}

/// The stacked targets of a batch of images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters, CopyGetters)]
pub struct BatchTargets {
    /// The index of the first image in the batch.
    #[get_copy = "pub"]
    first_index: usize,
    /// Boxes in `[cx, cy, w, h]` order, shape `[N, max_count, 4]`.
    #[get = "pub"]
    boxes: Array3<f32>,
    /// Class ids, shape `[N, max_count]`.
    #[get = "pub"]
    classes: Array2<i64>,
    /// Anchor assignments, shape `[N, max_count, 5]`.
    #[get = "pub"]
    anchors: Array3<i64>,
    #[get = "pub"]
    num_valid: Vec<usize>,
    #[get = "pub"]
    num_dropped: Vec<usize>,
    /// The candidate width each image was ranked with.
    #[get = "pub"]
    widths: Vec<usize>,
}

impl BatchTargets {
    pub fn len(&self) -> usize {
        self.num_valid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.num_valid.is_empty()
    }

    pub fn max_count(&self) -> usize {
        self.classes.ncols()
    }

    fn stack(first_index: usize, targets: &[ImageTarget], max_count: usize) -> Self {
        let batch_size = targets.len();
        let mut boxes = Array3::zeros((batch_size, max_count, 4));
        let mut classes = Array2::zeros((batch_size, max_count));
        let mut anchors = Array3::from_elem((batch_size, max_count, ASSIGNMENT_WIDTH), NONE_INDEX);

        izip!(
            boxes.outer_iter_mut(),
            classes.outer_iter_mut(),
            anchors.outer_iter_mut(),
            targets
        )
        .for_each(|(mut boxes, mut classes, mut anchors, target)| {
            let instances = target.instances();
            boxes.assign(instances.boxes());
            classes.assign(instances.classes());
            anchors.assign(instances.anchors());
        });

        let num_valid = targets
            .iter()
            .map(|target| target.instances().num_valid())
            .collect();
        let num_dropped = targets
            .iter()
            .map(|target| target.instances().num_dropped())
            .collect();
        let widths = targets.iter().map(|target| target.width()).collect();

        Self {
            first_index,
            boxes,
            classes,
            anchors,
            num_valid,
            num_dropped,
            widths,
        }
    }
}

impl TargetBuilder {
    /// Build and stack the targets of a batch of images.
    ///
    /// Images are processed in parallel. `first_index` is the index of the
    /// first record in the whole dataset. It selects the jitter generators
    /// and is reported in [TargetError::Image] when an image is rejected.
    /// If several images are malformed, any one of them may be reported.
    pub fn build_batch(&self, records: &[RawRecord], first_index: usize) -> Result<BatchTargets> {
        let threshold = self.threshold();

        let prepared: Vec<_> = records
            .par_iter()
            .enumerate()
            .map(|(offset, record)| {
                let index = first_index + offset;
                self.prepare(record, index).map_err(|err| err.in_image(index))
            })
            .collect::<Result<_>>()?;

        let shared_width = match self.match_scope() {
            MatchScope::Image => None,
            MatchScope::Batch => {
                let width =
                    accepted_width(prepared.iter().map(|image| &image.overlap), threshold);
                debug!("shared candidate width {} over {} images", width, prepared.len());
                Some(width)
            }
        };

        let targets: Vec<_> = prepared
            .into_par_iter()
            .enumerate()
            .map(|(offset, image)| {
                let index = first_index + offset;
                let width = shared_width.unwrap_or_else(|| {
                    accepted_width(iter::once(&image.overlap), threshold)
                });
                self.finish(image, width).map_err(|err| err.in_image(index))
            })
            .collect::<Result<_>>()?;

        let batch = BatchTargets::stack(first_index, &targets, self.padder().max_count());

        let num_dropped: usize = batch.num_dropped.iter().sum();
        let num_truncated: usize = targets.iter().map(|target| target.num_truncated()).sum();
        debug!(
            "built targets of images {}..{}: {} instances dropped, {} boxes truncated",
            first_index,
            first_index + batch.len(),
            num_dropped,
            num_truncated
        );

        Ok(batch)
    }
}
