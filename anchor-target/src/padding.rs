//! Normalization of per-image instances to a fixed count.

use crate::{
    common::*,
    error::*,
    matching::{AnchorAssignment, ASSIGNMENT_WIDTH},
};

pub const DEFAULT_MAX_NUM_INSTANCES: usize = 200;

/// A sequence brought to a fixed length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Padded<T> {
    pub items: Vec<T>,
    /// The number of leading items taken from the input.
    pub num_valid: usize,
    /// The number of input items cut off at the end.
    pub num_dropped: usize,
}

/// Bring `items` to exactly `max_count` elements.
///
/// Longer input keeps its first `max_count` items in order. Shorter input
/// is filled up with copies of `pad_value`.
pub fn pad_or_truncate<T>(mut items: Vec<T>, max_count: usize, pad_value: T) -> Padded<T>
where
    T: Clone,
{
    let num_items = items.len();
    let num_valid = num_items.min(max_count);
    let num_dropped = num_items - num_valid;

    items.truncate(max_count);
    items.resize(max_count, pad_value);

    Padded {
        items,
        num_valid,
        num_dropped,
    }
}

/// The fixed-size instance arrays of one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters, CopyGetters)]
pub struct PaddedInstanceSet {
    /// Boxes in `[cx, cy, w, h]` order, shape `[max_count, 4]`.
    #[get = "pub"]
    boxes: Array2<f32>,
    /// Class ids, shape `[max_count]`.
    #[get = "pub"]
    classes: Array1<i64>,
    /// Anchor assignments, shape `[max_count, 5]`.
    #[get = "pub"]
    anchors: Array2<i64>,
    #[get_copy = "pub"]
    num_valid: usize,
    #[get_copy = "pub"]
    num_dropped: usize,
}

impl PaddedInstanceSet {
    pub fn max_count(&self) -> usize {
        self.classes.len()
    }
}

/// Applies one truncation or padding plan to the parallel per-image arrays.
#[derive(Debug, Clone, PartialEq, Getters, CopyGetters)]
pub struct InstancePadder {
    #[get_copy = "pub"]
    max_count: usize,
    #[get = "pub"]
    pad_box: [f32; 4],
    #[get_copy = "pub"]
    pad_class: i64,
    #[get = "pub"]
    pad_assignment: AnchorAssignment,
}

impl InstancePadder {
    /// A padder with zero boxes, class 0 and empty assignments as pad
    /// values.
    pub fn new(max_count: usize) -> Self {
        Self {
            max_count,
            pad_box: [0.0; 4],
            pad_class: 0,
            pad_assignment: AnchorAssignment::none(),
        }
    }

    pub fn with_pad_values(
        max_count: usize,
        pad_box: [f32; 4],
        pad_class: i64,
        pad_assignment: AnchorAssignment,
    ) -> Self {
        Self {
            max_count,
            pad_box,
            pad_class,
            pad_assignment,
        }
    }

    /// Pad or truncate the boxes, classes and assignments of one image.
    ///
    /// The three inputs are index-aligned and must be equally long.
    pub fn pad(
        &self,
        boxes: Vec<[f32; 4]>,
        classes: Vec<i64>,
        assignments: Vec<AnchorAssignment>,
    ) -> Result<PaddedInstanceSet> {
        if boxes.len() != classes.len() || boxes.len() != assignments.len() {
            return Err(TargetError::malformed(format!(
                "parallel instance arrays differ in length: {} boxes, {} classes, {} assignments",
                boxes.len(),
                classes.len(),
                assignments.len()
            )));
        }

        let boxes = pad_or_truncate(boxes, self.max_count, self.pad_box);
        let classes = pad_or_truncate(classes, self.max_count, self.pad_class);
        let assignments = pad_or_truncate(assignments, self.max_count, self.pad_assignment);
        debug_assert!(boxes.num_valid == classes.num_valid);
        debug_assert!(boxes.num_valid == assignments.num_valid);

        if boxes.num_dropped > 0 {
            debug!(
                "drop {} instances beyond the limit of {}",
                boxes.num_dropped, self.max_count
            );
        }

        let Padded {
            items: boxes,
            num_valid,
            num_dropped,
        } = boxes;

        Ok(PaddedInstanceSet {
            boxes: Array2::from_shape_fn((self.max_count, 4), |(row, col)| boxes[row][col]),
            classes: Array1::from(classes.items),
            anchors: Array2::from_shape_fn((self.max_count, ASSIGNMENT_WIDTH), |(row, col)| {
                assignments.items[row].slots()[col]
            }),
            num_valid,
            num_dropped,
        })
    }
}

impl Default for InstancePadder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_NUM_INSTANCES)
    }
}
