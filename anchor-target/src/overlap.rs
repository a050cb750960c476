//! Shape overlap between ground-truth boxes and anchors.

use crate::{anchors::AnchorCatalog, common::*, error::*};

/// Dense IoU table with one row per ground-truth box and one column per
/// anchor. Every entry lies in [0, 1].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlapMatrix {
    scores: Array2<R64>,
}

impl OverlapMatrix {
    pub fn num_boxes(&self) -> usize {
        self.scores.nrows()
    }

    pub fn num_anchors(&self) -> usize {
        self.scores.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.num_boxes() == 0
    }

    pub fn get(&self, box_index: usize, anchor_index: usize) -> Option<R64> {
        self.scores.get((box_index, anchor_index)).copied()
    }

    pub fn row(&self, box_index: usize) -> ArrayView1<'_, R64> {
        self.scores.row(box_index)
    }

    pub fn rows(&self) -> impl Iterator<Item = ArrayView1<'_, R64>> + '_ {
        self.scores.outer_iter()
    }

    pub fn as_array(&self) -> &Array2<R64> {
        &self.scores
    }
}

/// Compute the IoU of every box against every anchor.
///
/// Anchors are given in pixels at the `reference` resolution and are
/// normalized to the box coordinate space first. Boxes and anchors are
/// compared as if they shared the same center.
pub fn compute_overlap(
    boxes: &[CyCxHW<R64>],
    anchors: &[HW<R64>],
    reference: &HW<R64>,
) -> Result<OverlapMatrix> {
    if anchors.is_empty() {
        return Err(TargetError::malformed("the anchor catalog is empty"));
    }
    let normalized: Vec<_> = anchors
        .iter()
        .map(|anchor| anchor.try_normalize(reference))
        .collect::<anyhow::Result<_>>()?;
    Ok(overlap_with_normalized(boxes, &normalized))
}

impl AnchorCatalog {
    /// Compute the IoU of every box against every anchor of the catalog.
    pub fn overlap(&self, boxes: &[CyCxHW<R64>]) -> OverlapMatrix {
        overlap_with_normalized(boxes, self.normalized())
    }
}

fn overlap_with_normalized(boxes: &[CyCxHW<R64>], anchors: &[HW<R64>]) -> OverlapMatrix {
    let shape = (boxes.len(), anchors.len());
    let scores = Array2::from_shape_fn(shape, |(box_index, anchor_index)| {
        boxes[box_index].shape_iou_with(&anchors[anchor_index])
    });
    OverlapMatrix { scores }
}
