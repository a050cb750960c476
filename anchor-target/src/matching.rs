//! Assignment of responsible anchors to ground-truth boxes.

use crate::{common::*, error::*, overlap::OverlapMatrix};

/// The number of anchor slots per ground-truth box.
pub const ASSIGNMENT_WIDTH: usize = 5;

/// The slot value meaning "no further accepted anchor".
pub const NONE_INDEX: i64 = -1;

pub const DEFAULT_ACCEPTANCE_THRESHOLD: f64 = 0.213;

/// Ranked anchor indices of one ground-truth box.
///
/// Slot 0 always holds the best-overlap anchor. The following slots hold
/// anchors whose overlap exceeds the acceptance threshold in descending
/// overlap order, and [NONE_INDEX] after them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "[i64; ASSIGNMENT_WIDTH]", try_from = "[i64; ASSIGNMENT_WIDTH]")]
pub struct AnchorAssignment([i64; ASSIGNMENT_WIDTH]);

impl AnchorAssignment {
    /// An assignment without any anchor, used for padded instances.
    pub fn none() -> Self {
        Self([NONE_INDEX; ASSIGNMENT_WIDTH])
    }

    /// Wrap raw slots. Sentinels must only follow anchor indices.
    pub fn from_slots(slots: [i64; ASSIGNMENT_WIDTH]) -> Result<Self> {
        let num_leading = slots.iter().take_while(|&&index| index >= 0).count();
        if slots[num_leading..].iter().any(|&index| index != NONE_INDEX) {
            return Err(TargetError::malformed(format!(
                "invalid anchor slots {:?}",
                slots
            )));
        }
        Ok(Self(slots))
    }

    pub fn slots(&self) -> &[i64; ASSIGNMENT_WIDTH] {
        &self.0
    }

    /// The best-overlap anchor. `None` only for padding.
    pub fn best(&self) -> Option<usize> {
        self.anchors().next()
    }

    pub fn anchors(&self) -> impl Iterator<Item = usize> + '_ {
        self.0
            .iter()
            .take_while(|&&index| index != NONE_INDEX)
            .map(|&index| index as usize)
    }

    pub fn num_assigned(&self) -> usize {
        self.anchors().count()
    }
}

impl TryFrom<[i64; ASSIGNMENT_WIDTH]> for AnchorAssignment {
    type Error = TargetError;

    fn try_from(slots: [i64; ASSIGNMENT_WIDTH]) -> Result<Self> {
        Self::from_slots(slots)
    }
}

impl From<AnchorAssignment> for [i64; ASSIGNMENT_WIDTH] {
    fn from(assignment: AnchorAssignment) -> Self {
        assignment.0
    }
}

impl Default for AnchorAssignment {
    fn default() -> Self {
        Self::none()
    }
}

/// What to do when a box accepts more anchors than [ASSIGNMENT_WIDTH].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Keep the best [ASSIGNMENT_WIDTH] anchors.
    Truncate,
    /// Fail with [TargetError::ThresholdOverflow].
    Reject,
}

impl Default for OverflowPolicy {
    fn default() -> Self {
        Self::Truncate
    }
}

/// The assignments of the rows of one overlap matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matching {
    pub assignments: Vec<AnchorAssignment>,
    /// The number of ranked candidates per box before the result was
    /// brought to [ASSIGNMENT_WIDTH].
    pub width: usize,
    /// The number of boxes that lost accepted anchors to truncation.
    pub num_truncated: usize,
}

/// The number of anchors whose overlap exceeds the threshold.
pub fn count_accepted(row: ArrayView1<'_, R64>, threshold: R64) -> usize {
    row.iter().filter(|&&iou| iou > threshold).count()
}

/// The largest number of accepted anchors of any box in the matrices,
/// but at least 1.
///
/// All boxes whose rows are ranked together share this width, so it is
/// reduced once before ranking.
pub fn accepted_width<'a, I>(matrices: I, threshold: R64) -> usize
where
    I: IntoIterator<Item = &'a OverlapMatrix>,
{
    matrices
        .into_iter()
        .flat_map(|overlap| overlap.rows())
        .map(|row| count_accepted(row, threshold))
        .max()
        .unwrap_or(0)
        .max(1)
}

/// Assign anchors to every box of the matrix, the matrix being the set of
/// boxes processed together.
pub fn match_anchors(
    overlap: &OverlapMatrix,
    threshold: R64,
    policy: OverflowPolicy,
) -> Result<Matching> {
    let width = accepted_width(iter::once(overlap), threshold);
    rank_anchors(overlap, threshold, width, policy)
}

/// Assign anchors to every box of the matrix with a candidate width
/// computed beforehand by [accepted_width].
///
/// Anchors are ranked by descending overlap. Equal overlaps keep the lower
/// anchor index first.
pub fn rank_anchors(
    overlap: &OverlapMatrix,
    threshold: R64,
    width: usize,
    policy: OverflowPolicy,
) -> Result<Matching> {
    debug_assert!(width >= 1);

    let mut num_truncated = 0;
    let assignments: Vec<_> = overlap
        .rows()
        .enumerate()
        .map(|(box_index, row)| {
            let accepted = count_accepted(row, threshold);
            if accepted > ASSIGNMENT_WIDTH {
                match policy {
                    OverflowPolicy::Truncate => num_truncated += 1,
                    OverflowPolicy::Reject => {
                        return Err(TargetError::ThresholdOverflow {
                            box_index,
                            accepted,
                        });
                    }
                }
            }
            Ok(rank_row(row, threshold, width))
        })
        .collect::<Result<_>>()?;

    if num_truncated > 0 {
        debug!(
            "{} boxes accept more than {} anchors, keeping the best {}",
            num_truncated, ASSIGNMENT_WIDTH, ASSIGNMENT_WIDTH
        );
    }

    Ok(Matching {
        assignments,
        width,
        num_truncated,
    })
}

fn rank_row(row: ArrayView1<'_, R64>, threshold: R64, width: usize) -> AnchorAssignment {
    // stable sort keeps lower indexes first among equal overlaps
    let mut order: Vec<usize> = (0..row.len()).collect();
    order.sort_by(|&lhs, &rhs| row[rhs].cmp(&row[lhs]));
    debug_assert!(!order.is_empty(), "the anchor catalog is empty");

    let mut slots = [NONE_INDEX; ASSIGNMENT_WIDTH];
    order
        .into_iter()
        .take(width.min(ASSIGNMENT_WIDTH))
        .enumerate()
        .filter(|&(slot, anchor)| slot == 0 || row[anchor] > threshold)
        .for_each(|(slot, anchor)| slots[slot] = anchor as i64);

    AnchorAssignment(slots)
}
