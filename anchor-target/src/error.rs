//! Errors raised while preparing training targets.

use crate::{common::*, matching::ASSIGNMENT_WIDTH};
use thiserror::Error;

pub type Result<T, E = TargetError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum TargetError {
    /// The boxes, classes or anchors are unusable. The image is rejected
    /// instead of producing zero-filled targets.
    #[error("malformed input: {reason}")]
    MalformedInput { reason: String },
    /// A box clears the acceptance threshold for more anchors than an
    /// assignment can hold, and the overflow policy refuses to truncate.
    #[error(
        "box {box_index} accepts {accepted} anchors, but an assignment holds at most {}",
        ASSIGNMENT_WIDTH
    )]
    ThresholdOverflow { box_index: usize, accepted: usize },
    /// An error attributed to one image of a batch.
    #[error("image {index} of the batch is rejected")]
    Image {
        index: usize,
        #[source]
        source: Box<TargetError>,
    },
}

impl TargetError {
    pub fn malformed(reason: impl Display) -> Self {
        Self::MalformedInput {
            reason: reason.to_string(),
        }
    }

    /// Attribute the error to the image at `index` of a batch.
    pub fn in_image(self, index: usize) -> Self {
        Self::Image {
            index,
            source: Box::new(self),
        }
    }

    /// The error behind any number of image attributions.
    pub fn root(&self) -> &TargetError {
        match self {
            Self::Image { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<anyhow::Error> for TargetError {
    fn from(err: anyhow::Error) -> Self {
        Self::malformed(format!("{:#}", err))
    }
}
