//! Training target preparation for anchor-based detectors.
//!
//! The ground-truth boxes of an image are compared to a catalog of anchor
//! shapes ([overlap]), every box is assigned a ranked list of responsible
//! anchors ([matching]) and the per-image instances are brought to a fixed
//! count ([padding]) so that images can be stacked into batches ([batch]).

mod common;
pub mod anchors;
pub mod batch;
pub mod config;
pub mod error;
pub mod jitter;
pub mod matching;
pub mod overlap;
pub mod padding;
pub mod ratio;
pub mod target;

pub use anchors::*;
pub use batch::*;
pub use config::*;
pub use error::*;
pub use jitter::*;
pub use matching::*;
pub use overlap::*;
pub use padding::*;
pub use ratio::*;
pub use target::*;
