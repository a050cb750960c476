//! The anchor shape catalog.

use crate::{common::*, error::*};

/// Anchor sizes `[w, h]` of the 3-level, 3-anchor YOLO configuration, in
/// pixels at 416×416.
pub const DEFAULT_ANCHORS: [[f64; 2]; 9] = [
    [12.0, 19.0],
    [31.0, 46.0],
    [96.0, 54.0],
    [46.0, 114.0],
    [133.0, 127.0],
    [79.0, 225.0],
    [301.0, 150.0],
    [172.0, 286.0],
    [348.0, 340.0],
];

/// The resolution `[w, h]` at which [DEFAULT_ANCHORS] are defined.
pub const DEFAULT_REFERENCE_RESOLUTION: [f64; 2] = [416.0, 416.0];

pub const DEFAULT_ANCHORS_PER_LEVEL: usize = 3;

/// The position of an anchor in a multi-level detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnchorLocation {
    /// The detection level.
    pub level: usize,
    /// The anchor index within the level.
    pub anchor: usize,
}

/// An ordered, non-empty catalog of anchor shapes.
///
/// The index of an anchor in the catalog is its identity. It decides the
/// tie-break order of the matcher and is what assignments refer to.
#[derive(Debug, Clone, PartialEq, Eq, Getters, CopyGetters)]
pub struct AnchorCatalog {
    /// Anchor sizes in pixels at the reference resolution.
    #[get = "pub"]
    anchors: Vec<HW<R64>>,
    /// Anchor sizes in units of the reference resolution.
    #[get = "pub"]
    normalized: Vec<HW<R64>>,
    #[get = "pub"]
    reference: HW<R64>,
    #[get_copy = "pub"]
    anchors_per_level: Option<NonZeroUsize>,
}

impl AnchorCatalog {
    pub fn new(
        anchors: Vec<HW<R64>>,
        reference: HW<R64>,
        anchors_per_level: Option<usize>,
    ) -> Result<Self> {
        if anchors.is_empty() {
            return Err(TargetError::malformed("the anchor catalog is empty"));
        }

        let normalized: Vec<_> = anchors
            .iter()
            .map(|anchor| anchor.try_normalize(&reference))
            .collect::<anyhow::Result<_>>()?;

        let anchors_per_level = match anchors_per_level {
            Some(count) => {
                let count = NonZeroUsize::new(count).ok_or_else(|| {
                    TargetError::malformed("anchors_per_level must be positive")
                })?;
                if anchors.len() % count.get() != 0 {
                    return Err(TargetError::malformed(format!(
                        "anchors_per_level {} does not divide the catalog size {}",
                        count,
                        anchors.len()
                    )));
                }
                Some(count)
            }
            None => None,
        };

        Ok(Self {
            anchors,
            normalized,
            reference,
            anchors_per_level,
        })
    }

    /// Build from `[w, h]` pairs in pixels and a `[w, h]` reference
    /// resolution.
    pub fn from_wh(
        anchors: &[[f64; 2]],
        reference: [f64; 2],
        anchors_per_level: Option<usize>,
    ) -> Result<Self> {
        let anchors: Vec<_> = anchors
            .iter()
            .map(|&wh| to_hw(wh))
            .collect::<Result<_>>()?;
        Self::new(anchors, to_hw(reference)?, anchors_per_level)
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    /// Always false. An empty catalog cannot be built.
    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    pub fn num_levels(&self) -> Option<usize> {
        self.anchors_per_level
            .map(|count| self.anchors.len() / count.get())
    }

    /// Decompose a flat anchor index into its detection level and the anchor
    /// index within that level.
    pub fn locate(&self, index: usize) -> Option<AnchorLocation> {
        let count = self.anchors_per_level?.get();
        (index < self.anchors.len()).then(|| AnchorLocation {
            level: index / count,
            anchor: index % count,
        })
    }
}

impl Default for AnchorCatalog {
    fn default() -> Self {
        Self::from_wh(
            &DEFAULT_ANCHORS,
            DEFAULT_REFERENCE_RESOLUTION,
            Some(DEFAULT_ANCHORS_PER_LEVEL),
        )
        .unwrap()
    }
}

fn to_hw([w, h]: [f64; 2]) -> Result<HW<R64>> {
    let w = R64::try_new(w).ok_or_else(|| TargetError::malformed("width is not finite"))?;
    let h = R64::try_new(h).ok_or_else(|| TargetError::malformed("height is not finite"))?;
    Ok(HW::try_from_wh([w, h])?)
}
