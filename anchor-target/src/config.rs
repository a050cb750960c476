//! Target preparation configuration format.

use crate::{
    anchors::{
        AnchorCatalog, DEFAULT_ANCHORS, DEFAULT_ANCHORS_PER_LEVEL, DEFAULT_REFERENCE_RESOLUTION,
    },
    batch::MatchScope,
    common::*,
    error::*,
    jitter::{BoxJitter, SeededJitter},
    matching::{AnchorAssignment, OverflowPolicy, DEFAULT_ACCEPTANCE_THRESHOLD},
    padding::{InstancePadder, DEFAULT_MAX_NUM_INSTANCES},
    ratio::Ratio,
    target::{TargetBuilder, TargetBuilderInit},
};

/// The main target preparation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetConfig {
    /// The fixed number of instances per image.
    #[serde(default = "default_max_num_instances")]
    pub max_num_instances: NonZeroUsize,
    /// Anchors whose overlap exceeds this value are accepted after the best
    /// anchor.
    #[serde(default = "default_acceptance_threshold")]
    pub acceptance_threshold: Ratio,
    #[serde(default)]
    pub overflow_policy: OverflowPolicy,
    #[serde(default)]
    pub match_scope: MatchScope,
    #[serde(default)]
    pub anchors: AnchorConfig,
    /// If set, boxes are jittered before matching.
    #[serde(default)]
    pub jitter: Option<JitterConfig>,
    #[serde(default)]
    pub pad: PadConfig,
}

impl TargetConfig {
    pub fn open<P>(path: P) -> anyhow::Result<Self>
    where
        P: AsRef<Path>,
    {
        let text = std::fs::read_to_string(path)?;
        let config = json5::from_str(&text)?;
        Ok(config)
    }

    pub fn build(&self) -> Result<TargetBuilder> {
        let Self {
            max_num_instances,
            acceptance_threshold,
            overflow_policy,
            match_scope,
            ref anchors,
            jitter,
            pad,
        } = *self;

        let catalog = anchors.catalog()?;
        let jitter = jitter
            .map(|JitterConfig { box_jitter, seed }| -> Result<_> {
                Ok(SeededJitter {
                    jitter: BoxJitter::new(box_jitter)?,
                    seed,
                })
            })
            .transpose()?;
        let padder = InstancePadder::with_pad_values(
            max_num_instances.get(),
            pad.bbox,
            pad.class,
            AnchorAssignment::none(),
        );

        TargetBuilderInit {
            catalog: Some(catalog),
            acceptance_threshold: Some(acceptance_threshold),
            overflow_policy: Some(overflow_policy),
            match_scope: Some(match_scope),
            jitter,
            padder: Some(padder),
        }
        .build()
    }
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            max_num_instances: default_max_num_instances(),
            acceptance_threshold: default_acceptance_threshold(),
            overflow_policy: OverflowPolicy::default(),
            match_scope: MatchScope::default(),
            anchors: AnchorConfig::default(),
            jitter: None,
            pad: PadConfig::default(),
        }
    }
}

/// The anchor catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorConfig {
    /// Anchor sizes as `[w, h]` pixel pairs.
    #[serde(default = "default_anchor_boxes")]
    pub boxes: Vec<[R64; 2]>,
    /// The resolution at which the anchor sizes are given.
    #[serde(default)]
    pub reference_resolution: Resolution,
    /// Groups consecutive anchors into detection levels.
    #[serde(default)]
    pub anchors_per_level: Option<usize>,
}

impl AnchorConfig {
    pub fn catalog(&self) -> Result<AnchorCatalog> {
        let anchors: Vec<_> = self
            .boxes
            .iter()
            .map(|&wh| HW::try_from_wh(wh))
            .collect::<anyhow::Result<_>>()?;
        let Resolution { w, h } = self.reference_resolution;
        AnchorCatalog::new(anchors, HW::try_from_wh([w, h])?, self.anchors_per_level)
    }
}

impl Default for AnchorConfig {
    fn default() -> Self {
        Self {
            boxes: default_anchor_boxes(),
            reference_resolution: Resolution::default(),
            anchors_per_level: Some(DEFAULT_ANCHORS_PER_LEVEL),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub w: R64,
    pub h: R64,
}

impl Default for Resolution {
    fn default() -> Self {
        let [w, h] = DEFAULT_REFERENCE_RESOLUTION;
        Self { w: r64(w), h: r64(h) }
    }
}

/// Box jitter options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JitterConfig {
    /// The maximum center shift and relative size change.
    pub box_jitter: Ratio,
    #[serde(default = "default_jitter_seed")]
    pub seed: u64,
}

/// The values written into padded instance slots.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PadConfig {
    #[serde(rename = "box", default)]
    pub bbox: [f32; 4],
    #[serde(default)]
    pub class: i64,
}

impl Default for PadConfig {
    fn default() -> Self {
        Self {
            bbox: [0.0; 4],
            class: 0,
        }
    }
}

fn default_max_num_instances() -> NonZeroUsize {
    NonZeroUsize::new(DEFAULT_MAX_NUM_INSTANCES).unwrap()
}

fn default_acceptance_threshold() -> Ratio {
    Ratio::try_from(DEFAULT_ACCEPTANCE_THRESHOLD).unwrap()
}

fn default_anchor_boxes() -> Vec<[R64; 2]> {
    DEFAULT_ANCHORS.iter().map(|wh| wh.map(r64)).collect()
}

fn default_jitter_seed() -> u64 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;
    use lazy_static::lazy_static;
    use std::path::PathBuf;

    lazy_static! {
        static ref CONFIG_DIR: PathBuf = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("cfg");
    }

    #[test]
    fn empty_config_takes_defaults() {
        let config: TargetConfig = json5::from_str("{}").unwrap();
        assert_eq!(config, TargetConfig::default());

        let builder = config.build().unwrap();
        assert_eq!(builder.catalog().len(), 9);
        assert_eq!(builder.catalog().num_levels(), Some(3));
        assert_eq!(builder.threshold(), DEFAULT_ACCEPTANCE_THRESHOLD);
        assert_eq!(builder.padder().max_count(), 200);
        assert_eq!(builder.overflow_policy(), OverflowPolicy::Truncate);
        assert_eq!(builder.match_scope(), MatchScope::Image);
        assert!(builder.jitter().is_none());
    }

    #[test]
    fn partial_anchor_config() {
        let text = r#"{
            anchors: {
                boxes: [[10, 13], [16, 30], [33, 23]],
            },
        }"#;
        let config: TargetConfig = json5::from_str(text).unwrap();
        assert_eq!(config.anchors.anchors_per_level, None);
        assert_eq!(config.anchors.reference_resolution, Resolution::default());
        assert_eq!(config.build().unwrap().catalog().len(), 3);
    }

    #[test]
    fn reject_invalid_values() {
        assert!(json5::from_str::<TargetConfig>("{ acceptance_threshold: 1.5 }").is_err());
        assert!(json5::from_str::<TargetConfig>("{ max_num_instances: 0 }").is_err());
        assert!(json5::from_str::<TargetConfig>("{ overflow_policy: 'drop' }").is_err());

        let config: TargetConfig = json5::from_str("{ jitter: { box_jitter: 1.0 } }").unwrap();
        assert!(config.build().is_err());

        let config: TargetConfig =
            json5::from_str("{ anchors: { boxes: [[10, 13]], anchors_per_level: 2 } }").unwrap();
        assert!(config.build().is_err());

        let config: TargetConfig = json5::from_str("{ anchors: { boxes: [] } }").unwrap();
        assert!(config.build().is_err());
    }

    #[test]
    fn open_config_files() {
        let config = TargetConfig::open(CONFIG_DIR.join("default.json5")).unwrap();
        assert_eq!(config, TargetConfig::default());

        let config = TargetConfig::open(CONFIG_DIR.join("full.json5")).unwrap();
        assert_eq!(config.max_num_instances.get(), 100);
        assert_eq!(config.overflow_policy, OverflowPolicy::Reject);
        assert_eq!(config.match_scope, MatchScope::Batch);
        assert_eq!(
            config.jitter,
            Some(JitterConfig {
                box_jitter: Ratio::try_from(0.025).unwrap(),
                seed: 42,
            })
        );
        assert_eq!(config.pad.class, -1);

        let builder = config.build().unwrap();
        assert_eq!(builder.padder().pad_class(), -1);
        assert_eq!(builder.catalog().num_levels(), Some(3));
    }
}
