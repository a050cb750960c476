use anchor_target::{
    MatchScope, OverflowPolicy, RawRecord, TargetBuilder, TargetConfig, TargetError, NONE_INDEX,
};
use anyhow::Result;
use approx::assert_abs_diff_eq;
use std::path::{Path, PathBuf};

lazy_static::lazy_static! {
    static ref CONFIG_DIR: PathBuf = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("cfg");
}

fn load_builder(file_name: &str) -> Result<TargetBuilder> {
    let config = TargetConfig::open(CONFIG_DIR.join(file_name))?;
    Ok(config.build()?)
}

fn record(boxes: &[[f64; 4]]) -> RawRecord {
    RawRecord::new(
        boxes.iter().map(|values| values.to_vec()).collect(),
        (0..boxes.len() as i64).collect(),
    )
}

#[test]
fn small_box_accepts_all_anchors() -> Result<()> {
    let builder = load_builder("small-anchors.json5")?;
    let target = builder.build_image(&record(&[[0.5, 0.5, 0.05, 0.07]]), 0)?;
    let anchors = target.instances().anchors();

    assert_eq!(anchors.row(0).to_vec(), vec![1, 2, 0, NONE_INDEX, NONE_INDEX]);
    assert_eq!(target.width(), 3);
    assert_eq!(target.num_truncated(), 0);
    Ok(())
}

#[test]
fn excess_instances_are_dropped() -> Result<()> {
    let builder = load_builder("small-anchors.json5")?;
    let boxes = [
        [0.1, 0.1, 0.05, 0.05],
        [0.2, 0.2, 0.10, 0.05],
        [0.3, 0.3, 0.05, 0.10],
        [0.4, 0.4, 0.20, 0.20],
        [0.5, 0.5, 0.30, 0.30],
    ];
    let target = builder.build_image(&record(&boxes), 0)?;
    let instances = target.instances();

    assert_eq!(instances.num_valid(), 3);
    assert_eq!(instances.num_dropped(), 2);
    assert_eq!(instances.classes().to_vec(), vec![0, 1, 2]);
    for (row, expect) in instances.boxes().outer_iter().zip(&boxes[..3]) {
        for (&value, &expect) in row.iter().zip(expect) {
            assert_abs_diff_eq!(value, expect as f32);
        }
    }
    Ok(())
}

#[test]
fn missing_instances_are_padded() -> Result<()> {
    let builder = load_builder("small-anchors.json5")?;
    let target = builder.build_image(&record(&[[0.5, 0.5, 0.05, 0.07]]), 0)?;
    let instances = target.instances();

    assert_eq!(instances.num_valid(), 1);
    assert_eq!(instances.num_dropped(), 0);
    assert_abs_diff_eq!(instances.boxes()[[0, 2]], 0.05f32);
    assert!(instances
        .boxes()
        .slice(ndarray::s![1.., ..])
        .iter()
        .all(|&value| value == 0.0));
    assert_eq!(instances.classes().to_vec(), vec![0, 0, 0]);
    for row in 1..3 {
        assert_eq!(instances.anchors().row(row).to_vec(), vec![NONE_INDEX; 5]);
    }
    Ok(())
}

#[test]
fn overflow_is_truncated() -> Result<()> {
    let builder = load_builder("overflow-truncate.json5")?;
    assert_eq!(builder.overflow_policy(), OverflowPolicy::Truncate);

    let target = builder.build_image(&record(&[[0.5, 0.5, 0.103, 0.103]]), 0)?;
    assert_eq!(target.width(), 7);
    assert_eq!(target.num_truncated(), 1);
    assert_eq!(
        target.instances().anchors().row(0).to_vec(),
        vec![3, 4, 2, 5, 1]
    );
    Ok(())
}

#[test]
fn overflow_is_rejected() -> Result<()> {
    let builder = load_builder("overflow-reject.json5")?;
    let boxes = [[0.5, 0.5, 0.5, 0.5], [0.5, 0.5, 0.103, 0.103]];

    let err = builder.build_image(&record(&boxes), 0).unwrap_err();
    assert!(matches!(
        err,
        TargetError::ThresholdOverflow {
            box_index: 1,
            accepted: 7
        }
    ));

    let records = vec![record(&boxes[..1]), record(&boxes)];
    let err = builder.build_batch(&records, 20).unwrap_err();
    assert!(matches!(err, TargetError::Image { index: 21, .. }));
    assert!(matches!(
        err.root(),
        TargetError::ThresholdOverflow { box_index: 1, .. }
    ));
    Ok(())
}

#[test]
fn batch_scope_couples_images() -> Result<()> {
    let builder = load_builder("batch-scope.json5")?;
    assert_eq!(builder.match_scope(), MatchScope::Batch);

    let records = vec![
        record(&[[0.5, 0.5, 0.11, 0.11]]),
        record(&[[0.5, 0.5, 0.9, 0.9], [0.2, 0.2, 0.1, 0.1]]),
        record(&[]),
    ];
    let batch = builder.build_batch(&records, 0)?;

    assert_eq!(batch.widths(), &vec![3, 3, 3]);
    assert_eq!(batch.num_valid(), &vec![1, 2, 0]);
    assert_eq!(batch.boxes().shape(), &[3, 2, 4]);

    let anchors = batch.anchors();
    assert_eq!(
        anchors.slice(ndarray::s![0, 0, ..]).to_vec(),
        vec![1, 2, 0, NONE_INDEX, NONE_INDEX]
    );
    assert_eq!(
        anchors.slice(ndarray::s![1, 0, ..]).to_vec(),
        vec![3, NONE_INDEX, NONE_INDEX, NONE_INDEX, NONE_INDEX]
    );
    assert!(anchors
        .slice(ndarray::s![2, .., ..])
        .iter()
        .all(|&index| index == NONE_INDEX));
    Ok(())
}

#[test]
fn jitter_is_reproducible() -> Result<()> {
    let builder = load_builder("full.json5")?;
    let records: Vec<_> = (0..16)
        .map(|index| {
            let offset = index as f64 * 0.01;
            record(&[[0.3 + offset, 0.6 - offset, 0.1, 0.2], [0.5, 0.5, 0.1, 0.1]])
        })
        .collect();

    let lhs = builder.build_batch(&records, 0)?;
    let rhs = builder.build_batch(&records, 0)?;
    assert_eq!(lhs, rhs);

    // the same image at another dataset position draws other jitter
    let shifted = builder.build_batch(&records[..1], 1)?;
    assert_ne!(
        shifted.boxes().slice(ndarray::s![0, 0, ..]),
        lhs.boxes().slice(ndarray::s![0, 0, ..])
    );
    Ok(())
}

#[test]
fn serialize_batch() -> Result<()> {
    let builder = load_builder("small-anchors.json5")?;
    let batch = builder.build_batch(&[record(&[[0.5, 0.5, 0.05, 0.07]])], 0)?;
    let value = serde_json::to_value(&batch)?;
    assert_eq!(value["num_valid"], serde_json::json!([1]));
    assert_eq!(value["first_index"], serde_json::json!(0));
    Ok(())
}
