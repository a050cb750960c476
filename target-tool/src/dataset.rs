//! CSV label files.

use anchor_target::RawRecord;
use anyhow::{ensure, Context, Result};
use indexmap::{IndexMap, IndexSet};
use itertools::Itertools as _;
use log::warn;
use noisy_float::prelude::*;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// A row of the label file. Coordinates are normalized to the image size.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct CsvSample {
    pub image_file: PathBuf,
    pub class_name: String,
    pub cx: R64,
    pub cy: R64,
    pub w: R64,
    pub h: R64,
}

/// The labeled images of a label file, in order of first appearance.
#[derive(Debug, Clone)]
pub struct LabelSet {
    pub classes: IndexSet<String>,
    pub image_files: Vec<PathBuf>,
    pub records: Vec<RawRecord>,
}

impl LabelSet {
    pub fn load(label_file: impl AsRef<Path>, classes_file: impl AsRef<Path>) -> Result<Self> {
        let classes = load_classes_file(classes_file)?;
        let samples = load_label_file(label_file)?;

        let groups: IndexMap<PathBuf, Vec<CsvSample>> = samples
            .into_iter()
            .map(|sample| (sample.image_file.clone(), sample))
            .fold(IndexMap::new(), |mut groups, (image_file, sample)| {
                groups.entry(image_file).or_insert_with(Vec::new).push(sample);
                groups
            });

        let (image_files, records): (Vec<_>, Vec<_>) = groups
            .into_iter()
            .map(|(image_file, samples)| {
                let (boxes, class_ids): (Vec<_>, Vec<_>) = samples
                    .into_iter()
                    .filter_map(|sample| {
                        let class_index = match classes.get_index_of(&sample.class_name) {
                            Some(index) => index,
                            None => {
                                warn!(
                                    "ignore unknown class '{}' in labels of '{}'",
                                    sample.class_name,
                                    image_file.display()
                                );
                                return None;
                            }
                        };
                        let CsvSample { cx, cy, w, h, .. } = sample;
                        let bbox = vec![cx.raw(), cy.raw(), w.raw(), h.raw()];
                        Some((bbox, class_index as i64))
                    })
                    .unzip();
                (image_file, RawRecord::new(boxes, class_ids))
            })
            .unzip();

        Ok(Self {
            classes,
            image_files,
            records,
        })
    }
}

pub fn load_classes_file(path: impl AsRef<Path>) -> Result<IndexSet<String>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("unable to read classes file '{}'", path.display()))?;
    let lines: Vec<_> = content.lines().collect();
    let classes: IndexSet<_> = lines.iter().cloned().map(ToOwned::to_owned).collect();
    ensure!(
        lines.len() == classes.len(),
        "duplicated class names found in '{}'",
        path.display()
    );
    ensure!(!classes.is_empty(), "no classes found in '{}'", path.display());
    Ok(classes)
}

pub fn load_label_file(path: impl AsRef<Path>) -> Result<Vec<CsvSample>> {
    let path = path.as_ref();
    let samples: Vec<CsvSample> = csv::ReaderBuilder::new()
        .has_headers(true)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("unable to open label file '{}'", path.display()))?
        .deserialize()
        .try_collect()
        .with_context(|| format!("invalid label file '{}'", path.display()))?;
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lazy_static::lazy_static;

    lazy_static! {
        static ref DATA_DIR: PathBuf = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("data");
    }

    #[test]
    fn group_labels_by_image() {
        let labels =
            LabelSet::load(DATA_DIR.join("labels.csv"), DATA_DIR.join("classes.txt")).unwrap();

        assert_eq!(labels.classes.len(), 3);
        assert_eq!(
            labels.image_files,
            vec![
                PathBuf::from("street.jpg"),
                PathBuf::from("park.jpg"),
                PathBuf::from("empty-road.jpg"),
            ]
        );

        let street = &labels.records[0];
        assert_eq!(street.classes, vec![0, 2, 0]);
        assert_eq!(street.boxes[1], vec![0.25, 0.5, 0.1, 0.2]);

        let park = &labels.records[1];
        assert_eq!(park.classes, vec![1]);

        // the only label has an unknown class
        assert!(labels.records[2].is_empty());
    }

    #[test]
    fn reject_duplicated_classes() {
        assert!(load_classes_file(DATA_DIR.join("duplicated-classes.txt")).is_err());
    }
}
