mod dataset;

use anchor_target::{match_anchors, BatchTargets, RawRecord, TargetConfig, NONE_INDEX};
use anyhow::{Context, Result};
use dataset::LabelSet;
use indexmap::IndexSet;
use log::info;
use prettytable::{cell, row, Table};
use serde::Serialize;
use std::{
    fs::File,
    io::BufWriter,
    num::NonZeroUsize,
    path::{Path, PathBuf},
};
use structopt::StructOpt;

#[derive(Debug, Clone, StructOpt)]
/// Build anchor-matched training targets from box annotations.
enum Args {
    /// Show the anchor catalog of a configuration.
    Info {
        #[structopt(long)]
        /// configuration file
        config: PathBuf,
    },
    /// Build the targets of a CSV label file.
    Build {
        #[structopt(long)]
        /// configuration file
        config: PathBuf,
        #[structopt(long)]
        /// CSV label file with image_file, class_name, cx, cy, w, h columns
        labels: PathBuf,
        #[structopt(long)]
        /// classes file with one class name per line
        classes: PathBuf,
        #[structopt(long)]
        /// output JSON file
        output: PathBuf,
        #[structopt(long, default_value = "16")]
        /// number of images per batch
        batch_size: NonZeroUsize,
    },
    /// Show the overlaps and the assignment of a single box.
    Match {
        #[structopt(long)]
        /// configuration file
        config: PathBuf,
        cx: f64,
        cy: f64,
        w: f64,
        h: f64,
    },
}

/// The output file of the build command.
#[derive(Debug, Serialize)]
struct TargetFile {
    classes: IndexSet<String>,
    image_files: Vec<PathBuf>,
    batches: Vec<BatchTargets>,
}

fn main() -> Result<()> {
    pretty_env_logger::init();

    match Args::from_args() {
        Args::Info { config } => info(config)?,
        Args::Build {
            config,
            labels,
            classes,
            output,
            batch_size,
        } => build(config, labels, classes, output, batch_size.get())?,
        Args::Match {
            config,
            cx,
            cy,
            w,
            h,
        } => match_box(config, [cx, cy, w, h])?,
    }

    Ok(())
}

fn load_config(path: &Path) -> Result<TargetConfig> {
    TargetConfig::open(path)
        .with_context(|| format!("unable to load config file '{}'", path.display()))
}

fn info(config_file: impl AsRef<Path>) -> Result<()> {
    let config = load_config(config_file.as_ref())?;
    let catalog = config.anchors.catalog()?;

    let mut table = Table::new();
    table.add_row(row!["index", "level", "anchor", "w", "h", "norm. w", "norm. h"]);

    for (index, (anchor, normalized)) in catalog
        .anchors()
        .iter()
        .zip(catalog.normalized())
        .enumerate()
    {
        let (level, anchor_index) = match catalog.locate(index) {
            Some(location) => (location.level.to_string(), location.anchor.to_string()),
            None => ("-".to_string(), "-".to_string()),
        };
        table.add_row(row![
            index,
            level,
            anchor_index,
            anchor.w(),
            anchor.h(),
            format!("{:.4}", normalized.w()),
            format!("{:.4}", normalized.h())
        ]);
    }
    table.printstd();

    let reference = catalog.reference();
    println!(
        "reference resolution: {}x{}, acceptance threshold: {}, max instances: {}",
        reference.w(),
        reference.h(),
        config.acceptance_threshold,
        config.max_num_instances
    );

    Ok(())
}

fn build(
    config_file: impl AsRef<Path>,
    label_file: impl AsRef<Path>,
    classes_file: impl AsRef<Path>,
    output_file: impl AsRef<Path>,
    batch_size: usize,
) -> Result<()> {
    let output_file = output_file.as_ref();
    let builder = load_config(config_file.as_ref())?.build()?;

    let LabelSet {
        classes,
        image_files,
        records,
    } = LabelSet::load(label_file, classes_file)?;
    info!(
        "loaded labels of {} images with {} classes",
        records.len(),
        classes.len()
    );

    let batches: Vec<_> = records
        .chunks(batch_size)
        .enumerate()
        .map(|(batch_index, chunk)| {
            let first_index = batch_index * batch_size;
            builder
                .build_batch(chunk, first_index)
                .with_context(|| format!("unable to build targets of batch {}", batch_index))
        })
        .collect::<Result<_>>()?;

    let num_dropped: usize = batches
        .iter()
        .flat_map(|batch| batch.num_dropped())
        .sum();
    info!(
        "built {} batches, {} instances dropped",
        batches.len(),
        num_dropped
    );

    let target_file = TargetFile {
        classes,
        image_files,
        batches,
    };
    let writer = BufWriter::new(
        File::create(output_file)
            .with_context(|| format!("unable to create '{}'", output_file.display()))?,
    );
    serde_json::to_writer(writer, &target_file)?;

    Ok(())
}

fn match_box(config_file: impl AsRef<Path>, cxcywh: [f64; 4]) -> Result<()> {
    let config = load_config(config_file.as_ref())?;
    let builder = config.build()?;
    let catalog = builder.catalog();

    let record = RawRecord::new(vec![cxcywh.to_vec()], vec![0]);
    let labels = record.to_labels()?;
    let boxes: Vec<_> = labels.boxes().copied().collect();
    let overlap = catalog.overlap(&boxes);
    let matching = match_anchors(&overlap, builder.threshold(), builder.overflow_policy())?;
    let assignment = &matching.assignments[0];

    let mut table = Table::new();
    table.add_row(row!["index", "w", "h", "IoU", "accepted", "slot"]);
    for (index, anchor) in catalog.anchors().iter().enumerate() {
        let iou = overlap.row(0)[index];
        let accepted = if iou > builder.threshold() { "yes" } else { "" };
        let slot = assignment
            .slots()
            .iter()
            .position(|&slot| slot == index as i64)
            .map(|slot| slot.to_string())
            .unwrap_or_default();
        table.add_row(row![
            index,
            anchor.w(),
            anchor.h(),
            format!("{:.4}", iou),
            accepted,
            slot
        ]);
    }
    table.printstd();

    let slots: Vec<_> = assignment
        .slots()
        .iter()
        .map(|&slot| match slot {
            NONE_INDEX => "-".to_string(),
            index => index.to_string(),
        })
        .collect();
    println!("assignment: [{}]", slots.join(", "));

    Ok(())
}
