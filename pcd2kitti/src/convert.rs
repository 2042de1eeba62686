use crate::{
    io::{load_annotations, load_capture, write_index, OutputDirs},
    opts::Convert,
    types::{FrameError, FrameReport, FrameStatus},
    utils::{pair_frames, FramePair},
};
use console::style;
use eyre::{ensure, Result, WrapErr};
use kitti_format::{convert_frame, ConversionConfig, FrameOutput};
use rayon::prelude::*;
use std::{path::Path, time::Instant};

pub fn convert(args: Convert) -> Result<()> {
    let config = build_config(&args)?;

    ensure!(
        args.pcd_dir.is_dir(),
        "'{}' is not a directory",
        args.pcd_dir.display()
    );
    ensure!(
        args.label_dir.is_dir(),
        "'{}' is not a directory",
        args.label_dir.display()
    );

    log::info!("pcd dir: {}", args.pcd_dir.display());
    log::info!("label dir: {}", args.label_dir.display());
    log::info!("output dir: {}", args.out_dir.display());
    log::debug!("conversion config: {config:?}");

    let pairs = pair_frames(&args.pcd_dir, &args.label_dir, args.index_names)?;
    log::info!("found {} pcd files", pairs.len());

    let dirs = OutputDirs::create(&args.out_dir)?;
    if args.index_names {
        write_index(
            args.out_dir.join("index.txt"),
            pairs
                .iter()
                .map(|pair| (pair.frame_id.as_str(), pair.base_name.as_str())),
        )?;
    }

    let start = Instant::now();
    let reports = run_batch(
        &pairs,
        &dirs,
        &config,
        args.allow_missing_labels,
        args.jobs.unwrap_or(0),
    )?;
    log::info!("converted {} frames in {:?}", reports.len(), start.elapsed());

    let summary = Summary::new(&reports);
    summary.print();

    ensure!(
        summary.failed.is_empty(),
        "{} of {} frames failed",
        summary.failed.len(),
        summary.total
    );
    Ok(())
}

/// Preset or config file, then command line overrides.
fn build_config(args: &Convert) -> Result<ConversionConfig> {
    let mut config = match &args.config {
        Some(path) => ConversionConfig::load(path)
            .wrap_err_with(|| format!("unable to load config '{}'", path.display()))?,
        None => ConversionConfig::with_transform(args.preset.transform()),
    };

    if let Some(precision) = args.precision {
        config.precision = precision;
    }
    if let Some(scale) = args.intensity_scale {
        config.intensity_scale = scale;
    }
    if let Some(origin) = args.box_origin {
        config.box_origin = origin.into();
    }

    config.validate()?;
    Ok(config)
}

/// Converts every pair on a pool of `jobs` threads (0 picks the CPU count).
/// Reports come back in the order of `pairs`.
pub fn run_batch(
    pairs: &[FramePair],
    dirs: &OutputDirs,
    config: &ConversionConfig,
    allow_missing_labels: bool,
    jobs: usize,
) -> Result<Vec<FrameReport>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .wrap_err("unable to start worker pool")?;

    let reports: Vec<_> = pool.install(|| {
        pairs
            .par_iter()
            .map(|pair| {
                let status = match convert_pair(pair, dirs, config, allow_missing_labels) {
                    Ok(output) if output.is_partial() => FrameStatus::Partial {
                        dropped: output.dropped.len(),
                    },
                    Ok(_) => FrameStatus::Converted,
                    Err(err) => {
                        log::error!("frame {}: {err}", pair.frame_id);
                        // A duplicate must not touch the files of the frame it collides with.
                        if !matches!(err, FrameError::DuplicateId { .. }) {
                            if let Err(remove_err) = dirs.remove_frame(&pair.frame_id) {
                                log::warn!(
                                    "frame {}: unable to remove stale outputs: {remove_err}",
                                    pair.frame_id
                                );
                            }
                        }
                        FrameStatus::Failed(err)
                    }
                };

                FrameReport {
                    frame_id: pair.frame_id.clone(),
                    source: pair.pcd_path.clone(),
                    status,
                }
            })
            .collect()
    });

    Ok(reports)
}

/// Decodes both inputs of a frame before writing anything, so a decode
/// failure on either side leaves no output at all.
/// Outputs of an earlier run under the same name are removed by the caller.
fn convert_pair(
    pair: &FramePair,
    dirs: &OutputDirs,
    config: &ConversionConfig,
    allow_missing_labels: bool,
) -> Result<FrameOutput, FrameError> {
    let FramePair {
        ref frame_id,
        ref pcd_path,
        ref label_path,
        ref duplicate_of,
        ..
    } = *pair;

    if let Some(first) = duplicate_of {
        return Err(FrameError::DuplicateId {
            first: first.clone(),
        });
    }

    let frame = load_capture(pcd_path, config.intensity_scale).map_err(|source| {
        FrameError::Decode {
            path: pcd_path.clone(),
            source,
        }
    })?;

    let boxes = match label_path {
        Some(path) => load_annotations(path).map_err(|source| FrameError::Decode {
            path: path.clone(),
            source,
        })?,
        None if allow_missing_labels => {
            log::warn!("frame {frame_id}: no annotation file, writing an empty label");
            vec![]
        }
        None => return Err(FrameError::Unpaired),
    };

    let output = convert_frame(&frame, &boxes, config);
    for dropped in &output.dropped {
        log::warn!(
            "frame {frame_id}: dropped box {}: {}",
            dropped.index,
            dropped.error
        );
    }

    dirs.write_frame(frame_id, &output)?;
    log::debug!(
        "frame {frame_id}: {} points, {} labels",
        output.num_points,
        output.num_labels
    );

    Ok(output)
}

/// Outcome counts of a batch.
#[derive(Debug)]
pub struct Summary<'a> {
    pub total: usize,
    pub converted: usize,
    pub partial: Vec<(&'a str, usize)>,
    pub failed: Vec<(&'a str, &'a Path, &'a FrameError)>,
}

impl<'a> Summary<'a> {
    pub fn new(reports: &'a [FrameReport]) -> Self {
        let mut summary = Self {
            total: reports.len(),
            converted: 0,
            partial: vec![],
            failed: vec![],
        };

        for report in reports {
            let frame_id = report.frame_id.as_str();
            match &report.status {
                FrameStatus::Converted => summary.converted += 1,
                FrameStatus::Partial { dropped } => summary.partial.push((frame_id, *dropped)),
                FrameStatus::Failed(err) => {
                    summary.failed.push((frame_id, report.source.as_path(), err))
                }
            }
        }

        summary
    }

    pub fn print(&self) {
        println!(
            "{} converted, {} partial, {} failed (of {})",
            style(self.converted).green(),
            style(self.partial.len()).yellow(),
            style(self.failed.len()).red(),
            self.total
        );

        for (frame_id, dropped) in &self.partial {
            println!("  {} {frame_id}: {dropped} boxes dropped", style("partial").yellow());
        }
        for (frame_id, source, err) in &self.failed {
            println!(
                "  {} {frame_id} ({}): {err}",
                style("failed").red(),
                source.display()
            );
        }
    }
}
