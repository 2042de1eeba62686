use clap::Parser;
use std::path::PathBuf;

use crate::types::{FileFormat, OriginArg, Preset};

/// Convert orchard PCD captures and cuboid annotations into the KITTI
/// layout read by PointPillars.
#[derive(Debug, Clone, Parser)]
#[command(name = "pcd2kitti", version)]
pub enum Opts {
    Info(Info),
    Convert(Convert),
    Dump(Dump),
}

/// Show the field schema of a capture and whether it can be converted.
#[derive(Debug, Clone, Parser)]
pub struct Info {
    pub file: PathBuf,
}

/// Print the points of a capture or a KITTI `.bin` file.
#[derive(Debug, Clone, Parser)]
pub struct Dump {
    #[clap(short, long)]
    pub format: Option<FileFormat>,

    pub input: PathBuf,
}

/// Batch conversion into `<out-dir>/lidar` and `<out-dir>/label`.
#[derive(Debug, Clone, Parser)]
pub struct Convert {
    /// Directory of `.pcd` captures.
    #[clap(long)]
    pub pcd_dir: PathBuf,

    /// Directory of `.json` annotation files.
    #[clap(long)]
    pub label_dir: PathBuf,

    #[clap(short, long)]
    pub out_dir: PathBuf,

    #[clap(long, value_enum, default_value_t = Preset::Identity)]
    pub preset: Preset,

    /// JSON conversion config. Replaces the preset.
    #[clap(short, long)]
    pub config: Option<PathBuf>,

    /// Decimal places of floating-point label columns.
    #[clap(long)]
    pub precision: Option<usize>,

    /// Multiplier applied to the intensity channel.
    #[clap(long)]
    pub intensity_scale: Option<f32>,

    #[clap(long, value_enum)]
    pub box_origin: Option<OriginArg>,

    /// Number of frames converted concurrently. Defaults to the CPU count.
    #[clap(short, long)]
    pub jobs: Option<usize>,

    /// Name outputs 000000, 000001, ... in capture order.
    #[clap(long)]
    pub index_names: bool,

    /// Convert captures without an annotation file as frames with no boxes.
    #[clap(long)]
    pub allow_missing_labels: bool,
}
