use clap::ValueEnum;
use kitti_format::{BoxOrigin, DecodeError, FrameTransform};
use std::{io, path::PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum FileFormat {
    #[value(name = "pcd")]
    Pcd,
    #[value(name = "kitti.bin")]
    KittiBin,
}

/// Built-in sensor-to-label transforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Preset {
    /// Keep sensor-frame coordinates and headings.
    Identity,
    /// Lidar axes to KITTI camera axes.
    KittiCamera,
}

impl Preset {
    pub fn transform(self) -> FrameTransform {
        match self {
            Preset::Identity => FrameTransform::identity(),
            Preset::KittiCamera => FrameTransform::kitti_camera(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum OriginArg {
    Center,
    Bottom,
}

impl From<OriginArg> for BoxOrigin {
    fn from(arg: OriginArg) -> Self {
        match arg {
            OriginArg::Center => BoxOrigin::Center,
            OriginArg::Bottom => BoxOrigin::Bottom,
        }
    }
}

/// Why a frame produced no output.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("failed to decode '{}': {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: DecodeError,
    },

    #[error("failed to write outputs: {0}")]
    Io(#[from] io::Error),

    #[error("no annotation file found")]
    Unpaired,

    #[error("output name already taken by '{}'", first.display())]
    DuplicateId { first: PathBuf },
}

#[derive(Debug)]
pub enum FrameStatus {
    Converted,
    /// Written with some boxes dropped.
    Partial {
        dropped: usize,
    },
    Failed(FrameError),
}

#[derive(Debug)]
pub struct FrameReport {
    pub frame_id: String,
    pub source: PathBuf,
    pub status: FrameStatus,
}

impl FrameReport {
    pub fn is_failed(&self) -> bool {
        matches!(self.status, FrameStatus::Failed(_))
    }
}
