//! Conversion of lidar captures and 3D cuboid annotations into the KITTI
//! object-detection layout used by PointPillars-style loaders.
//!
//! [convert_frame] is the entry point. It takes a decoded frame and its
//! boxes and returns the `.bin` and `.txt` contents without touching the
//! filesystem.

pub mod annotation;
pub mod config;
pub mod error;
pub mod frame;
pub mod label;
pub mod point;
pub mod transform;

pub use annotation::{parse_annotations, AnnotationRecord, BoxAnnotation, BoxDimensions};
pub use config::{BoxOrigin, ConversionConfig, LabelDefaults};
pub use error::{ConfigError, DecodeError, GeometryError};
pub use frame::{convert_frame, FrameOutput};
pub use label::{DroppedBox, KittiLabelRecord, LabelConverter};
pub use point::{decode_bin, decode_bin_iter, PointCloudFrame, PointSample};
pub use transform::{wrap_angle, FrameTransform};
