use crate::{
    annotation::BoxAnnotation,
    config::ConversionConfig,
    label::{serialize_labels, DroppedBox, LabelConverter},
    point::PointCloudFrame,
};

/// The two artifacts of one converted frame, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameOutput {
    /// Contents of `lidar/<frame_id>.bin`.
    pub bin: Vec<u8>,
    /// Contents of `label/<frame_id>.txt`.
    pub labels: String,
    pub num_points: usize,
    pub num_labels: usize,
    pub dropped: Vec<DroppedBox>,
}

impl FrameOutput {
    /// Some boxes were dropped, but the frame is still usable.
    pub fn is_partial(&self) -> bool {
        !self.dropped.is_empty()
    }
}

/// Converts one decoded frame. Performs no I/O.
pub fn convert_frame(
    frame: &PointCloudFrame,
    boxes: &[BoxAnnotation],
    config: &ConversionConfig,
) -> FrameOutput {
    let (records, dropped) = LabelConverter::new(config).convert_all(boxes);

    FrameOutput {
        bin: frame.encode_bin(),
        labels: serialize_labels(&records, config.precision),
        num_points: frame.len(),
        num_labels: records.len(),
        dropped,
    }
}
