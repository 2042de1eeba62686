//! KITTI object labels.
//!
//! Every line holds 15 space-separated columns:
//!
//! ```text
//! type truncated occluded alpha x1 y1 x2 y2 h w l x y z rotation_y
//! ```

use crate::{
    annotation::{BoxAnnotation, UNKNOWN_CATEGORY},
    config::{BoxOrigin, ConversionConfig},
    error::GeometryError,
    transform::wrap_angle,
};
use std::fmt::Write as _;

#[derive(Debug, Clone, PartialEq)]
pub struct KittiLabelRecord {
    pub category: String,
    pub truncation: f64,
    pub occlusion: u8,
    pub alpha: f64,
    pub bbox2d: [f64; 4],
    /// `(h, w, l)`
    pub dimensions: [f64; 3],
    pub location: [f64; 3],
    pub rotation_y: f64,
}

impl KittiLabelRecord {
    /// Formats the record as one label line without the line terminator.
    pub fn to_line(&self, precision: usize) -> String {
        let Self {
            ref category,
            truncation,
            occlusion,
            alpha,
            bbox2d,
            dimensions,
            location,
            rotation_y,
        } = *self;

        let mut line = format!(
            "{} {} {} {}",
            category,
            fixed(truncation, precision),
            occlusion,
            fixed(alpha, precision)
        );
        bbox2d
            .into_iter()
            .chain(dimensions)
            .chain(location)
            .chain([rotation_y])
            .for_each(|val| {
                let _ = write!(line, " {}", fixed(val, precision));
            });
        line
    }
}

/// Fixed-point text of a value. Values that round to zero are written
/// without a sign.
fn fixed(value: f64, precision: usize) -> String {
    let text = format!("{value:.precision$}");
    match text.strip_prefix('-') {
        Some(rest) if rest.bytes().all(|b| b == b'0' || b == b'.') => rest.to_string(),
        _ => text,
    }
}

/// A category name safe to use as the first label column.
pub fn sanitize_category(category: &str) -> String {
    let name: String = category
        .trim()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect();

    if name.is_empty() {
        UNKNOWN_CATEGORY.to_string()
    } else {
        name
    }
}

/// Checks the invariants a box must satisfy before conversion.
pub fn validate_box(annotation: &BoxAnnotation) -> Result<(), GeometryError> {
    let dims = &annotation.dimensions;
    for (axis, value) in [
        ("length", dims.length),
        ("width", dims.width),
        ("height", dims.height),
    ] {
        if !(value.is_finite() && value > 0.0) {
            return Err(GeometryError::InvalidDimension { axis, value });
        }
    }

    if !annotation.yaw.is_finite() {
        return Err(GeometryError::NonFiniteYaw(annotation.yaw));
    }
    if annotation.center.iter().any(|val| !val.is_finite()) {
        return Err(GeometryError::NonFiniteCenter(annotation.center));
    }

    Ok(())
}

/// A box that failed validation, with its position in the input.
#[derive(Debug, Clone, PartialEq)]
pub struct DroppedBox {
    pub index: usize,
    pub error: GeometryError,
}

/// Converts sensor-frame boxes into KITTI label records.
#[derive(Debug, Clone, Copy)]
pub struct LabelConverter<'a> {
    config: &'a ConversionConfig,
}

impl<'a> LabelConverter<'a> {
    pub fn new(config: &'a ConversionConfig) -> Self {
        Self { config }
    }

    pub fn convert(&self, annotation: &BoxAnnotation) -> Result<KittiLabelRecord, GeometryError> {
        validate_box(annotation)?;

        let ConversionConfig {
            ref transform,
            box_origin,
            ref defaults,
            ..
        } = *self.config;
        let dims = annotation.dimensions;

        let [cx, cy, cz] = annotation.center;
        let origin = match box_origin {
            BoxOrigin::Center => [cx, cy, cz],
            BoxOrigin::Bottom => [cx, cy, cz - dims.height / 2.0],
        };
        let location = transform.apply(origin);

        let rotation_y = transform.rotation_y(annotation.yaw);
        let alpha = wrap_angle(rotation_y - location[0].atan2(location[2]));

        Ok(KittiLabelRecord {
            category: sanitize_category(self.config.map_category(&annotation.category)),
            truncation: defaults.truncation,
            occlusion: defaults.occlusion,
            alpha,
            bbox2d: defaults.bbox2d,
            dimensions: dims.to_hwl(),
            location,
            rotation_y,
        })
    }

    /// Converts every valid box, keeping input order. Invalid boxes are
    /// returned separately instead of failing the batch.
    pub fn convert_all(
        &self,
        annotations: &[BoxAnnotation],
    ) -> (Vec<KittiLabelRecord>, Vec<DroppedBox>) {
        let mut records = Vec::with_capacity(annotations.len());
        let mut dropped = vec![];

        for (index, annotation) in annotations.iter().enumerate() {
            match self.convert(annotation) {
                Ok(record) => records.push(record),
                Err(error) => {
                    log::debug!("drop box {index}: {error}");
                    dropped.push(DroppedBox { index, error });
                }
            }
        }

        (records, dropped)
    }
}

/// Label file body: one terminated line per record, empty for no records.
pub fn serialize_labels(records: &[KittiLabelRecord], precision: usize) -> String {
    records.iter().fold(String::new(), |mut text, record| {
        text.push_str(&record.to_line(precision));
        text.push('\n');
        text
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{annotation::BoxDimensions, transform::FrameTransform};
    use approx::assert_abs_diff_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn annotation(center: [f64; 3], lwh: [f64; 3], yaw: f64) -> BoxAnnotation {
        let [length, width, height] = lwh;
        BoxAnnotation {
            category: "trunk".to_string(),
            center,
            dimensions: BoxDimensions::new(length, width, height),
            yaw,
        }
    }

    #[test]
    fn dimensions_are_hwl_regardless_of_pose() -> Result<(), GeometryError> {
        let config = ConversionConfig::with_transform(FrameTransform::kitti_camera());
        let converter = LabelConverter::new(&config);

        for (center, yaw) in [([0.0, 0.0, 0.0], 0.0), ([5.0, -3.0, 1.0], 2.5)] {
            let record = converter.convert(&annotation(center, [2.0, 1.0, 0.5], yaw))?;
            assert_eq!(record.dimensions, [0.5, 1.0, 2.0]);
        }
        Ok(())
    }

    #[test]
    fn kitti_camera_location_and_angles() -> Result<(), GeometryError> {
        let config = ConversionConfig::with_transform(FrameTransform::kitti_camera());
        let converter = LabelConverter::new(&config);

        // Straight ahead of the sensor, heading along the sensor x axis.
        let record = converter.convert(&annotation([10.0, 0.0, -1.0], [4.0, 2.0, 1.5], 0.0))?;
        let [x, y, z] = record.location;
        assert_abs_diff_eq!(x, 0.0);
        assert_abs_diff_eq!(y, 1.0);
        assert_abs_diff_eq!(z, 10.0);
        assert_abs_diff_eq!(record.rotation_y, -FRAC_PI_2, epsilon = 1e-12);
        assert_abs_diff_eq!(record.alpha, -FRAC_PI_2, epsilon = 1e-12);

        // To the left of the sensor, seen at 45 degrees.
        let record = converter.convert(&annotation([5.0, 5.0, 0.0], [4.0, 2.0, 1.5], 0.0))?;
        assert_abs_diff_eq!(record.location[0], -5.0);
        assert_abs_diff_eq!(record.alpha, -FRAC_PI_2 + PI / 4.0, epsilon = 1e-12);
        Ok(())
    }

    #[test]
    fn bottom_origin_lowers_location() -> Result<(), GeometryError> {
        let config = ConversionConfig {
            box_origin: BoxOrigin::Bottom,
            ..ConversionConfig::with_transform(FrameTransform::kitti_camera())
        };
        let record = LabelConverter::new(&config)
            .convert(&annotation([10.0, 0.0, 0.0], [4.0, 2.0, 1.5], 0.0))?;

        // Camera y points down, so the floor is at +h/2.
        assert_abs_diff_eq!(record.location[1], 0.75);
        Ok(())
    }

    #[test]
    fn angles_stay_in_range() -> Result<(), GeometryError> {
        for transform in [FrameTransform::identity(), FrameTransform::kitti_camera()] {
            let config = ConversionConfig::with_transform(transform);
            let converter = LabelConverter::new(&config);

            let mut yaw = -4.0 * PI;
            while yaw <= 4.0 * PI {
                let record =
                    converter.convert(&annotation([-3.0, -7.0, 0.2], [1.0, 1.0, 1.0], yaw))?;
                for angle in [record.rotation_y, record.alpha] {
                    assert!(angle > -PI && angle <= PI, "yaw {yaw} -> {angle}");
                }
                yaw += 0.05;
            }
        }
        Ok(())
    }

    #[test]
    fn invalid_geometry_is_rejected() {
        let cases = [
            annotation([0.0; 3], [1.0, 1.0, -1.0], 0.0),
            annotation([0.0; 3], [0.0, 1.0, 1.0], 0.0),
            annotation([0.0; 3], [1.0, f64::INFINITY, 1.0], 0.0),
            annotation([0.0; 3], [1.0, 1.0, 1.0], f64::NAN),
            annotation([0.0, f64::NAN, 0.0], [1.0, 1.0, 1.0], 0.0),
        ];

        for case in &cases {
            assert!(validate_box(case).is_err(), "{case:?}");
        }
        assert_eq!(
            validate_box(&cases[0]),
            Err(GeometryError::InvalidDimension {
                axis: "height",
                value: -1.0
            })
        );
    }

    #[test]
    fn invalid_box_is_dropped_and_order_kept() {
        let config = ConversionConfig::default();
        let mut boxes = vec![
            annotation([1.0, 0.0, 0.0], [1.0, 1.0, 1.0], 0.0),
            annotation([2.0, 0.0, 0.0], [1.0, 1.0, -1.0], 0.0),
            annotation([3.0, 0.0, 0.0], [1.0, 1.0, 1.0], 0.0),
        ];
        boxes[2].category = "person".to_string();

        let (records, dropped) = LabelConverter::new(&config).convert_all(&boxes);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].location[0], 1.0);
        assert_eq!(records[1].location[0], 3.0);
        assert_eq!(records[1].category, "person");
        assert_eq!(dropped.len(), 1);
        assert_eq!(dropped[0].index, 1);
    }

    #[test]
    fn line_has_fixed_column_order() -> Result<(), GeometryError> {
        let config = ConversionConfig::default();
        let record = LabelConverter::new(&config)
            .convert(&annotation([4.0, -1.0, 0.5], [2.0, 1.0, 0.5], 1.25))?;

        let line = record.to_line(2);
        let cols: Vec<_> = line.split(' ').collect();
        assert_eq!(cols.len(), 15);
        assert_eq!(cols[..8], ["trunk", "0.00", "0", cols[3], "0.00", "0.00", "0.00", "0.00"]);
        assert_eq!(cols[8..11], ["0.50", "1.00", "2.00"]);
        assert_eq!(cols[11..14], ["4.00", "-1.00", "0.50"]);
        assert_eq!(cols[14], "1.25");

        // alpha = 1.25 - atan2(4.0, 0.5)
        let alpha = wrap_angle(1.25 - 4.0f64.atan2(0.5));
        assert_eq!(cols[3], format!("{alpha:.2}"));
        Ok(())
    }

    #[test]
    fn precision_is_configurable() -> Result<(), GeometryError> {
        let config = ConversionConfig::default();
        let record = LabelConverter::new(&config)
            .convert(&annotation([1.0 / 3.0, 0.0, 0.0], [1.0, 1.0, 1.0], 0.0))?;

        let line = record.to_line(4);
        assert_eq!(line.split(' ').nth(11), Some("0.3333"));
        Ok(())
    }

    #[test]
    fn negative_zero_is_unsigned() {
        assert_eq!(fixed(-0.001, 2), "0.00");
        assert_eq!(fixed(-0.0, 2), "0.00");
        assert_eq!(fixed(-0.005001, 2), "-0.01");
    }

    #[test]
    fn category_whitespace_is_replaced() {
        assert_eq!(sanitize_category("apple tree"), "apple_tree");
        assert_eq!(sanitize_category("  "), UNKNOWN_CATEGORY);
        assert_eq!(sanitize_category("손수레"), "손수레");
    }

    #[test]
    fn category_map_is_applied() -> Result<(), GeometryError> {
        let mut config = ConversionConfig::default();
        config
            .category_map
            .insert("trunk".to_string(), "Tree Trunk".to_string());

        let record = LabelConverter::new(&config)
            .convert(&annotation([1.0, 0.0, 0.0], [1.0, 1.0, 1.0], 0.0))?;
        assert_eq!(record.category, "Tree_Trunk");
        Ok(())
    }

    #[test]
    fn no_records_serialize_to_empty_text() {
        assert_eq!(serialize_labels(&[], 2), "");
    }

    #[test]
    fn every_line_is_terminated() {
        let record = KittiLabelRecord {
            category: "person".to_string(),
            truncation: 0.0,
            occlusion: 0,
            alpha: 0.0,
            bbox2d: [0.0; 4],
            dimensions: [1.7, 0.6, 0.6],
            location: [0.0, 0.0, 5.0],
            rotation_y: 0.0,
        };
        let text = serialize_labels(&[record.clone(), record], 2);
        assert_eq!(
            text,
            "person 0.00 0 0.00 0.00 0.00 0.00 0.00 1.70 0.60 0.60 0.00 0.00 5.00 0.00\n"
                .repeat(2)
        );
    }
}
