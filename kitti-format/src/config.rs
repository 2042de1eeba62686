use crate::{error::ConfigError, transform::FrameTransform};
use serde::Deserialize;
use std::{collections::BTreeMap, fs::File, io::BufReader, path::Path};

/// Decimal places used for every floating-point label column.
pub const DEFAULT_PRECISION: usize = 2;

/// Values written for label columns this pipeline cannot measure.
///
/// Without camera images there is no truncation, occlusion or 2D box, so
/// these are constants rather than derived quantities.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LabelDefaults {
    pub truncation: f64,
    pub occlusion: u8,
    /// `[left, top, right, bottom]` in pixels.
    pub bbox2d: [f64; 4],
}

impl LabelDefaults {
    pub const UNAVAILABLE: Self = Self {
        truncation: 0.0,
        occlusion: 0,
        bbox2d: [0.0; 4],
    };
}

impl Default for LabelDefaults {
    fn default() -> Self {
        Self::UNAVAILABLE
    }
}

/// Reference point of the box written as the label location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoxOrigin {
    /// Geometric center of the box.
    #[default]
    Center,
    /// Center of the box floor, assuming the sensor z axis points up.
    Bottom,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    pub transform: FrameTransform,
    pub box_origin: BoxOrigin,
    pub defaults: LabelDefaults,
    pub precision: usize,
    pub intensity_scale: f32,
    /// Renames applied to resolved category names.
    pub category_map: BTreeMap<String, String>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            transform: FrameTransform::identity(),
            box_origin: BoxOrigin::Center,
            defaults: LabelDefaults::UNAVAILABLE,
            precision: DEFAULT_PRECISION,
            intensity_scale: 1.0,
            category_map: BTreeMap::new(),
        }
    }
}

impl ConversionConfig {
    pub fn with_transform(transform: FrameTransform) -> Self {
        Self {
            transform,
            ..Self::default()
        }
    }

    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_slice(bytes)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P>(path: P) -> Result<Self, ConfigError>
    where
        P: AsRef<Path>,
    {
        let reader = BufReader::new(File::open(path)?);
        let config: Self = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.transform.validate()?;

        if !self.intensity_scale.is_finite() {
            return Err(ConfigError::NonFinite("intensity_scale"));
        }
        if !self.defaults.truncation.is_finite()
            || self.defaults.bbox2d.iter().any(|val| !val.is_finite())
        {
            return Err(ConfigError::NonFinite("defaults"));
        }

        Ok(())
    }

    /// Category name after applying `category_map`.
    pub fn map_category<'a>(&'a self, category: &'a str) -> &'a str {
        self.category_map
            .get(category)
            .map_or(category, String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_is_the_default() -> Result<(), ConfigError> {
        let config = ConversionConfig::from_json_slice(b"{}")?;
        assert_eq!(config, ConversionConfig::default());
        assert_eq!(config.defaults, LabelDefaults::UNAVAILABLE);
        Ok(())
    }

    #[test]
    fn partial_json_overrides_fields() -> Result<(), ConfigError> {
        let json = r#"{
            "transform": {
                "rotation": [[0, -1, 0], [0, 0, -1], [1, 0, 0]],
                "translation": [0.0, 0.08, -0.27],
                "yaw_offset": -1.5707963267948966,
                "invert_yaw": true
            },
            "box_origin": "bottom",
            "precision": 4,
            "category_map": { "사람": "Pedestrian" }
        }"#;

        let config = ConversionConfig::from_json_slice(json.as_bytes())?;
        assert_eq!(config.box_origin, BoxOrigin::Bottom);
        assert_eq!(config.precision, 4);
        assert_eq!(config.transform.translation, [0.0, 0.08, -0.27]);
        assert!(config.transform.invert_yaw);
        assert_eq!(config.intensity_scale, 1.0);
        assert_eq!(config.map_category("사람"), "Pedestrian");
        assert_eq!(config.map_category("tree"), "tree");
        Ok(())
    }

    #[test]
    fn improper_rotation_is_rejected() {
        let json = r#"{
            "transform": {
                "rotation": [[2, 0, 0], [0, 1, 0], [0, 0, 1]],
                "translation": [0, 0, 0]
            }
        }"#;

        let err = ConversionConfig::from_json_slice(json.as_bytes()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRotation { .. }));
    }
}
