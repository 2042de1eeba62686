//! Datumaro-style 3D cuboid annotation records.
//!
//! ```json
//! {
//!   "categories": { "label": { "labels": [{ "name": "person" }] } },
//!   "items": [{ "annotations": [{
//!     "type": "cuboid_3d", "label_id": 0,
//!     "position": [x, y, z], "rotation": [rx, ry, rz], "scale": [l, w, h]
//!   }] }]
//! }
//! ```

use crate::error::DecodeError;
use serde::Deserialize;

/// Category given to boxes whose label id does not resolve.
pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// Annotation type carrying a 3D box.
pub const CUBOID_TYPE: &str = "cuboid_3d";

/// Box extent in the sensor frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxDimensions {
    pub length: f64,
    pub width: f64,
    pub height: f64,
}

impl BoxDimensions {
    pub fn new(length: f64, width: f64, height: f64) -> Self {
        Self {
            length,
            width,
            height,
        }
    }

    /// The extent in label-frame column order `(h, w, l)`.
    pub fn to_hwl(&self) -> [f64; 3] {
        [self.height, self.width, self.length]
    }
}

/// One labeled object, as authored in the sensor frame.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxAnnotation {
    pub category: String,
    pub center: [f64; 3],
    pub dimensions: BoxDimensions,
    /// Heading about the sensor's vertical axis in radians.
    pub yaw: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnnotationRecord {
    #[serde(default)]
    pub categories: Categories,
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Categories {
    #[serde(default)]
    pub label: LabelCategories,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LabelCategories {
    #[serde(default)]
    pub labels: Vec<LabelDef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LabelDef {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Item {
    #[serde(default)]
    pub annotations: Vec<RawAnnotation>,
}

/// An annotation entry before validation. Non-cuboid shapes may omit the
/// 3D fields, so they are optional here and checked in
/// [AnnotationRecord::boxes].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAnnotation {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub label_id: Option<i64>,
    #[serde(default)]
    pub position: Option<[f64; 3]>,
    #[serde(default)]
    pub rotation: Option<[f64; 3]>,
    #[serde(default)]
    pub scale: Option<[f64; 3]>,
}

impl RawAnnotation {
    pub fn is_cuboid(&self) -> bool {
        self.kind.as_deref().map_or(true, |kind| kind == CUBOID_TYPE)
    }
}

impl AnnotationRecord {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, DecodeError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn category_name(&self, label_id: Option<i64>) -> &str {
        label_id
            .and_then(|id| usize::try_from(id).ok())
            .and_then(|id| self.categories.label.labels.get(id))
            .map_or(UNKNOWN_CATEGORY, |label| label.name.as_str())
    }

    /// Cuboids of every item, in file order.
    ///
    /// `scale` is read as `[length, width, height]` and `rotation[2]` as
    /// the yaw. A cuboid missing one of these fields invalidates the whole
    /// record.
    pub fn boxes(&self) -> Result<Vec<BoxAnnotation>, DecodeError> {
        self.items
            .iter()
            .flat_map(|item| &item.annotations)
            .filter(|ann| ann.is_cuboid())
            .enumerate()
            .map(|(index, ann)| -> Result<_, DecodeError> {
                let missing = |field| DecodeError::MissingAnnotationField { index, field };

                let center = ann.position.ok_or_else(|| missing("position"))?;
                let [_, _, yaw] = ann.rotation.ok_or_else(|| missing("rotation"))?;
                let [length, width, height] = ann.scale.ok_or_else(|| missing("scale"))?;

                Ok(BoxAnnotation {
                    category: self.category_name(ann.label_id).to_string(),
                    center,
                    dimensions: BoxDimensions::new(length, width, height),
                    yaw,
                })
            })
            .collect()
    }
}

/// Decodes an annotation file body into its boxes.
pub fn parse_annotations(bytes: &[u8]) -> Result<Vec<BoxAnnotation>, DecodeError> {
    AnnotationRecord::from_slice(bytes)?.boxes()
}
