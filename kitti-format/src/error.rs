use std::io;

/// A capture, a `.bin` file or an annotation record could not be decoded.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("unable to read input: {0}")]
    Io(#[from] io::Error),

    #[error("malformed PCD data: {0}")]
    Pcd(String),

    #[error("point schema has no '{0}' field")]
    MissingField(&'static str),

    #[error("field '{name}' has no value at point {index}")]
    EmptyField { name: String, index: usize },

    #[error("truncated point record: {0} trailing bytes")]
    TruncatedRecord(usize),

    #[error("malformed annotation record: {0}")]
    Annotation(#[from] serde_json::Error),

    #[error("cuboid annotation {index} has no '{field}'")]
    MissingAnnotationField { index: usize, field: &'static str },
}

/// A single box cannot be expressed as a KITTI label.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    #[error("{axis} must be positive and finite, but get {value}")]
    InvalidDimension { axis: &'static str, value: f64 },

    #[error("yaw must be finite, but get {0}")]
    NonFiniteYaw(f64),

    #[error("center must be finite, but get [{}, {}, {}]", .0[0], .0[1], .0[2])]
    NonFiniteCenter([f64; 3]),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("rotation is not orthonormal with determinant 1 (det = {det})")]
    InvalidRotation { det: f64 },

    #[error("{0} must be finite")]
    NonFinite(&'static str),

    #[error("unable to read configuration: {0}")]
    Io(#[from] io::Error),

    #[error("malformed configuration: {0}")]
    Json(#[from] serde_json::Error),
}
