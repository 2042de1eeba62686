//! The fixed sensor-to-target rigid transform of a dataset.

use crate::error::ConfigError;
use nalgebra::{Matrix3, Vector3};
use serde::Deserialize;
use std::f64::consts::{FRAC_PI_2, PI, TAU};

/// Wraps an angle into `(-π, π]`.
pub fn wrap_angle(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TAU);
    if wrapped > PI {
        wrapped - TAU
    } else {
        wrapped
    }
}

/// Rotation, translation and heading convention mapping sensor-frame boxes
/// into the label frame.
///
/// Any axis permutation between the two frames belongs in `rotation`.
/// `rotation_y` is derived from the sensor yaw as
/// `wrap(±yaw + yaw_offset)`, the sign being negative when `invert_yaw` is
/// set.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FrameTransform {
    /// Row-major 3x3 rotation matrix.
    pub rotation: [[f64; 3]; 3],
    pub translation: [f64; 3],
    #[serde(default)]
    pub yaw_offset: f64,
    #[serde(default)]
    pub invert_yaw: bool,
}

impl FrameTransform {
    /// Labels stay in the sensor frame and `rotation_y` equals the yaw.
    pub fn identity() -> Self {
        Self {
            rotation: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            translation: [0.0; 3],
            yaw_offset: 0.0,
            invert_yaw: false,
        }
    }

    /// Standard lidar (x forward, y left, z up) to KITTI camera
    /// (x right, y down, z forward) axes without extrinsic offset.
    ///
    /// `rotation_y = -yaw - π/2`.
    pub fn kitti_camera() -> Self {
        Self {
            rotation: [[0.0, -1.0, 0.0], [0.0, 0.0, -1.0], [1.0, 0.0, 0.0]],
            translation: [0.0; 3],
            yaw_offset: -FRAC_PI_2,
            invert_yaw: true,
        }
    }

    pub fn rotation_matrix(&self) -> Matrix3<f64> {
        let [[m00, m01, m02], [m10, m11, m12], [m20, m21, m22]] = self.rotation;
        Matrix3::new(m00, m01, m02, m10, m11, m12, m20, m21, m22)
    }

    pub fn translation_vector(&self) -> Vector3<f64> {
        Vector3::from(self.translation)
    }

    /// Checks that the rotation is a proper rotation and every parameter is
    /// finite.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rotation.iter().flatten().any(|val| !val.is_finite()) {
            return Err(ConfigError::NonFinite("rotation"));
        }
        if self.translation.iter().any(|val| !val.is_finite()) {
            return Err(ConfigError::NonFinite("translation"));
        }
        if !self.yaw_offset.is_finite() {
            return Err(ConfigError::NonFinite("yaw_offset"));
        }

        const TOLERANCE: f64 = 1e-6;
        let rot = self.rotation_matrix();
        let det = rot.determinant();
        let orthonormal = (rot * rot.transpose() - Matrix3::identity()).norm() < TOLERANCE;

        if !orthonormal || (det - 1.0).abs() > TOLERANCE {
            return Err(ConfigError::InvalidRotation { det });
        }

        Ok(())
    }

    /// Maps a sensor-frame position into the label frame.
    pub fn apply(&self, point: [f64; 3]) -> [f64; 3] {
        let out = self.rotation_matrix() * Vector3::from(point) + self.translation_vector();
        [out.x, out.y, out.z]
    }

    /// Re-expresses a sensor-frame yaw as a label-frame `rotation_y`.
    pub fn rotation_y(&self, yaw: f64) -> f64 {
        let yaw = if self.invert_yaw { -yaw } else { yaw };
        wrap_angle(yaw + self.yaw_offset)
    }
}

impl Default for FrameTransform {
    fn default() -> Self {
        Self::identity()
    }
}
