//! Point cloud frames and the KITTI `.bin` point layout.
//!
//! A `.bin` file is a headerless array of little-endian `f32` values with
//! a stride of four per point: `x, y, z, intensity`.

use crate::error::DecodeError;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use itertools::Itertools;
use num_traits::ToPrimitive;
use std::{
    io::{self, prelude::*},
    iter,
};

/// Number of `f32` values stored per point.
pub const BIN_STRIDE: usize = 4;

/// Size of one point record in bytes.
pub const BIN_RECORD_SIZE: usize = BIN_STRIDE * std::mem::size_of::<f32>();

/// Intensity written for captures without an intensity field.
pub const DEFAULT_INTENSITY: f32 = 0.0;

/// Field names recognized as the intensity channel, in lookup order.
pub const INTENSITY_FIELD_NAMES: [&str; 3] = ["intensity", "i", "reflectivity"];

/// One lidar return in the sensor frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointSample {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub intensity: Option<f32>,
}

impl PointSample {
    pub fn new(x: f32, y: f32, z: f32, intensity: Option<f32>) -> Self {
        Self { x, y, z, intensity }
    }

    /// The point as a fixed-stride record, with the default intensity
    /// substituted when the capture has none.
    pub fn to_record(&self) -> [f32; BIN_STRIDE] {
        let Self { x, y, z, intensity } = *self;
        [x, y, z, intensity.unwrap_or(DEFAULT_INTENSITY)]
    }
}

/// The points of one capture, in source order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PointCloudFrame {
    pub points: Vec<PointSample>,
}

impl PointCloudFrame {
    pub fn new(points: Vec<PointSample>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn has_intensity(&self) -> bool {
        self.points.iter().any(|point| point.intensity.is_some())
    }

    /// Decodes every record of an opened PCD reader.
    ///
    /// The schema must contain `x`, `y` and `z`. The intensity channel is
    /// optional and is multiplied by `intensity_scale` when present.
    pub fn from_pcd_reader<R>(
        reader: pcd_rs::Reader<pcd_rs::DynRecord, R>,
        intensity_scale: f32,
    ) -> Result<Self, DecodeError>
    where
        R: BufRead,
    {
        let layout = FieldLayout::from_names(
            reader
                .meta()
                .field_defs
                .iter()
                .map(|def| def.name.as_str()),
        )?;

        let points: Vec<_> = reader
            .enumerate()
            .map(|(index, record)| -> Result<_, DecodeError> {
                let record = record.map_err(|err| DecodeError::Pcd(err.to_string()))?;
                layout.sample(&record.0, index, intensity_scale)
            })
            .try_collect()?;

        Ok(Self { points })
    }

    /// Serializes the frame into the KITTI `.bin` layout.
    pub fn encode_bin(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.points.len() * BIN_RECORD_SIZE);
        // Writing into a Vec cannot fail.
        let _ = self.write_bin(&mut buf);
        buf
    }

    pub fn write_bin<W>(&self, mut writer: W) -> io::Result<()>
    where
        W: Write,
    {
        for point in &self.points {
            for val in point.to_record() {
                writer.write_f32::<LittleEndian>(val)?;
            }
        }
        Ok(())
    }
}

impl From<Vec<PointSample>> for PointCloudFrame {
    fn from(points: Vec<PointSample>) -> Self {
        Self { points }
    }
}

impl FromIterator<PointSample> for PointCloudFrame {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = PointSample>,
    {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

/// Column positions of the fields this crate consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLayout {
    pub x: usize,
    pub y: usize,
    pub z: usize,
    pub intensity: Option<usize>,
}

impl FieldLayout {
    pub fn from_names<'a, I>(names: I) -> Result<Self, DecodeError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let names: Vec<_> = names.into_iter().collect();
        let position = |name: &str| names.iter().position(|&field| field == name);

        let x = position("x").ok_or(DecodeError::MissingField("x"))?;
        let y = position("y").ok_or(DecodeError::MissingField("y"))?;
        let z = position("z").ok_or(DecodeError::MissingField("z"))?;
        let intensity = INTENSITY_FIELD_NAMES.iter().find_map(|&name| position(name));

        Ok(Self { x, y, z, intensity })
    }

    fn sample(
        &self,
        fields: &[pcd_rs::Field],
        index: usize,
        intensity_scale: f32,
    ) -> Result<PointSample, DecodeError> {
        let value = |column: usize, name: &str| {
            fields
                .get(column)
                .and_then(first_value)
                .ok_or_else(|| DecodeError::EmptyField {
                    name: name.to_string(),
                    index,
                })
        };

        let x = value(self.x, "x")?;
        let y = value(self.y, "y")?;
        let z = value(self.z, "z")?;
        let intensity = match self.intensity {
            Some(column) => Some(value(column, "intensity")? * intensity_scale),
            None => None,
        };

        Ok(PointSample { x, y, z, intensity })
    }
}

/// First element of a PCD field, converted to `f32`.
fn first_value(field: &pcd_rs::Field) -> Option<f32> {
    use pcd_rs::Field as F;

    match field {
        F::I8(values) => values.first()?.to_f32(),
        F::I16(values) => values.first()?.to_f32(),
        F::I32(values) => values.first()?.to_f32(),
        F::U8(values) => values.first()?.to_f32(),
        F::U16(values) => values.first()?.to_f32(),
        F::U32(values) => values.first()?.to_f32(),
        F::F32(values) => values.first().copied(),
        F::F64(values) => values.first()?.to_f32(),
    }
}

/// Iterates over the points of a KITTI `.bin` stream.
///
/// Every decoded point carries an intensity, since the layout always stores
/// one. A stream whose length is not a multiple of the record size yields a
/// [DecodeError::TruncatedRecord] as its last item.
pub fn decode_bin_iter<R>(mut input: R) -> impl Iterator<Item = Result<PointSample, DecodeError>>
where
    R: Read,
{
    let mut next = move || -> Result<Option<PointSample>, DecodeError> {
        let mut buf = [0u8; BIN_RECORD_SIZE];
        let mut filled = 0;

        while filled < BIN_RECORD_SIZE {
            let cnt = input.read(&mut buf[filled..])?;
            if cnt == 0 {
                break;
            }
            filled += cnt;
        }

        match filled {
            0 => return Ok(None),
            BIN_RECORD_SIZE => {}
            cnt => return Err(DecodeError::TruncatedRecord(cnt)),
        }

        let mut record = &buf[..];
        let x = record.read_f32::<LittleEndian>()?;
        let y = record.read_f32::<LittleEndian>()?;
        let z = record.read_f32::<LittleEndian>()?;
        let intensity = record.read_f32::<LittleEndian>()?;

        Ok(Some(PointSample::new(x, y, z, Some(intensity))))
    };

    let mut done = false;
    iter::from_fn(move || {
        if done {
            return None;
        }
        let item = next().transpose();
        done = !matches!(item, Some(Ok(_)));
        item
    })
}

/// Decodes a whole `.bin` buffer.
pub fn decode_bin(bytes: &[u8]) -> Result<Vec<PointSample>, DecodeError> {
    decode_bin_iter(bytes).try_collect()
}
