use std::fmt;

use serde::{Deserialize, Serialize};

/// Numeric type of one pixel sample.
///
/// Nearest-neighbor operations treat samples as opaque byte groups; only
/// numeric resampling (area averaging) interprets them through this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelType {
    Uint8,
    Int8,
    Uint16,
    Int16,
    Uint32,
    Int32,
    Float32,
    Float64,
}

impl PixelType {
    /// Size of one sample in bytes
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelType::Uint8 | PixelType::Int8 => 1,
            PixelType::Uint16 | PixelType::Int16 => 2,
            PixelType::Uint32 | PixelType::Int32 | PixelType::Float32 => 4,
            PixelType::Float64 => 8,
        }
    }

    /// Whether samples are IEEE floating point
    pub fn is_floating_point(self) -> bool {
        matches!(self, PixelType::Float32 | PixelType::Float64)
    }

    /// Whether integer samples carry a sign bit
    pub fn is_signed(self) -> bool {
        matches!(
            self,
            PixelType::Int8 | PixelType::Int16 | PixelType::Int32
        )
    }
}

impl fmt::Display for PixelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PixelType::Uint8 => "uint8",
            PixelType::Int8 => "int8",
            PixelType::Uint16 => "uint16",
            PixelType::Int16 => "int16",
            PixelType::Uint32 => "uint32",
            PixelType::Int32 => "int32",
            PixelType::Float32 => "float32",
            PixelType::Float64 => "float64",
        };
        f.write_str(name)
    }
}

/// Storage order of planes across the Z, C and T axes.
///
/// All orders lead with XY; the axis named first after XY varies fastest
/// in the linear plane sequence. `Xyzct` therefore stores all Z planes of
/// channel 0 before moving to channel 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DimensionOrder {
    #[default]
    #[serde(rename = "XYZCT")]
    Xyzct,
    #[serde(rename = "XYZTC")]
    Xyztc,
    #[serde(rename = "XYCZT")]
    Xyczt,
    #[serde(rename = "XYCTZ")]
    Xyctz,
    #[serde(rename = "XYTCZ")]
    Xytcz,
    #[serde(rename = "XYTZC")]
    Xytzc,
}

impl DimensionOrder {
    /// Canonical five-letter name, e.g. `"XYZCT"`
    pub fn as_str(self) -> &'static str {
        match self {
            DimensionOrder::Xyzct => "XYZCT",
            DimensionOrder::Xyztc => "XYZTC",
            DimensionOrder::Xyczt => "XYCZT",
            DimensionOrder::Xyctz => "XYCTZ",
            DimensionOrder::Xytcz => "XYTCZ",
            DimensionOrder::Xytzc => "XYTZC",
        }
    }

    /// Linear plane index of a (z, c, t) position.
    ///
    /// Axis lengths are the extents of the three plane axes; the caller
    /// guarantees each coordinate is within its length.
    pub(crate) fn linear_index(
        self,
        z: u32,
        c: u32,
        t: u32,
        z_len: u32,
        c_len: u32,
        t_len: u32,
    ) -> usize {
        let (z, c, t) = (z as usize, c as usize, t as usize);
        let (zl, cl, tl) = (z_len as usize, c_len as usize, t_len as usize);
        match self {
            DimensionOrder::Xyzct => z + zl * (c + cl * t),
            DimensionOrder::Xyztc => z + zl * (t + tl * c),
            DimensionOrder::Xyczt => c + cl * (z + zl * t),
            DimensionOrder::Xyctz => c + cl * (t + tl * z),
            DimensionOrder::Xytcz => t + tl * (c + cl * z),
            DimensionOrder::Xytzc => t + tl * (z + zl * c),
        }
    }

    /// Inverse of [`linear_index`](Self::linear_index): (z, c, t) of a
    /// linear plane index.
    pub(crate) fn position(
        self,
        index: usize,
        z_len: u32,
        c_len: u32,
        t_len: u32,
    ) -> (u32, u32, u32) {
        let (zl, cl, tl) = (z_len as usize, c_len as usize, t_len as usize);
        let split = |fast: usize, mid: usize| {
            (
                (index % fast) as u32,
                ((index / fast) % mid) as u32,
                (index / (fast * mid)) as u32,
            )
        };
        match self {
            DimensionOrder::Xyzct => {
                let (z, c, t) = split(zl, cl);
                (z, c, t)
            }
            DimensionOrder::Xyztc => {
                let (z, t, c) = split(zl, tl);
                (z, c, t)
            }
            DimensionOrder::Xyczt => {
                let (c, z, t) = split(cl, zl);
                (z, c, t)
            }
            DimensionOrder::Xyctz => {
                let (c, t, z) = split(cl, tl);
                (z, c, t)
            }
            DimensionOrder::Xytcz => {
                let (t, c, z) = split(tl, cl);
                (z, c, t)
            }
            DimensionOrder::Xytzc => {
                let (t, z, c) = split(tl, zl);
                (z, c, t)
            }
        }
    }
}

impl fmt::Display for DimensionOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
