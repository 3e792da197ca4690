//! Image geometry and raster addressing.
//!
//! [`Geometry`] is the immutable shape description every other component
//! works from: plane dimensions, the Z/C/T extents, the sample type and
//! byte layout, and optional physical calibration. Derived facts (plane
//! counts, buffer sizes, linear plane indices) are computed here so that
//! sources, sinks and drivers never repeat raster arithmetic.
//!
//! A geometry is created once per series and never mutated; operations
//! that change shape (pyramid levels, reslicing) derive a new value.

mod pixel_type;
mod raster;

pub use pixel_type::{DimensionOrder, PixelType};
pub use raster::{extract_region, scatter_region, PlaneLayout};

use serde::{Deserialize, Serialize};

use crate::error::GeometryError;

/// Physical size of one voxel in micrometers, when calibrated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PhysicalSize {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
}

impl PhysicalSize {
    /// Calibration with all three axes known
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            z: Some(z),
        }
    }
}

/// Shape and sample layout of one image series.
///
/// All fields are public: a geometry is plain data, assembled with
/// [`Geometry::new`] plus the `with_*` builders and checked once with
/// [`Geometry::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    /// Plane width in pixels
    pub width: u32,
    /// Plane height in pixels
    pub height: u32,
    /// Number of focal planes (Z)
    pub depth: u32,
    /// Total channel count (C)
    pub channels: u32,
    /// Number of timepoints (T)
    pub timepoints: u32,
    /// Numeric type of each sample
    pub pixel_type: PixelType,
    /// Byte order of multi-byte samples
    pub little_endian: bool,
    /// Samples stored together in one plane (1 for grayscale, 3 for
    /// chunky RGB). Always divides `channels`.
    pub rgb_channel_count: u32,
    /// Whether multi-sample pixels interleave their samples (RGBRGB) or
    /// store sample sub-planes back to back
    pub interleaved: bool,
    /// Storage order of planes across Z, C and T
    pub dimension_order: DimensionOrder,
    /// Physical voxel sizes, if calibrated
    pub physical: PhysicalSize,
}

impl Geometry {
    /// Single-plane grayscale geometry with the given pixel type.
    ///
    /// Defaults: depth, channels and timepoints of 1, little-endian,
    /// interleaved, XYZCT order, no physical calibration.
    pub fn new(width: u32, height: u32, pixel_type: PixelType) -> Self {
        Self {
            width,
            height,
            depth: 1,
            channels: 1,
            timepoints: 1,
            pixel_type,
            little_endian: true,
            rgb_channel_count: 1,
            interleaved: true,
            dimension_order: DimensionOrder::Xyzct,
            physical: PhysicalSize::default(),
        }
    }

    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_channels(mut self, channels: u32) -> Self {
        self.channels = channels;
        self
    }

    pub fn with_timepoints(mut self, timepoints: u32) -> Self {
        self.timepoints = timepoints;
        self
    }

    pub fn with_rgb_channel_count(mut self, rgb_channel_count: u32) -> Self {
        self.rgb_channel_count = rgb_channel_count;
        self
    }

    pub fn with_interleaved(mut self, interleaved: bool) -> Self {
        self.interleaved = interleaved;
        self
    }

    pub fn with_little_endian(mut self, little_endian: bool) -> Self {
        self.little_endian = little_endian;
        self
    }

    pub fn with_dimension_order(mut self, dimension_order: DimensionOrder) -> Self {
        self.dimension_order = dimension_order;
        self
    }

    pub fn with_physical_size(mut self, physical: PhysicalSize) -> Self {
        self.physical = physical;
        self
    }

    /// Check the invariants every consumer relies on.
    ///
    /// All extents must be at least 1 and the RGB channel count must
    /// divide the channel count evenly.
    pub fn validate(&self) -> Result<(), GeometryError> {
        let extents = [
            ("width", self.width),
            ("height", self.height),
            ("depth", self.depth),
            ("channels", self.channels),
            ("timepoints", self.timepoints),
            ("rgb channel count", self.rgb_channel_count),
        ];
        for (dimension, value) in extents {
            if value == 0 {
                return Err(GeometryError::ZeroDimension { dimension });
            }
        }
        if self.rgb_channel_count > self.channels {
            return Err(GeometryError::RgbExceedsChannels {
                rgb_channel_count: self.rgb_channel_count,
                channels: self.channels,
            });
        }
        if self.channels % self.rgb_channel_count != 0 {
            return Err(GeometryError::UnevenChannelGroups {
                channels: self.channels,
                rgb_channel_count: self.rgb_channel_count,
            });
        }
        Ok(())
    }

    /// Size of one sample in bytes
    pub fn bytes_per_pixel(&self) -> usize {
        self.pixel_type.bytes_per_pixel()
    }

    /// Whether samples are IEEE floating point
    pub fn is_floating_point(&self) -> bool {
        self.pixel_type.is_floating_point()
    }

    /// Number of separately addressed channels.
    ///
    /// Channels grouped into one plane (RGB) count once.
    pub fn effective_channels(&self) -> u32 {
        self.channels / self.rgb_channel_count
    }

    /// Number of addressable planes: depth x effective channels x
    /// timepoints.
    pub fn plane_count(&self) -> usize {
        self.depth as usize * self.effective_channels() as usize * self.timepoints as usize
    }

    /// Byte length of one full plane
    pub fn plane_size_bytes(&self) -> usize {
        self.plane_layout().plane_bytes()
    }

    /// Byte length of a `width x height` region of one plane
    pub fn region_size_bytes(&self, width: u32, height: u32) -> usize {
        self.plane_layout().region_bytes(width, height)
    }

    /// Byte layout of one plane, for raster copy helpers
    pub fn plane_layout(&self) -> PlaneLayout {
        PlaneLayout {
            width: self.width,
            height: self.height,
            samples: self.rgb_channel_count,
            sample_bytes: self.bytes_per_pixel(),
            interleaved: self.interleaved,
        }
    }

    /// Linear plane index of a (z, c, t) position under this geometry's
    /// dimension order. `c` addresses effective channels.
    ///
    /// # Panics
    /// Panics if any coordinate is outside its extent.
    pub fn plane_index(&self, z: u32, c: u32, t: u32) -> usize {
        assert!(
            z < self.depth && c < self.effective_channels() && t < self.timepoints,
            "plane position (z {}, c {}, t {}) outside ({}, {}, {})",
            z,
            c,
            t,
            self.depth,
            self.effective_channels(),
            self.timepoints
        );
        self.dimension_order
            .linear_index(z, c, t, self.depth, self.effective_channels(), self.timepoints)
    }

    /// (z, c, t) position of a linear plane index.
    ///
    /// # Panics
    /// Panics if `index` is not below [`plane_count`](Self::plane_count).
    pub fn plane_coords(&self, index: usize) -> (u32, u32, u32) {
        assert!(
            index < self.plane_count(),
            "plane index {} outside {} planes",
            index,
            self.plane_count()
        );
        self.dimension_order
            .position(index, self.depth, self.effective_channels(), self.timepoints)
    }

    /// Geometry of this image reduced by an integer factor in X and Y.
    ///
    /// Plane dimensions shrink to `floor(dim / factor)` with a minimum of
    /// 1; Z, C and T extents are unchanged. Physical X and Y sizes grow
    /// by the factor since each output pixel covers that much more
    /// specimen.
    pub fn scaled(&self, factor: u64) -> Geometry {
        let scale_dim = |dim: u32| -> u32 {
            let reduced = (dim as u64 / factor.max(1)).max(1);
            reduced as u32
        };
        let scale_physical = |size: Option<f64>| size.map(|s| s * factor.max(1) as f64);
        Geometry {
            width: scale_dim(self.width),
            height: scale_dim(self.height),
            physical: PhysicalSize {
                x: scale_physical(self.physical.x),
                y: scale_physical(self.physical.y),
                z: self.physical.z,
            },
            ..*self
        }
    }
}
