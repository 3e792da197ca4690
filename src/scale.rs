//! Plane downsampling for pyramid synthesis.
//!
//! [`Downsampler`] reduces one plane by an integer factor. The baseline
//! method picks the nearest source pixel and copies its bytes untouched,
//! so it works for every pixel type without interpreting sample values.
//! [`ScalingMethod::AreaAverage`] instead averages each `factor x factor`
//! source block per channel, which needs the numeric type and byte order
//! to decode and re-encode samples.

use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use crate::error::DownsampleError;
use crate::geometry::{Geometry, PixelType, PlaneLayout};

/// Pixel resampling algorithm
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalingMethod {
    /// Nearest source pixel. Exact sample values, no numeric
    /// interpretation.
    #[default]
    Nearest,
    /// Mean of each source block, per channel. Smoother output for
    /// photographic content.
    AreaAverage,
}

/// Reduces planes by integer factors.
#[derive(Debug, Clone, Copy, Default)]
pub struct Downsampler {
    method: ScalingMethod,
}

impl Downsampler {
    pub fn new(method: ScalingMethod) -> Self {
        Self { method }
    }

    pub fn method(&self) -> ScalingMethod {
        self.method
    }

    /// Output plane dimensions for a reduction: `floor(dim / factor)`
    /// with a minimum of 1 per axis.
    pub fn output_dimensions(width: u32, height: u32, factor: u64) -> (u32, u32) {
        let reduce = |dim: u32| ((dim as u64 / factor.max(1)).max(1)) as u32;
        (reduce(width), reduce(height))
    }

    /// Reduce one plane of `geometry` by `factor`.
    ///
    /// The output buffer keeps the plane's sample layout (interleaving,
    /// byte order) at the reduced dimensions.
    ///
    /// # Errors
    /// Returns [`DownsampleError::InvalidScaleFactor`] for a zero factor
    /// and [`DownsampleError::BufferSizeMismatch`] when `src` does not
    /// hold exactly one plane of `geometry`.
    pub fn downsample(
        &self,
        src: &[u8],
        geometry: &Geometry,
        factor: u64,
    ) -> Result<Bytes, DownsampleError> {
        if factor == 0 {
            return Err(DownsampleError::InvalidScaleFactor { factor });
        }
        let layout = geometry.plane_layout();
        let expected = layout.plane_bytes();
        if src.len() != expected {
            return Err(DownsampleError::BufferSizeMismatch {
                width: geometry.width,
                height: geometry.height,
                expected,
                actual: src.len(),
            });
        }
        let (out_width, out_height) =
            Self::output_dimensions(geometry.width, geometry.height, factor);
        let out = match self.method {
            ScalingMethod::Nearest => nearest(src, layout, factor, out_width, out_height),
            ScalingMethod::AreaAverage => area_average(
                src,
                layout,
                geometry.pixel_type,
                geometry.little_endian,
                factor,
                out_width,
                out_height,
            ),
        };
        Ok(out)
    }
}

fn nearest(src: &[u8], layout: PlaneLayout, factor: u64, out_width: u32, out_height: u32) -> Bytes {
    let sample_bytes = layout.sample_bytes;
    let samples = layout.samples as usize;
    let width = layout.width as usize;
    let mut out = BytesMut::with_capacity(
        out_width as usize * out_height as usize * samples * sample_bytes,
    );
    if layout.interleaved {
        let pixel = samples * sample_bytes;
        for oy in 0..out_height as usize {
            let sy = oy * factor as usize;
            for ox in 0..out_width as usize {
                let sx = ox * factor as usize;
                let offset = (sy * width + sx) * pixel;
                out.extend_from_slice(&src[offset..offset + pixel]);
            }
        }
    } else {
        let sub_plane = width * layout.height as usize * sample_bytes;
        for s in 0..samples {
            let base = s * sub_plane;
            for oy in 0..out_height as usize {
                let sy = oy * factor as usize;
                for ox in 0..out_width as usize {
                    let sx = ox * factor as usize;
                    let offset = base + (sy * width + sx) * sample_bytes;
                    out.extend_from_slice(&src[offset..offset + sample_bytes]);
                }
            }
        }
    }
    out.freeze()
}

#[allow(clippy::too_many_arguments)]
fn area_average(
    src: &[u8],
    layout: PlaneLayout,
    pixel_type: PixelType,
    little_endian: bool,
    factor: u64,
    out_width: u32,
    out_height: u32,
) -> Bytes {
    let sample_bytes = layout.sample_bytes;
    let samples = layout.samples as usize;
    let width = layout.width as usize;
    let height = layout.height as usize;
    let factor = factor as usize;
    let mut out =
        vec![0u8; out_width as usize * out_height as usize * samples * sample_bytes];

    let src_offset = |x: usize, y: usize, s: usize| -> usize {
        if layout.interleaved {
            ((y * width + x) * samples + s) * sample_bytes
        } else {
            (s * width * height + y * width + x) * sample_bytes
        }
    };
    let dst_offset = |x: usize, y: usize, s: usize| -> usize {
        let (w, h) = (out_width as usize, out_height as usize);
        if layout.interleaved {
            ((y * w + x) * samples + s) * sample_bytes
        } else {
            (s * w * h + y * w + x) * sample_bytes
        }
    };

    for oy in 0..out_height as usize {
        let sy = oy * factor;
        let block_h = factor.min(height - sy);
        for ox in 0..out_width as usize {
            let sx = ox * factor;
            let block_w = factor.min(width - sx);
            for s in 0..samples {
                let mut sum = 0.0;
                for by in sy..sy + block_h {
                    for bx in sx..sx + block_w {
                        sum += read_sample(src, src_offset(bx, by, s), pixel_type, little_endian);
                    }
                }
                let mean = sum / (block_w * block_h) as f64;
                write_sample(&mut out, dst_offset(ox, oy, s), mean, pixel_type, little_endian);
            }
        }
    }
    Bytes::from(out)
}

// =============================================================================
// Sample Codec Helpers
// =============================================================================
//
// Numeric averaging accumulates in f64, which represents every integer
// sample type exactly. Offsets come from the loops above and are always in
// bounds.

fn read_sample(bytes: &[u8], offset: usize, pixel_type: PixelType, little_endian: bool) -> f64 {
    let at = |n: usize| bytes[offset + n];
    match pixel_type {
        PixelType::Uint8 => at(0) as f64,
        PixelType::Int8 => at(0) as i8 as f64,
        PixelType::Uint16 => {
            let raw = [at(0), at(1)];
            if little_endian {
                u16::from_le_bytes(raw) as f64
            } else {
                u16::from_be_bytes(raw) as f64
            }
        }
        PixelType::Int16 => {
            let raw = [at(0), at(1)];
            if little_endian {
                i16::from_le_bytes(raw) as f64
            } else {
                i16::from_be_bytes(raw) as f64
            }
        }
        PixelType::Uint32 => {
            let raw = [at(0), at(1), at(2), at(3)];
            if little_endian {
                u32::from_le_bytes(raw) as f64
            } else {
                u32::from_be_bytes(raw) as f64
            }
        }
        PixelType::Int32 => {
            let raw = [at(0), at(1), at(2), at(3)];
            if little_endian {
                i32::from_le_bytes(raw) as f64
            } else {
                i32::from_be_bytes(raw) as f64
            }
        }
        PixelType::Float32 => {
            let raw = [at(0), at(1), at(2), at(3)];
            if little_endian {
                f32::from_le_bytes(raw) as f64
            } else {
                f32::from_be_bytes(raw) as f64
            }
        }
        PixelType::Float64 => {
            let raw = [
                at(0),
                at(1),
                at(2),
                at(3),
                at(4),
                at(5),
                at(6),
                at(7),
            ];
            if little_endian {
                f64::from_le_bytes(raw)
            } else {
                f64::from_be_bytes(raw)
            }
        }
    }
}

fn write_sample(
    bytes: &mut [u8],
    offset: usize,
    value: f64,
    pixel_type: PixelType,
    little_endian: bool,
) {
    let put = |bytes: &mut [u8], raw: &[u8]| {
        bytes[offset..offset + raw.len()].copy_from_slice(raw);
    };
    match pixel_type {
        PixelType::Uint8 => {
            bytes[offset] = value.round().clamp(0.0, u8::MAX as f64) as u8;
        }
        PixelType::Int8 => {
            bytes[offset] =
                (value.round().clamp(i8::MIN as f64, i8::MAX as f64) as i8) as u8;
        }
        PixelType::Uint16 => {
            let v = value.round().clamp(0.0, u16::MAX as f64) as u16;
            let raw = if little_endian {
                v.to_le_bytes()
            } else {
                v.to_be_bytes()
            };
            put(bytes, &raw);
        }
        PixelType::Int16 => {
            let v = value.round().clamp(i16::MIN as f64, i16::MAX as f64) as i16;
            let raw = if little_endian {
                v.to_le_bytes()
            } else {
                v.to_be_bytes()
            };
            put(bytes, &raw);
        }
        PixelType::Uint32 => {
            let v = value.round().clamp(0.0, u32::MAX as f64) as u32;
            let raw = if little_endian {
                v.to_le_bytes()
            } else {
                v.to_be_bytes()
            };
            put(bytes, &raw);
        }
        PixelType::Int32 => {
            let v = value.round().clamp(i32::MIN as f64, i32::MAX as f64) as i32;
            let raw = if little_endian {
                v.to_le_bytes()
            } else {
                v.to_be_bytes()
            };
            put(bytes, &raw);
        }
        PixelType::Float32 => {
            let raw = if little_endian {
                (value as f32).to_le_bytes()
            } else {
                (value as f32).to_be_bytes()
            };
            put(bytes, &raw);
        }
        PixelType::Float64 => {
            let raw = if little_endian {
                value.to_le_bytes()
            } else {
                value.to_be_bytes()
            };
            put(bytes, &raw);
        }
    }
}
