//! Orthogonal reslicing of 3D volumes.
//!
//! The [`OrthogonalReslicer`] reads a Z stack plane by plane and emits
//! the same volume cut along the two other axis pairs: an XZ series with
//! one plane per source row, and a YZ series with one plane per source
//! column. Each output plane is assembled from 1-pixel strips, one per
//! Z slice, so at most one output plane is resident at a time:
//!
//! ```text
//! XZ output plane for row y        strip (0, y, width, 1) of slice z
//!         x ──►                            becomes row z
//!   z  ┌──────────┐                 ┌──────────┐
//!   │  │ row y, z0 │  ◄───────────  │  slice z0 │
//!   ▼  │ row y, z1 │                │  slice z1 │
//!      │ row y, z2 │                │  slice z2 │
//!      └──────────┘                 └──────────┘
//! ```
//!
//! Partial orthogonal planes are not meaningful, so any strip read or
//! plane write failure aborts the whole reslice.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ResliceError;
use crate::geometry::{Geometry, PhysicalSize};
use crate::io::{PixelSink, PixelSource};

use super::same_shape;

// =============================================================================
// Output planning
// =============================================================================

/// Geometries of the XZ and YZ series a reslice produces.
///
/// The XZ series is `width x depth` with one plane per source row; the
/// YZ series is `height x depth` with one plane per source column.
/// Physical voxel sizes are permuted with the axes. Only the first
/// channel and timepoint are resliced, so both outputs are single
/// channel, single timepoint.
///
/// # Errors
///
/// Fails for multi-sample (RGB) geometries; reslicing mixes pixels from
/// different rows, which has no meaning for interleaved samples.
pub fn output_geometries(source: &Geometry) -> Result<(Geometry, Geometry), ResliceError> {
    if source.rgb_channel_count > 1 {
        return Err(ResliceError::UnsupportedGeometry {
            rgb_channel_count: source.rgb_channel_count,
        });
    }
    let xz = Geometry {
        width: source.width,
        height: source.depth,
        depth: source.height,
        channels: 1,
        timepoints: 1,
        physical: PhysicalSize {
            x: source.physical.x,
            y: source.physical.z,
            z: source.physical.y,
        },
        ..*source
    };
    let yz = Geometry {
        width: source.height,
        height: source.depth,
        depth: source.width,
        channels: 1,
        timepoints: 1,
        physical: PhysicalSize {
            x: source.physical.y,
            y: source.physical.z,
            z: source.physical.x,
        },
        ..*source
    };
    Ok((xz, yz))
}

// =============================================================================
// Report
// =============================================================================

/// Outcome of a reslice run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResliceReport {
    /// XZ planes written to sink series 0
    pub xz_planes: usize,
    /// YZ planes written to sink series 1
    pub yz_planes: usize,
}

// =============================================================================
// Reslicer
// =============================================================================

/// Re-cuts one source series along the XZ and YZ axis pairs.
///
/// The sink must expose exactly the two series of
/// [`output_geometries`]: series 0 for XZ, series 1 for YZ.
///
/// # Example
///
/// ```ignore
/// use stackpipe::convert::{output_geometries, OrthogonalReslicer};
/// use stackpipe::io::MemorySink;
///
/// let (xz, yz) = output_geometries(&volume)?;
/// let mut sink = MemorySink::open("mem://ortho", vec![xz, yz])?;
/// let report = OrthogonalReslicer::new().run(&mut source, &mut sink).await?;
/// assert_eq!(report.xz_planes as u32, volume.height);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct OrthogonalReslicer {
    series: usize,
}

impl OrthogonalReslicer {
    /// Reslice series 0 of the source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reslice a different source series.
    pub fn with_series(mut self, series: usize) -> Self {
        self.series = series;
        self
    }

    /// Run the reslice, closing both handles on every exit path.
    ///
    /// # Errors
    ///
    /// Everything here is fatal: a missing or unsupported source
    /// geometry, a sink without the two expected series, any strip read
    /// or plane write failure, and close failures after an otherwise
    /// successful run.
    pub async fn run<S, K>(
        &self,
        source: &mut S,
        sink: &mut K,
    ) -> Result<ResliceReport, ResliceError>
    where
        S: PixelSource,
        K: PixelSink,
    {
        let result = self.run_inner(source, sink).await;

        let source_close = source.close().await;
        let sink_close = sink.close().await;

        match result {
            Ok(report) => {
                if let Err(e) = source_close {
                    return Err(ResliceError::SourceClose(e));
                }
                if let Err(e) = sink_close {
                    return Err(ResliceError::SinkClose(e));
                }
                Ok(report)
            }
            Err(err) => {
                if let Err(e) = source_close {
                    warn!("Source close failed after aborted reslice: {}", e);
                }
                if let Err(e) = sink_close {
                    warn!("Sink close failed after aborted reslice: {}", e);
                }
                Err(err)
            }
        }
    }

    async fn run_inner<S, K>(
        &self,
        source: &S,
        sink: &mut K,
    ) -> Result<ResliceReport, ResliceError>
    where
        S: PixelSource,
        K: PixelSink,
    {
        let geometry = source
            .geometry(self.series)
            .ok_or(ResliceError::MissingGeometry {
                series: self.series,
            })?;
        let (xz, yz) = output_geometries(&geometry)?;

        let found = sink.series_count();
        if found < 2 {
            return Err(ResliceError::SinkSeries { found });
        }
        for (series, expected) in [(0, &xz), (1, &yz)] {
            match sink.geometry(series) {
                Some(sg) if same_shape(&sg, expected) => {}
                _ => return Err(ResliceError::SinkGeometry { series }),
            }
        }
        debug!(
            width = geometry.width,
            height = geometry.height,
            depth = geometry.depth,
            "Reslicing {}x{}x{} volume",
            geometry.width,
            geometry.height,
            geometry.depth
        );

        let xz_planes = self
            .assemble_axis(source, sink, &geometry, 0, geometry.height, geometry.width, |y| {
                (0, y, geometry.width, 1)
            })
            .await?;
        let yz_planes = self
            .assemble_axis(source, sink, &geometry, 1, geometry.width, geometry.height, |x| {
                (x, 0, 1, geometry.height)
            })
            .await?;
        Ok(ResliceReport {
            xz_planes,
            yz_planes,
        })
    }

    /// Assemble and write every output plane of one axis pair.
    ///
    /// `rect` maps an output plane index to the 1-pixel strip to read
    /// from each Z slice; the strip becomes row `z` of the output plane.
    #[allow(clippy::too_many_arguments)]
    async fn assemble_axis<S, K>(
        &self,
        source: &S,
        sink: &mut K,
        geometry: &Geometry,
        sink_series: usize,
        output_planes: u32,
        strip_pixels: u32,
        rect: impl Fn(u32) -> (u32, u32, u32, u32),
    ) -> Result<usize, ResliceError>
    where
        S: PixelSource,
        K: PixelSink,
    {
        let row_bytes = geometry.region_size_bytes(strip_pixels, 1);
        let mut written = 0;
        for outer in 0..output_planes {
            let mut plane = vec![0u8; row_bytes * geometry.depth as usize];
            for z in 0..geometry.depth {
                let index = geometry.plane_index(z, 0, 0);
                let (x, y, width, height) = rect(outer);
                let strip = source
                    .read_region(self.series, index, x, y, width, height)
                    .await
                    .map_err(|source| ResliceError::StripRead {
                        output_plane: outer as usize,
                        z,
                        source,
                    })?;
                if strip.len() != row_bytes {
                    return Err(ResliceError::BufferSizeMismatch {
                        expected: row_bytes,
                        actual: strip.len(),
                    });
                }
                let offset = z as usize * row_bytes;
                plane[offset..offset + row_bytes].copy_from_slice(&strip);
            }
            sink.write_plane(sink_series, outer as usize, Bytes::from(plane))
                .await
                .map_err(|source| ResliceError::PlaneWrite {
                    series: sink_series,
                    plane: outer as usize,
                    source,
                })?;
            written += 1;
        }
        Ok(written)
    }
}
