//! Conversion driver for full source-to-sink transfers.
//!
//! The [`Converter`] walks every series of a [`PixelSource`] and moves
//! its pixel data into a [`PixelSink`], either plane by plane or tile by
//! tile. It owns the error policy of a transfer: a failed unit (one
//! plane, one tile) is logged, recorded in the report and skipped, while
//! resource-level failures abort the run. Source and sink are closed on
//! every exit path.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                      Converter                       │
//! │  per series:                                         │
//! │    1. check sink accepts the series                  │
//! │    2. untiled: read plane ──► write plane            │
//! │       tiled:   effective tile size ──► TileGrid      │
//! │                read region ──► write region          │
//! │    3. skip failed units, record in report            │
//! └──────────┬─────────────────────────────┬─────────────┘
//!            ▼                             ▼
//!     ┌─────────────┐               ┌─────────────┐
//!     │ PixelSource │               │  PixelSink  │
//!     └─────────────┘               └─────────────┘
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ConvertError, TileGridError};
use crate::geometry::Geometry;
use crate::io::{PixelSink, PixelSource};
use crate::tile::{Tile, TileGrid};

use super::same_shape;

// =============================================================================
// Options
// =============================================================================

/// Options for a conversion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertOptions {
    /// Tile size to request from the sink. `None` transfers whole
    /// planes.
    ///
    /// The requested size is advisory: the sink's
    /// [`effective_tile_size`](PixelSink::effective_tile_size) decides
    /// the final grid.
    pub tile_size: Option<(u32, u32)>,
}

impl ConvertOptions {
    /// Whole-plane transfer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Transfer in tiles of the requested size.
    pub fn with_tile_size(mut self, width: u32, height: u32) -> Self {
        self.tile_size = Some((width, height));
        self
    }
}

// =============================================================================
// Report
// =============================================================================

/// One unit a driver gave up on, with enough context to re-run it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkippedUnit {
    /// A whole series the sink would not take
    Series { series: usize, reason: String },
    /// One plane of an untiled transfer
    Plane {
        series: usize,
        plane: usize,
        reason: String,
    },
    /// One tile of a tiled transfer
    Tile {
        series: usize,
        plane: usize,
        tile: Tile,
        reason: String,
    },
    /// One plane of one pyramid level
    Level {
        level: u32,
        plane: usize,
        reason: String,
    },
}

/// Outcome of a conversion run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionReport {
    /// Series fully visited (selected and iterated)
    pub series_converted: usize,
    /// Whole planes written in untiled mode
    pub planes_written: usize,
    /// Tiles written in tiled mode
    pub tiles_written: usize,
    /// Units that were skipped, in encounter order
    pub skipped: Vec<SkippedUnit>,
}

impl ConversionReport {
    /// True when nothing had to be skipped.
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

// =============================================================================
// Converter
// =============================================================================

/// Drives a full multi-series transfer from a source to a sink.
///
/// # Example
///
/// ```ignore
/// use stackpipe::convert::{Converter, ConvertOptions};
///
/// let converter = Converter::new(ConvertOptions::new().with_tile_size(256, 256));
/// let report = converter.run(&mut source, &mut sink).await?;
/// assert!(report.is_complete());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Converter {
    options: ConvertOptions,
}

impl Converter {
    pub fn new(options: ConvertOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> ConvertOptions {
        self.options
    }

    /// Convert every series of `source` into `sink`.
    ///
    /// Both handles are closed before this returns, whether the run
    /// succeeded or not. After a successful run a close failure is
    /// reported as [`ConvertError::SourceClose`] /
    /// [`ConvertError::SinkClose`]; after a failed run close errors are
    /// only logged so the original error surfaces.
    ///
    /// # Errors
    ///
    /// Fatal conditions only: an unusable tile size, a series without
    /// geometry, a buffer of the wrong length, or a close failure.
    /// Per-unit read/write failures are recorded in the report instead.
    pub async fn run<S, K>(
        &self,
        source: &mut S,
        sink: &mut K,
    ) -> Result<ConversionReport, ConvertError>
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
                    return Err(ConvertError::SourceClose(e));
                }
                if let Err(e) = sink_close {
                    return Err(ConvertError::SinkClose(e));
                }
                Ok(report)
            }
            Err(err) => {
                if let Err(e) = source_close {
                    warn!("Source close failed after aborted conversion: {}", e);
                }
                if let Err(e) = sink_close {
                    warn!("Sink close failed after aborted conversion: {}", e);
                }
                Err(err)
            }
        }
    }

    async fn run_inner<S, K>(
        &self,
        source: &S,
        sink: &mut K,
    ) -> Result<ConversionReport, ConvertError>
    where
        S: PixelSource,
        K: PixelSink,
    {
        // Reject a bad tile size before any I/O
        if let Some((width, height)) = self.options.tile_size {
            if width == 0 || height == 0 {
                return Err(TileGridError::InvalidTileSize { width, height }.into());
            }
        }

        let mut report = ConversionReport::default();
        for series in 0..source.series_count() {
            let geometry = source
                .geometry(series)
                .ok_or(ConvertError::MissingGeometry { series })?;

            // SelectSeries: the sink must know this series and agree on
            // its shape
            if series >= sink.series_count() {
                let reason = format!("sink accepts {} series", sink.series_count());
                warn!(series = series, "Skipping series {}: {}", series, reason);
                report.skipped.push(SkippedUnit::Series { series, reason });
                continue;
            }
            match sink.geometry(series) {
                Some(sg) if same_shape(&sg, &geometry) => {}
                Some(_) => {
                    let reason = "sink geometry does not match the source series".to_string();
                    warn!(series = series, "Skipping series {}: {}", series, reason);
                    report.skipped.push(SkippedUnit::Series { series, reason });
                    continue;
                }
                None => {
                    let reason = "sink reports no geometry for the series".to_string();
                    warn!(series = series, "Skipping series {}: {}", series, reason);
                    report.skipped.push(SkippedUnit::Series { series, reason });
                    continue;
                }
            }

            match self.options.tile_size {
                None => {
                    self.copy_planes(source, sink, series, &geometry, &mut report)
                        .await?
                }
                Some((width, height)) => {
                    self.copy_tiles(source, sink, series, &geometry, width, height, &mut report)
                        .await?
                }
            }
            report.series_converted += 1;
        }
        Ok(report)
    }

    async fn copy_planes<S, K>(
        &self,
        source: &S,
        sink: &mut K,
        series: usize,
        geometry: &Geometry,
        report: &mut ConversionReport,
    ) -> Result<(), ConvertError>
    where
        S: PixelSource,
        K: PixelSink,
    {
        let expected = geometry.plane_size_bytes();
        for plane in 0..geometry.plane_count() {
            let data = match source.read_plane(series, plane).await {
                Ok(data) => data,
                Err(e) => {
                    warn!(
                        series = series,
                        plane = plane,
                        "Plane read failed, skipping: {}",
                        e
                    );
                    report.skipped.push(SkippedUnit::Plane {
                        series,
                        plane,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };
            if data.len() != expected {
                return Err(ConvertError::BufferSizeMismatch {
                    series,
                    plane,
                    expected,
                    actual: data.len(),
                });
            }
            match sink.write_plane(series, plane, data).await {
                Ok(()) => report.planes_written += 1,
                Err(e) => {
                    warn!(
                        series = series,
                        plane = plane,
                        "Plane write failed, skipping: {}",
                        e
                    );
                    report.skipped.push(SkippedUnit::Plane {
                        series,
                        plane,
                        reason: e.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn copy_tiles<S, K>(
        &self,
        source: &S,
        sink: &mut K,
        series: usize,
        geometry: &Geometry,
        requested_width: u32,
        requested_height: u32,
        report: &mut ConversionReport,
    ) -> Result<(), ConvertError>
    where
        S: PixelSource,
        K: PixelSink,
    {
        // The sink has the final say on tile dimensions
        let (tile_width, tile_height) = sink.effective_tile_size(requested_width, requested_height);
        let grid = TileGrid::new(geometry.width, geometry.height, tile_width, tile_height)?;
        debug!(
            series = series,
            tile_width = tile_width,
            tile_height = tile_height,
            tiles = grid.tile_count(),
            "Planned tile grid for series {}",
            series
        );

        for plane in 0..geometry.plane_count() {
            for tile in grid.tiles() {
                let data = match source
                    .read_region(series, plane, tile.x, tile.y, tile.width, tile.height)
                    .await
                {
                    Ok(data) => data,
                    Err(e) => {
                        warn!(
                            series = series,
                            plane = plane,
                            x = tile.x,
                            y = tile.y,
                            "Tile read failed, skipping: {}",
                            e
                        );
                        report.skipped.push(SkippedUnit::Tile {
                            series,
                            plane,
                            tile,
                            reason: e.to_string(),
                        });
                        continue;
                    }
                };
                let expected = geometry.region_size_bytes(tile.width, tile.height);
                if data.len() != expected {
                    return Err(ConvertError::BufferSizeMismatch {
                        series,
                        plane,
                        expected,
                        actual: data.len(),
                    });
                }
                match sink
                    .write_region(series, plane, data, tile.x, tile.y, tile.width, tile.height)
                    .await
                {
                    Ok(()) => report.tiles_written += 1,
                    Err(e) => {
                        warn!(
                            series = series,
                            plane = plane,
                            x = tile.x,
                            y = tile.y,
                            "Tile write failed, skipping: {}",
                            e
                        );
                        report.skipped.push(SkippedUnit::Tile {
                            series,
                            plane,
                            tile,
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}
