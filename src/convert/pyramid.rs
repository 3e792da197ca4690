//! Multi-resolution pyramid synthesis.
//!
//! The [`PyramidBuilder`] turns a single full-resolution image into a
//! stack of progressively smaller levels on a [`PyramidPixelSink`]:
//!
//! 1. Plan every level geometry from the source geometry and the scale
//!    factor.
//! 2. Register all levels with the sink before writing a single pixel.
//!    Containers that put the pyramid shape in a header need the full
//!    plan up front.
//! 3. Per plane, read the full-resolution buffer once and derive each
//!    level from it with the cumulative factor `scale^level`, so
//!    quantization error does not compound across levels. Levels are
//!    written in increasing order.
//!
//! A failed level write is skipped and recorded; a failed base read or
//! level registration aborts the build.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::PyramidError;
use crate::geometry::Geometry;
use crate::io::{PixelSource, PyramidPixelSink};
use crate::scale::{Downsampler, ScalingMethod};

use super::{same_shape, SkippedUnit};

// =============================================================================
// Planning
// =============================================================================

/// One entry of a pyramid plan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolutionLevel {
    /// Level index, 0 for full resolution
    pub level: u32,
    /// Geometry of this level
    pub geometry: Geometry,
}

/// Plan the geometry of every pyramid level.
///
/// Level 0 is `base` unchanged; level `i` divides the base width and
/// height by `scale_factor^i` (never below 1 pixel) and scales the
/// physical pixel size to match. Depth, channels and timepoints are
/// carried through untouched.
///
/// # Errors
///
/// Fails when `scale_factor < 2` or `level_count < 1`.
pub fn plan_levels(
    base: &Geometry,
    scale_factor: u32,
    level_count: u32,
) -> Result<Vec<ResolutionLevel>, PyramidError> {
    if scale_factor < 2 {
        return Err(PyramidError::InvalidScaleFactor {
            factor: scale_factor,
        });
    }
    if level_count < 1 {
        return Err(PyramidError::InvalidLevelCount { count: level_count });
    }
    let levels = (0..level_count)
        .map(|level| {
            let cumulative = (scale_factor as u64).saturating_pow(level);
            ResolutionLevel {
                level,
                geometry: base.scaled(cumulative),
            }
        })
        .collect();
    Ok(levels)
}

// =============================================================================
// Options
// =============================================================================

/// Options for a pyramid build.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PyramidOptions {
    /// Linear downscale factor between consecutive levels, at least 2
    pub scale_factor: u32,
    /// Number of levels including the full-resolution level, at least 1
    pub level_count: u32,
    /// Downsampling algorithm
    pub method: ScalingMethod,
}

impl PyramidOptions {
    /// Nearest-neighbor pyramid with the given shape.
    pub fn new(scale_factor: u32, level_count: u32) -> Self {
        Self {
            scale_factor,
            level_count,
            method: ScalingMethod::default(),
        }
    }

    pub fn with_method(mut self, method: ScalingMethod) -> Self {
        self.method = method;
        self
    }
}

impl Default for PyramidOptions {
    fn default() -> Self {
        Self::new(2, 1)
    }
}

// =============================================================================
// Report
// =============================================================================

/// Outcome of a pyramid build.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PyramidReport {
    /// The registered plan, level 0 first
    pub levels: Vec<ResolutionLevel>,
    /// Level planes written across all levels
    pub planes_written: usize,
    /// Level planes that were skipped, in encounter order
    pub skipped: Vec<SkippedUnit>,
}

impl PyramidReport {
    /// True when nothing had to be skipped.
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builds a resolution pyramid from series 0 of a source.
///
/// # Example
///
/// ```ignore
/// use stackpipe::convert::{PyramidBuilder, PyramidOptions};
/// use stackpipe::scale::ScalingMethod;
///
/// let options = PyramidOptions::new(2, 4).with_method(ScalingMethod::AreaAverage);
/// let report = PyramidBuilder::new(options).run(&mut source, &mut sink).await?;
/// assert_eq!(report.levels.len(), 4);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct PyramidBuilder {
    options: PyramidOptions,
}

impl PyramidBuilder {
    pub fn new(options: PyramidOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> PyramidOptions {
        self.options
    }

    /// Build the pyramid, closing both handles on every exit path.
    ///
    /// # Errors
    ///
    /// Fatal conditions: invalid options, a source without geometry, a
    /// sink whose full-resolution level differs from the source, a
    /// failed registration, a failed base-plane read, or a close failure
    /// after an otherwise successful build. A failed level write is
    /// skipped and recorded in the report instead.
    pub async fn run<S, K>(
        &self,
        source: &mut S,
        sink: &mut K,
    ) -> Result<PyramidReport, PyramidError>
    where
        S: PixelSource,
        K: PyramidPixelSink,
    {
        let result = self.run_inner(source, sink).await;

        let source_close = source.close().await;
        let sink_close = sink.close().await;

        match result {
            Ok(report) => {
                if let Err(e) = source_close {
                    return Err(PyramidError::SourceClose(e));
                }
                if let Err(e) = sink_close {
                    return Err(PyramidError::SinkClose(e));
                }
                Ok(report)
            }
            Err(err) => {
                if let Err(e) = source_close {
                    warn!("Source close failed after aborted pyramid build: {}", e);
                }
                if let Err(e) = sink_close {
                    warn!("Sink close failed after aborted pyramid build: {}", e);
                }
                Err(err)
            }
        }
    }

    async fn run_inner<S, K>(
        &self,
        source: &S,
        sink: &mut K,
    ) -> Result<PyramidReport, PyramidError>
    where
        S: PixelSource,
        K: PyramidPixelSink,
    {
        let base = source
            .geometry(0)
            .ok_or(PyramidError::MissingGeometry { series: 0 })?;
        let levels = plan_levels(&base, self.options.scale_factor, self.options.level_count)?;

        // The sink's level 0 must be the image we are about to read
        match sink.level_geometry(0) {
            Some(sg) if same_shape(&sg, &base) => {}
            Some(sg) => {
                return Err(PyramidError::SinkGeometry {
                    sink_width: sg.width,
                    sink_height: sg.height,
                    source_width: base.width,
                    source_height: base.height,
                });
            }
            None => {
                return Err(PyramidError::SinkGeometry {
                    sink_width: 0,
                    sink_height: 0,
                    source_width: base.width,
                    source_height: base.height,
                });
            }
        }

        // Metadata before data: the whole plan goes to the sink first
        for entry in levels.iter().skip(1) {
            sink.register_level(entry.level, entry.geometry)
                .map_err(|source| PyramidError::RegisterLevel {
                    level: entry.level,
                    source,
                })?;
        }
        debug!(
            levels = levels.len(),
            scale_factor = self.options.scale_factor,
            "Registered pyramid plan with {} levels",
            levels.len()
        );

        let downsampler = Downsampler::new(self.options.method);
        let expected = base.plane_size_bytes();
        let mut report = PyramidReport {
            levels: levels.clone(),
            ..PyramidReport::default()
        };

        for plane in 0..base.plane_count() {
            // One full-resolution read feeds every level of this plane
            let base_bytes = source.read_plane(0, plane).await.map_err(|source| {
                PyramidError::BaseRead {
                    series: 0,
                    plane,
                    source,
                }
            })?;
            if base_bytes.len() != expected {
                return Err(PyramidError::BufferSizeMismatch {
                    plane,
                    expected,
                    actual: base_bytes.len(),
                });
            }

            for entry in &levels {
                let data = if entry.level == 0 {
                    base_bytes.clone()
                } else {
                    let cumulative = (self.options.scale_factor as u64).saturating_pow(entry.level);
                    downsampler.downsample(&base_bytes, &base, cumulative)?
                };
                match sink.write_level_plane(entry.level, plane, data).await {
                    Ok(()) => report.planes_written += 1,
                    Err(e) => {
                        warn!(
                            level = entry.level,
                            plane = plane,
                            "Level write failed, skipping: {}",
                            e
                        );
                        report.skipped.push(SkippedUnit::Level {
                            level: entry.level,
                            plane,
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }
        Ok(report)
    }
}
