//! PixelSink traits for format-agnostic pixel persistence.
//!
//! The write side mirrors [`crate::io::PixelSource`]: a sink is opened by
//! its implementation with the geometries it will accept, then receives
//! whole planes or rectangular regions addressed by explicit series and
//! plane indices. [`PyramidPixelSink`] extends the contract with
//! resolution levels that must all be registered before the first pixel
//! write, the ordering pyramid containers require to lay out metadata
//! ahead of data.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{CloseError, WriteError};
use crate::geometry::Geometry;

/// Format-agnostic interface for persisting pixel data.
#[async_trait]
pub trait PixelSink: Send + Sync {
    /// Identifier of the underlying resource (for logging and reports).
    fn locator(&self) -> &str;

    /// Number of series this sink will accept.
    fn series_count(&self) -> usize;

    /// Geometry the sink expects for one series.
    ///
    /// Returns `None` if the series index is out of range.
    fn geometry(&self, series: usize) -> Option<Geometry>;

    /// Tile size the sink will actually use for a requested size.
    ///
    /// Containers with tiling constraints (e.g. multiples of 16) round
    /// the request here; callers must plan tiles with the returned size.
    /// The default accepts the request unchanged.
    fn effective_tile_size(&self, width: u32, height: u32) -> (u32, u32) {
        (width, height)
    }

    /// Write one full plane.
    ///
    /// `data` must hold exactly one plane of the series geometry.
    async fn write_plane(&mut self, series: usize, plane: usize, data: Bytes)
        -> Result<(), WriteError>;

    /// Write a rectangular region of one plane.
    ///
    /// `data` must hold exactly `width x height` pixels in the series'
    /// sample layout, and the region must lie entirely within the plane.
    #[allow(clippy::too_many_arguments)]
    async fn write_region(
        &mut self,
        series: usize,
        plane: usize,
        data: Bytes,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> Result<(), WriteError>;

    /// Flush and release the underlying resource.
    ///
    /// Writes after a close fail with [`WriteError::Closed`]. Closing an
    /// already-closed sink is a no-op.
    async fn close(&mut self) -> Result<(), CloseError>;
}

/// A sink storing a multi-resolution pyramid.
///
/// Level 0 is the full-resolution image the sink was opened with. Every
/// further level must be registered, in increasing order, before any
/// pixel data is written; registration after the first write fails with
/// [`WriteError::LateRegistration`].
#[async_trait]
pub trait PyramidPixelSink: PixelSink {
    /// Declare the geometry of one resolution level.
    fn register_level(&mut self, level: u32, geometry: Geometry) -> Result<(), WriteError>;

    /// Number of registered levels, level 0 included.
    fn level_count(&self) -> usize;

    /// Geometry of one registered level.
    ///
    /// Returns `None` if the level was never registered.
    fn level_geometry(&self, level: u32) -> Option<Geometry>;

    /// Write one full plane at a resolution level.
    async fn write_level_plane(
        &mut self,
        level: u32,
        plane: usize,
        data: Bytes,
    ) -> Result<(), WriteError>;
}
