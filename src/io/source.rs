//! PixelSource trait for format-agnostic pixel access.
//!
//! This module defines the `PixelSource` trait, the read side of every
//! conversion: an opened, multi-series image that reports its geometry
//! and serves planes or rectangular sub-regions as byte buffers.
//!
//! Opening belongs to the implementation, not the trait: concrete sources
//! expose constructors returning `Result<Self, OpenError>` and the engine
//! only consumes already-open handles. [`crate::io::MemorySource`] is the
//! in-memory implementation; decorators such as
//! [`crate::io::CachingSource`] wrap any other source.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{CloseError, ReadError};
use crate::geometry::Geometry;

/// Format-agnostic interface for reading pixel data.
///
/// Series and plane selection is explicit on every call; a source holds
/// no "current series" cursor, so independent operations can interleave
/// reads freely.
///
/// Buffers are one plane or one region in the source's own sample
/// layout, as described by the series [`Geometry`].
#[async_trait]
pub trait PixelSource: Send + Sync {
    /// Identifier of the underlying resource (for logging and reports).
    fn locator(&self) -> &str;

    /// Number of image series exposed by this source.
    fn series_count(&self) -> usize;

    /// Geometry of one series.
    ///
    /// Returns `None` if the series index is out of range.
    fn geometry(&self, series: usize) -> Option<Geometry>;

    /// Number of addressable planes in one series.
    ///
    /// Returns `None` if the series index is out of range.
    fn plane_count(&self, series: usize) -> Option<usize> {
        self.geometry(series).map(|g| g.plane_count())
    }

    /// Read one full plane.
    async fn read_plane(&self, series: usize, plane: usize) -> Result<Bytes, ReadError>;

    /// Read a rectangular region of one plane.
    ///
    /// The region must lie entirely within the plane.
    async fn read_region(
        &self,
        series: usize,
        plane: usize,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> Result<Bytes, ReadError>;

    /// Release the underlying resource.
    ///
    /// Reads after a close fail with [`ReadError::Closed`]. Closing an
    /// already-closed source is a no-op.
    async fn close(&mut self) -> Result<(), CloseError>;
}
