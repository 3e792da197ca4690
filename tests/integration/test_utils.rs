//! Test utilities for integration tests.
//!
//! This module provides synthetic volume builders plus source and sink
//! doubles with injectable failures and request tracking.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Once;

use async_trait::async_trait;
use bytes::Bytes;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stackpipe::error::{CloseError, OpenError, ReadError, WriteError};
use stackpipe::geometry::{Geometry, PixelType};
use stackpipe::io::{
    MemoryPyramidSink, MemorySink, MemorySource, PixelSink, PixelSource, PyramidPixelSink,
};

static INIT: Once = Once::new();

/// Install the test log subscriber once per process.
///
/// `RUST_LOG` overrides the default filter.
pub fn init_logging() {
    INIT.call_once(|| {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "stackpipe=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().with_test_writer())
            .init();
    });
}

// =============================================================================
// Synthetic Volumes
// =============================================================================

/// Volume whose u16 value encodes its coordinate as `x + 10y + 100z`.
///
/// Keeps every voxel distinguishable for widths up to 10 and heights up
/// to 10, which is all the reslice assertions need.
pub fn encoded_volume(width: u32, height: u32, depth: u32) -> (Geometry, Vec<Bytes>) {
    let geometry = Geometry::new(width, height, PixelType::Uint16).with_depth(depth);
    let planes = (0..depth)
        .map(|z| {
            let mut data = Vec::with_capacity((width * height * 2) as usize);
            for y in 0..height {
                for x in 0..width {
                    let value = (x + 10 * y + 100 * z) as u16;
                    data.extend_from_slice(&value.to_le_bytes());
                }
            }
            Bytes::from(data)
        })
        .collect();
    (geometry, planes)
}

/// Decode the little-endian u16 sample at (x, y) of a raw plane.
pub fn sample_u16(plane: &[u8], width: u32, x: u32, y: u32) -> u16 {
    let i = 2 * (x + width * y) as usize;
    u16::from_le_bytes([plane[i], plane[i + 1]])
}

/// One distinct byte pattern per plane of the geometry.
pub fn byte_planes(geometry: &Geometry) -> Vec<Bytes> {
    (0..geometry.plane_count())
        .map(|p| {
            let mut data = Vec::with_capacity(geometry.plane_size_bytes());
            for i in 0..geometry.plane_size_bytes() {
                data.push(((i + 13 * p) % 251) as u8);
            }
            Bytes::from(data)
        })
        .collect()
}

// =============================================================================
// Flaky Source
// =============================================================================

/// A pixel source that fails configured reads with a backend error.
pub struct FlakySource {
    inner: MemorySource,
    fail_planes: HashSet<(usize, usize)>,
    fail_regions: HashSet<(usize, usize, u32, u32)>,
}

impl FlakySource {
    pub fn new(inner: MemorySource) -> Self {
        Self {
            inner,
            fail_planes: HashSet::new(),
            fail_regions: HashSet::new(),
        }
    }

    /// Fail every `read_plane` of this (series, plane).
    pub fn with_failing_plane(mut self, series: usize, plane: usize) -> Self {
        self.fail_planes.insert((series, plane));
        self
    }

    /// Fail every `read_region` of this (series, plane) anchored at (x, y).
    pub fn with_failing_region(mut self, series: usize, plane: usize, x: u32, y: u32) -> Self {
        self.fail_regions.insert((series, plane, x, y));
        self
    }

    pub fn inner(&self) -> &MemorySource {
        &self.inner
    }
}

#[async_trait]
impl PixelSource for FlakySource {
    fn locator(&self) -> &str {
        self.inner.locator()
    }

    fn series_count(&self) -> usize {
        self.inner.series_count()
    }

    fn geometry(&self, series: usize) -> Option<Geometry> {
        self.inner.geometry(series)
    }

    async fn read_plane(&self, series: usize, plane: usize) -> Result<Bytes, ReadError> {
        if self.fail_planes.contains(&(series, plane)) {
            return Err(ReadError::Backend("injected plane read failure".to_string()));
        }
        self.inner.read_plane(series, plane).await
    }

    async fn read_region(
        &self,
        series: usize,
        plane: usize,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> Result<Bytes, ReadError> {
        if self.fail_regions.contains(&(series, plane, x, y)) {
            return Err(ReadError::Backend(
                "injected region read failure".to_string(),
            ));
        }
        self.inner.read_region(series, plane, x, y, width, height).await
    }

    async fn close(&mut self) -> Result<(), CloseError> {
        self.inner.close().await
    }
}

// =============================================================================
// Flaky Sink
// =============================================================================

/// A pixel sink that fails configured writes, or its own close.
pub struct FlakySink {
    inner: MemorySink,
    fail_planes: HashSet<(usize, usize)>,
    fail_regions: HashSet<(usize, usize, u32, u32)>,
    fail_close: bool,
}

impl FlakySink {
    pub fn new(inner: MemorySink) -> Self {
        Self {
            inner,
            fail_planes: HashSet::new(),
            fail_regions: HashSet::new(),
            fail_close: false,
        }
    }

    /// Fail every `write_plane` of this (series, plane).
    pub fn with_failing_plane(mut self, series: usize, plane: usize) -> Self {
        self.fail_planes.insert((series, plane));
        self
    }

    /// Fail every `write_region` of this (series, plane) anchored at (x, y).
    pub fn with_failing_region(mut self, series: usize, plane: usize, x: u32, y: u32) -> Self {
        self.fail_regions.insert((series, plane, x, y));
        self
    }

    /// Fail the close call itself.
    pub fn with_failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    pub fn inner(&self) -> &MemorySink {
        &self.inner
    }
}

#[async_trait]
impl PixelSink for FlakySink {
    fn locator(&self) -> &str {
        self.inner.locator()
    }

    fn series_count(&self) -> usize {
        self.inner.series_count()
    }

    fn geometry(&self, series: usize) -> Option<Geometry> {
        self.inner.geometry(series)
    }

    fn effective_tile_size(&self, width: u32, height: u32) -> (u32, u32) {
        self.inner.effective_tile_size(width, height)
    }

    async fn write_plane(
        &mut self,
        series: usize,
        plane: usize,
        data: Bytes,
    ) -> Result<(), WriteError> {
        if self.fail_planes.contains(&(series, plane)) {
            return Err(WriteError::Backend(
                "injected plane write failure".to_string(),
            ));
        }
        self.inner.write_plane(series, plane, data).await
    }

    async fn write_region(
        &mut self,
        series: usize,
        plane: usize,
        data: Bytes,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> Result<(), WriteError> {
        if self.fail_regions.contains(&(series, plane, x, y)) {
            return Err(WriteError::Backend(
                "injected region write failure".to_string(),
            ));
        }
        self.inner
            .write_region(series, plane, data, x, y, width, height)
            .await
    }

    async fn close(&mut self) -> Result<(), CloseError> {
        if self.fail_close {
            return Err(CloseError {
                locator: self.inner.locator().to_string(),
                reason: "injected close failure".to_string(),
            });
        }
        self.inner.close().await
    }
}

// =============================================================================
// Flaky Pyramid Sink
// =============================================================================

/// A pyramid sink that fails configured level writes or registrations.
pub struct FlakyPyramidSink {
    inner: MemoryPyramidSink,
    fail_level_planes: HashSet<(u32, usize)>,
    fail_register: Option<u32>,
}

impl FlakyPyramidSink {
    pub fn open(locator: &str, base: Geometry) -> Result<Self, OpenError> {
        Ok(Self {
            inner: MemoryPyramidSink::open(locator, base)?,
            fail_level_planes: HashSet::new(),
            fail_register: None,
        })
    }

    /// Fail every `write_level_plane` of this (level, plane).
    pub fn with_failing_level_plane(mut self, level: u32, plane: usize) -> Self {
        self.fail_level_planes.insert((level, plane));
        self
    }

    /// Fail the registration of one level.
    pub fn with_failing_registration(mut self, level: u32) -> Self {
        self.fail_register = Some(level);
        self
    }

    pub fn inner(&self) -> &MemoryPyramidSink {
        &self.inner
    }
}

#[async_trait]
impl PixelSink for FlakyPyramidSink {
    fn locator(&self) -> &str {
        self.inner.locator()
    }

    fn series_count(&self) -> usize {
        self.inner.series_count()
    }

    fn geometry(&self, series: usize) -> Option<Geometry> {
        self.inner.geometry(series)
    }

    async fn write_plane(
        &mut self,
        series: usize,
        plane: usize,
        data: Bytes,
    ) -> Result<(), WriteError> {
        self.inner.write_plane(series, plane, data).await
    }

    async fn write_region(
        &mut self,
        series: usize,
        plane: usize,
        data: Bytes,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> Result<(), WriteError> {
        self.inner
            .write_region(series, plane, data, x, y, width, height)
            .await
    }

    async fn close(&mut self) -> Result<(), CloseError> {
        self.inner.close().await
    }
}

#[async_trait]
impl PyramidPixelSink for FlakyPyramidSink {
    fn register_level(&mut self, level: u32, geometry: Geometry) -> Result<(), WriteError> {
        if self.fail_register == Some(level) {
            return Err(WriteError::Backend(
                "injected registration failure".to_string(),
            ));
        }
        self.inner.register_level(level, geometry)
    }

    fn level_count(&self) -> usize {
        self.inner.level_count()
    }

    fn level_geometry(&self, level: u32) -> Option<Geometry> {
        self.inner.level_geometry(level)
    }

    async fn write_level_plane(
        &mut self,
        level: u32,
        plane: usize,
        data: Bytes,
    ) -> Result<(), WriteError> {
        if self.fail_level_planes.contains(&(level, plane)) {
            return Err(WriteError::Backend(
                "injected level write failure".to_string(),
            ));
        }
        self.inner.write_level_plane(level, plane, data).await
    }
}

// =============================================================================
// Counting Source
// =============================================================================

/// A pixel source counting plane and region reads hitting the backend.
///
/// Useful for verifying cache behavior and request patterns.
pub struct CountingSource {
    inner: MemorySource,
    plane_reads: AtomicUsize,
    region_reads: AtomicUsize,
}

impl CountingSource {
    pub fn new(inner: MemorySource) -> Self {
        Self {
            inner,
            plane_reads: AtomicUsize::new(0),
            region_reads: AtomicUsize::new(0),
        }
    }

    pub fn plane_reads(&self) -> usize {
        self.plane_reads.load(Ordering::SeqCst)
    }

    pub fn region_reads(&self) -> usize {
        self.region_reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PixelSource for CountingSource {
    fn locator(&self) -> &str {
        self.inner.locator()
    }

    fn series_count(&self) -> usize {
        self.inner.series_count()
    }

    fn geometry(&self, series: usize) -> Option<Geometry> {
        self.inner.geometry(series)
    }

    async fn read_plane(&self, series: usize, plane: usize) -> Result<Bytes, ReadError> {
        self.plane_reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read_plane(series, plane).await
    }

    async fn read_region(
        &self,
        series: usize,
        plane: usize,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> Result<Bytes, ReadError> {
        self.region_reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read_region(series, plane, x, y, width, height).await
    }

    async fn close(&mut self) -> Result<(), CloseError> {
        self.inner.close().await
    }
}
