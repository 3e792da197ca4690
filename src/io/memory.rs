//! In-memory pixel sources and sinks.
//!
//! These implementations keep every plane resident as a byte buffer. They
//! serve three purposes: converting images that already live in memory,
//! capturing conversion output for inspection, and exercising drivers in
//! tests without touching any container format.
//!
//! [`MemorySink`] can emulate a container's tiling constraint: with a
//! tile granularity set, [`PixelSink::effective_tile_size`] rounds
//! requested tile sizes to the nearest granule, the way TIFF writers
//! round to multiples of 16.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{CloseError, OpenError, ReadError, WriteError};
use crate::geometry::{extract_region, scatter_region, Geometry};
use crate::io::{PixelSink, PixelSource, PyramidPixelSink};

// =============================================================================
// MemorySource
// =============================================================================

#[derive(Debug)]
struct SourceSeries {
    geometry: Geometry,
    planes: Vec<Bytes>,
}

/// Pixel source backed by fully materialized planes.
#[derive(Debug)]
pub struct MemorySource {
    locator: String,
    series: Vec<SourceSeries>,
    closed: bool,
}

impl MemorySource {
    /// Open a source over one or more series.
    ///
    /// Each series is a geometry plus its planes in linear plane order.
    ///
    /// # Errors
    /// Fails when no series is given, a geometry is invalid, or the
    /// planes of a series do not match its geometry in count or byte
    /// length.
    pub fn open(
        locator: impl Into<String>,
        series: Vec<(Geometry, Vec<Bytes>)>,
    ) -> Result<Self, OpenError> {
        let locator = locator.into();
        if series.is_empty() {
            return Err(OpenError::Locator {
                locator,
                reason: "no series provided".to_string(),
            });
        }
        let mut validated = Vec::with_capacity(series.len());
        for (index, (geometry, planes)) in series.into_iter().enumerate() {
            geometry
                .validate()
                .map_err(|source| OpenError::Geometry {
                    series: index,
                    source,
                })?;
            if planes.len() != geometry.plane_count() {
                return Err(OpenError::PlaneCount {
                    series: index,
                    expected: geometry.plane_count(),
                    actual: planes.len(),
                });
            }
            let expected = geometry.plane_size_bytes();
            for (plane, data) in planes.iter().enumerate() {
                if data.len() != expected {
                    return Err(OpenError::PlaneSize {
                        series: index,
                        plane,
                        expected,
                        actual: data.len(),
                    });
                }
            }
            validated.push(SourceSeries { geometry, planes });
        }
        Ok(Self {
            locator,
            series: validated,
            closed: false,
        })
    }

    /// Open a single-series source.
    pub fn single(
        locator: impl Into<String>,
        geometry: Geometry,
        planes: Vec<Bytes>,
    ) -> Result<Self, OpenError> {
        Self::open(locator, vec![(geometry, planes)])
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

#[async_trait]
impl PixelSource for MemorySource {
    fn locator(&self) -> &str {
        &self.locator
    }

    fn series_count(&self) -> usize {
        self.series.len()
    }

    fn geometry(&self, series: usize) -> Option<Geometry> {
        self.series.get(series).map(|s| s.geometry)
    }

    async fn read_plane(&self, series: usize, plane: usize) -> Result<Bytes, ReadError> {
        if self.closed {
            return Err(ReadError::Closed);
        }
        let s = self
            .series
            .get(series)
            .ok_or(ReadError::SeriesOutOfRange {
                series,
                count: self.series.len(),
            })?;
        s.planes
            .get(plane)
            .cloned()
            .ok_or(ReadError::PlaneOutOfRange {
                series,
                plane,
                count: s.planes.len(),
            })
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
        if self.closed {
            return Err(ReadError::Closed);
        }
        let s = self
            .series
            .get(series)
            .ok_or(ReadError::SeriesOutOfRange {
                series,
                count: self.series.len(),
            })?;
        let data = s.planes.get(plane).ok_or(ReadError::PlaneOutOfRange {
            series,
            plane,
            count: s.planes.len(),
        })?;
        let g = s.geometry;
        if x as u64 + width as u64 > g.width as u64 || y as u64 + height as u64 > g.height as u64 {
            return Err(ReadError::RegionOutOfBounds {
                x,
                y,
                width,
                height,
                plane_width: g.width,
                plane_height: g.height,
            });
        }
        Ok(extract_region(g.plane_layout(), data, x, y, width, height))
    }

    async fn close(&mut self) -> Result<(), CloseError> {
        self.closed = true;
        Ok(())
    }
}

// =============================================================================
// MemorySink
// =============================================================================

struct SinkSeries {
    geometry: Geometry,
    planes: Vec<Vec<u8>>,
}

impl SinkSeries {
    fn new(geometry: Geometry) -> Self {
        let planes = vec![vec![0u8; geometry.plane_size_bytes()]; geometry.plane_count()];
        Self { geometry, planes }
    }
}

/// Pixel sink capturing written planes for later inspection.
///
/// Plane buffers are zero-filled at open; region writes fill them piece
/// by piece.
pub struct MemorySink {
    locator: String,
    series: Vec<SinkSeries>,
    tile_granularity: Option<u32>,
    closed: bool,
}

impl MemorySink {
    /// Open a sink accepting the given series geometries.
    ///
    /// # Errors
    /// Fails when no geometry is given or one of them is invalid.
    pub fn open(
        locator: impl Into<String>,
        geometries: Vec<Geometry>,
    ) -> Result<Self, OpenError> {
        let locator = locator.into();
        if geometries.is_empty() {
            return Err(OpenError::Locator {
                locator,
                reason: "no series geometry provided".to_string(),
            });
        }
        let mut series = Vec::with_capacity(geometries.len());
        for (index, geometry) in geometries.into_iter().enumerate() {
            geometry
                .validate()
                .map_err(|source| OpenError::Geometry {
                    series: index,
                    source,
                })?;
            series.push(SinkSeries::new(geometry));
        }
        Ok(Self {
            locator,
            series,
            tile_granularity: None,
            closed: false,
        })
    }

    /// Open a single-series sink.
    pub fn single(locator: impl Into<String>, geometry: Geometry) -> Result<Self, OpenError> {
        Self::open(locator, vec![geometry])
    }

    /// Round effective tile sizes to multiples of `granularity`, the way
    /// tiled container writers constrain tile dimensions.
    ///
    /// # Panics
    /// Panics if `granularity` is zero.
    pub fn with_tile_granularity(mut self, granularity: u32) -> Self {
        assert!(granularity > 0, "tile granularity must be at least 1");
        self.tile_granularity = Some(granularity);
        self
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Bytes written to one plane, for inspection after a run.
    ///
    /// Remains readable after the sink is closed.
    pub fn plane_data(&self, series: usize, plane: usize) -> Option<&[u8]> {
        self.series
            .get(series)
            .and_then(|s| s.planes.get(plane))
            .map(|p| p.as_slice())
    }
}

fn round_to_granule(dim: u32, granule: u32) -> u32 {
    let rounded = (dim + granule / 2) / granule * granule;
    rounded.max(granule)
}

#[async_trait]
impl PixelSink for MemorySink {
    fn locator(&self) -> &str {
        &self.locator
    }

    fn series_count(&self) -> usize {
        self.series.len()
    }

    fn geometry(&self, series: usize) -> Option<Geometry> {
        self.series.get(series).map(|s| s.geometry)
    }

    fn effective_tile_size(&self, width: u32, height: u32) -> (u32, u32) {
        match self.tile_granularity {
            Some(g) => (round_to_granule(width, g), round_to_granule(height, g)),
            None => (width, height),
        }
    }

    async fn write_plane(
        &mut self,
        series: usize,
        plane: usize,
        data: Bytes,
    ) -> Result<(), WriteError> {
        if self.closed {
            return Err(WriteError::Closed);
        }
        let available = self.series.len();
        let s = self
            .series
            .get_mut(series)
            .ok_or(WriteError::SeriesMismatch { series, available })?;
        let expected = s.geometry.plane_size_bytes();
        if data.len() != expected {
            return Err(WriteError::BufferSizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        let count = s.planes.len();
        let target = s
            .planes
            .get_mut(plane)
            .ok_or(WriteError::PlaneOutOfRange {
                series,
                plane,
                count,
            })?;
        target.copy_from_slice(&data);
        Ok(())
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
        if self.closed {
            return Err(WriteError::Closed);
        }
        let available = self.series.len();
        let s = self
            .series
            .get_mut(series)
            .ok_or(WriteError::SeriesMismatch { series, available })?;
        let g = s.geometry;
        if x as u64 + width as u64 > g.width as u64 || y as u64 + height as u64 > g.height as u64 {
            return Err(WriteError::RegionOutOfBounds {
                x,
                y,
                width,
                height,
                plane_width: g.width,
                plane_height: g.height,
            });
        }
        let expected = g.region_size_bytes(width, height);
        if data.len() != expected {
            return Err(WriteError::BufferSizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        let count = s.planes.len();
        let target = s
            .planes
            .get_mut(plane)
            .ok_or(WriteError::PlaneOutOfRange {
                series,
                plane,
                count,
            })?;
        scatter_region(g.plane_layout(), target, &data, x, y, width, height);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), CloseError> {
        self.closed = true;
        Ok(())
    }
}

// =============================================================================
// MemoryPyramidSink
// =============================================================================

struct LevelStore {
    geometry: Geometry,
    planes: Vec<Vec<u8>>,
}

impl LevelStore {
    fn new(geometry: Geometry) -> Self {
        let planes = vec![vec![0u8; geometry.plane_size_bytes()]; geometry.plane_count()];
        Self { geometry, planes }
    }
}

/// Pyramid sink capturing every resolution level in memory.
///
/// Opened with the full-resolution geometry as level 0. Further levels
/// register in increasing order; the first pixel write seals
/// registration.
pub struct MemoryPyramidSink {
    locator: String,
    levels: Vec<LevelStore>,
    data_written: bool,
    closed: bool,
}

impl MemoryPyramidSink {
    /// Open a pyramid sink with the level-0 geometry.
    pub fn open(locator: impl Into<String>, base: Geometry) -> Result<Self, OpenError> {
        base.validate().map_err(|source| OpenError::Geometry {
            series: 0,
            source,
        })?;
        Ok(Self {
            locator: locator.into(),
            levels: vec![LevelStore::new(base)],
            data_written: false,
            closed: false,
        })
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Bytes written to one plane of one level, for inspection after a
    /// run.
    pub fn level_plane_data(&self, level: u32, plane: usize) -> Option<&[u8]> {
        self.levels
            .get(level as usize)
            .and_then(|l| l.planes.get(plane))
            .map(|p| p.as_slice())
    }
}

#[async_trait]
impl PixelSink for MemoryPyramidSink {
    fn locator(&self) -> &str {
        &self.locator
    }

    fn series_count(&self) -> usize {
        1
    }

    fn geometry(&self, series: usize) -> Option<Geometry> {
        if series == 0 {
            Some(self.levels[0].geometry)
        } else {
            None
        }
    }

    async fn write_plane(
        &mut self,
        series: usize,
        plane: usize,
        data: Bytes,
    ) -> Result<(), WriteError> {
        if series != 0 {
            return Err(WriteError::SeriesMismatch {
                series,
                available: 1,
            });
        }
        self.write_level_plane(0, plane, data).await
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
        if self.closed {
            return Err(WriteError::Closed);
        }
        if series != 0 {
            return Err(WriteError::SeriesMismatch {
                series,
                available: 1,
            });
        }
        let g = self.levels[0].geometry;
        if x as u64 + width as u64 > g.width as u64 || y as u64 + height as u64 > g.height as u64 {
            return Err(WriteError::RegionOutOfBounds {
                x,
                y,
                width,
                height,
                plane_width: g.width,
                plane_height: g.height,
            });
        }
        let expected = g.region_size_bytes(width, height);
        if data.len() != expected {
            return Err(WriteError::BufferSizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        let count = self.levels[0].planes.len();
        let target =
            self.levels[0]
                .planes
                .get_mut(plane)
                .ok_or(WriteError::PlaneOutOfRange {
                    series: 0,
                    plane,
                    count,
                })?;
        scatter_region(g.plane_layout(), target, &data, x, y, width, height);
        self.data_written = true;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), CloseError> {
        self.closed = true;
        Ok(())
    }
}

#[async_trait]
impl PyramidPixelSink for MemoryPyramidSink {
    fn register_level(&mut self, level: u32, geometry: Geometry) -> Result<(), WriteError> {
        if self.closed {
            return Err(WriteError::Closed);
        }
        if self.data_written {
            return Err(WriteError::LateRegistration { level });
        }
        let expected = self.levels.len() as u32;
        if level != expected {
            return Err(WriteError::LevelOrder { level, expected });
        }
        geometry
            .validate()
            .map_err(|e| WriteError::Backend(e.to_string()))?;
        self.levels.push(LevelStore::new(geometry));
        Ok(())
    }

    fn level_count(&self) -> usize {
        self.levels.len()
    }

    fn level_geometry(&self, level: u32) -> Option<Geometry> {
        self.levels.get(level as usize).map(|l| l.geometry)
    }

    async fn write_level_plane(
        &mut self,
        level: u32,
        plane: usize,
        data: Bytes,
    ) -> Result<(), WriteError> {
        if self.closed {
            return Err(WriteError::Closed);
        }
        let store = self
            .levels
            .get_mut(level as usize)
            .ok_or(WriteError::UnregisteredLevel { level })?;
        let expected = store.geometry.plane_size_bytes();
        if data.len() != expected {
            return Err(WriteError::BufferSizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        let count = store.planes.len();
        let target = store
            .planes
            .get_mut(plane)
            .ok_or(WriteError::PlaneOutOfRange {
                series: 0,
                plane,
                count,
            })?;
        target.copy_from_slice(&data);
        self.data_written = true;
        Ok(())
    }
}
