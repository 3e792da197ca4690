//! Plane-granular read cache.
//!
//! [`CachingSource`] wraps any [`PixelSource`] with an LRU cache of whole
//! planes, bounded by total byte size. Region reads are served by slicing
//! the cached plane, so access patterns that revisit a plane (repeated
//! tiles, orthogonal reslicing) hit the backing source once per plane
//! instead of once per region.
//!
//! The sweet spot is a working set of planes that fits the byte budget;
//! with reslicing that means one axis' worth of planes. A plane larger
//! than the whole budget is still served but never retained.

use std::num::NonZeroUsize;

use async_trait::async_trait;
use bytes::Bytes;
use lru::LruCache;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{CloseError, ReadError};
use crate::geometry::{extract_region, Geometry};
use crate::io::PixelSource;

/// Default cache capacity: 512MB
pub const DEFAULT_PLANE_CACHE_CAPACITY: usize = 512 * 1024 * 1024;

/// Default maximum number of cached planes (to bound LRU overhead)
const DEFAULT_MAX_ENTRIES: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PlaneKey {
    series: usize,
    plane: usize,
}

/// Read-through plane cache over another pixel source.
///
/// The decorator is transparent: locator, series and geometries come from
/// the wrapped source, and closing the decorator closes it.
pub struct CachingSource<S> {
    inner: S,

    /// Cached planes keyed by (series, plane)
    cache: RwLock<LruCache<PlaneKey, Bytes>>,

    /// Maximum total size in bytes
    max_size: usize,

    /// Current total size in bytes
    current_size: RwLock<usize>,
}

impl<S: PixelSource> CachingSource<S> {
    /// Wrap a source with the default capacity (512MB).
    pub fn new(inner: S) -> Self {
        Self::with_capacity(inner, DEFAULT_PLANE_CACHE_CAPACITY)
    }

    /// Wrap a source with the specified capacity in bytes.
    pub fn with_capacity(inner: S, max_size: usize) -> Self {
        Self::with_capacity_and_entries(inner, max_size, DEFAULT_MAX_ENTRIES)
    }

    /// Wrap a source with specified capacity and maximum entry count.
    pub fn with_capacity_and_entries(inner: S, max_size: usize, max_entries: usize) -> Self {
        Self {
            inner,
            cache: RwLock::new(LruCache::new(
                NonZeroUsize::new(max_entries.max(1)).unwrap_or(NonZeroUsize::MIN),
            )),
            max_size,
            current_size: RwLock::new(0),
        }
    }

    /// The wrapped source.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Unwrap, dropping all cached planes.
    pub fn into_inner(self) -> S {
        self.inner
    }

    /// Number of planes currently cached.
    pub async fn cached_planes(&self) -> usize {
        self.cache.read().await.len()
    }

    /// Total bytes currently cached.
    pub async fn cached_bytes(&self) -> usize {
        *self.current_size.read().await
    }

    /// Maximum capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.max_size
    }

    /// Check whether one plane is cached, without touching LRU order.
    pub async fn contains(&self, series: usize, plane: usize) -> bool {
        self.cache.read().await.contains(&PlaneKey { series, plane })
    }

    /// Drop every cached plane.
    pub async fn clear(&self) {
        let mut cache = self.cache.write().await;
        let mut current_size = self.current_size.write().await;
        cache.clear();
        *current_size = 0;
    }

    async fn fetch_plane(&self, series: usize, plane: usize) -> Result<Bytes, ReadError> {
        let key = PlaneKey { series, plane };
        {
            let mut cache = self.cache.write().await;
            if let Some(data) = cache.get(&key) {
                debug!(series = series, plane = plane, "Plane cache hit");
                return Ok(data.clone());
            }
        }
        let data = self.inner.read_plane(series, plane).await?;
        debug!(
            series = series,
            plane = plane,
            bytes = data.len(),
            "Plane cache miss, loaded from source"
        );
        self.insert(key, data.clone()).await;
        Ok(data)
    }

    async fn insert(&self, key: PlaneKey, data: Bytes) {
        let data_size = data.len();
        let mut cache = self.cache.write().await;
        let mut current_size = self.current_size.write().await;

        // If key exists, subtract old size first
        if let Some(old_data) = cache.peek(&key) {
            *current_size = current_size.saturating_sub(old_data.len());
        }

        cache.put(key, data);
        *current_size += data_size;

        // Evict entries until we're under capacity
        while *current_size > self.max_size {
            if let Some((_, evicted)) = cache.pop_lru() {
                *current_size = current_size.saturating_sub(evicted.len());
            } else {
                break;
            }
        }
    }
}

#[async_trait]
impl<S: PixelSource> PixelSource for CachingSource<S> {
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
        self.fetch_plane(series, plane).await
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
        let Some(g) = self.inner.geometry(series) else {
            // unknown series: let the inner source report its own error
            return self
                .inner
                .read_region(series, plane, x, y, width, height)
                .await;
        };
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
        let data = self.fetch_plane(series, plane).await?;
        Ok(extract_region(g.plane_layout(), &data, x, y, width, height))
    }

    async fn close(&mut self) -> Result<(), CloseError> {
        self.clear().await;
        self.inner.close().await
    }
}
