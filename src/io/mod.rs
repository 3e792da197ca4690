//! Pixel transport: the source and sink capability traits, in-memory
//! implementations of both, and the plane-granular read cache.
//!
//! Everything that opens, parses or encodes a container format lives
//! behind [`PixelSource`] and [`PixelSink`]; the drivers in
//! [`crate::convert`] only ever see these traits.

mod memory;
mod plane_cache;
mod sink;
mod source;

pub use memory::{MemoryPyramidSink, MemorySink, MemorySource};
pub use plane_cache::{CachingSource, DEFAULT_PLANE_CACHE_CAPACITY};
pub use sink::{PixelSink, PyramidPixelSink};
pub use source::PixelSource;
