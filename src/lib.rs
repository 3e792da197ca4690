//! # Stackpipe
//!
//! A conversion engine for very large multi-dimensional scientific images.
//!
//! This library moves pixel data between a format-agnostic [`PixelSource`]
//! and [`PixelSink`] without ever holding more than one plane (or one tile)
//! in memory. It covers the three operations that make terabyte-scale
//! microscopy conversions hard: tiling planes whose dimensions are not
//! multiples of the tile size, synthesizing multi-resolution pyramids from
//! a single full-resolution image, and re-cutting 3D volumes along
//! orthogonal axes.
//!
//! ## Features
//!
//! - **Boundary-safe tiling**: Row-major tile grids with clipped edge tiles,
//!   planned against the tile size the sink actually accepts
//! - **Pyramid synthesis**: Every level derived from the full-resolution
//!   buffer with a cumulative scale factor, registered before any pixel write
//! - **Orthogonal reslicing**: XZ and YZ series assembled strip by strip,
//!   one output plane resident at a time
//! - **Skip-and-continue error policy**: A failed tile or plane is logged and
//!   reported, not fatal; resource failures abort with both handles closed
//! - **Plane caching**: An LRU decorator that serves repeated region reads
//!   from already-fetched planes
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`geometry`] - Image shape, sample layout and plane index arithmetic
//! - [`tile`] - Tile grid planning over plane rectangles
//! - [`scale`] - Integer-factor downsampling of raw sample buffers
//! - [`io`] - Source/sink capability traits and in-memory implementations
//! - [`convert`] - The conversion, pyramid and reslice drivers
//! - [`error`] - Error types for every layer
//!
//! ## Example
//!
//! ```rust,no_run
//! use bytes::Bytes;
//! use stackpipe::convert::{ConvertOptions, Converter};
//! use stackpipe::geometry::{Geometry, PixelType};
//! use stackpipe::io::{MemorySink, MemorySource};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let geometry = Geometry::new(4096, 4096, PixelType::Uint16);
//!     let planes = vec![Bytes::from(vec![0u8; geometry.plane_size_bytes()])];
//!     let mut source = MemorySource::single("mem://acquisition", geometry, planes)?;
//!     let mut sink = MemorySink::single("mem://converted", geometry)?;
//!
//!     let converter = Converter::new(ConvertOptions::new().with_tile_size(256, 256));
//!     let report = converter.run(&mut source, &mut sink).await?;
//!     println!("{} tiles written", report.tiles_written);
//!     Ok(())
//! }
//! ```

pub mod convert;
pub mod error;
pub mod geometry;
pub mod io;
pub mod scale;
pub mod tile;

// Re-export commonly used types
pub use convert::{
    output_geometries, plan_levels, ConversionReport, ConvertOptions, Converter,
    OrthogonalReslicer, PyramidBuilder, PyramidOptions, PyramidReport, ResliceReport,
    ResolutionLevel, SkippedUnit,
};
pub use error::{
    CloseError, ConvertError, DownsampleError, GeometryError, OpenError, PyramidError, ReadError,
    ResliceError, TileGridError, WriteError,
};
pub use geometry::{
    extract_region, scatter_region, DimensionOrder, Geometry, PhysicalSize, PixelType, PlaneLayout,
};
pub use io::{
    CachingSource, MemoryPyramidSink, MemorySink, MemorySource, PixelSink, PixelSource,
    PyramidPixelSink, DEFAULT_PLANE_CACHE_CAPACITY,
};
pub use scale::{Downsampler, ScalingMethod};
pub use tile::{Tile, TileGrid};
