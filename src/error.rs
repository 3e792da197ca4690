use thiserror::Error;

/// Errors describing an inconsistent image geometry
#[derive(Debug, Clone, Error)]
pub enum GeometryError {
    /// A dimensional extent is zero
    #[error("Zero-sized dimension: {dimension} must be at least 1")]
    ZeroDimension { dimension: &'static str },

    /// More samples per pixel than total channels
    #[error("RGB channel count {rgb_channel_count} exceeds channel count {channels}")]
    RgbExceedsChannels {
        rgb_channel_count: u32,
        channels: u32,
    },

    /// Channels do not divide evenly into per-pixel sample groups
    #[error("Channel count {channels} is not a multiple of RGB channel count {rgb_channel_count}")]
    UnevenChannelGroups {
        channels: u32,
        rgb_channel_count: u32,
    },
}

/// Errors constructing a tile grid
#[derive(Debug, Clone, Error)]
pub enum TileGridError {
    /// Requested tile dimensions are unusable
    #[error("Invalid tile size: {width}x{height} (both dimensions must be at least 1)")]
    InvalidTileSize { width: u32, height: u32 },
}

/// Errors reducing a plane to a lower resolution
#[derive(Debug, Clone, Error)]
pub enum DownsampleError {
    /// Scale factor must be at least 1
    #[error("Invalid scale factor: {factor}")]
    InvalidScaleFactor { factor: u64 },

    /// Source buffer length does not match the declared layout
    #[error("Buffer size mismatch: expected {expected} bytes for a {width}x{height} plane, got {actual}")]
    BufferSizeMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}

/// Errors opening a pixel source or sink. Always fatal: nothing was
/// converted.
#[derive(Debug, Clone, Error)]
pub enum OpenError {
    /// The locator does not name a usable resource
    #[error("Cannot open {locator}: {reason}")]
    Locator { locator: String, reason: String },

    /// A series geometry fails validation
    #[error("Invalid geometry for series {series}: {source}")]
    Geometry {
        series: usize,
        #[source]
        source: GeometryError,
    },

    /// Provided plane data does not match the declared geometry
    #[error("Series {series} expects {expected} planes, got {actual}")]
    PlaneCount {
        series: usize,
        expected: usize,
        actual: usize,
    },

    /// One provided plane buffer has the wrong byte length
    #[error("Series {series} plane {plane}: expected {expected} bytes, got {actual}")]
    PlaneSize {
        series: usize,
        plane: usize,
        expected: usize,
        actual: usize,
    },
}

/// Errors reading pixel data from a source
#[derive(Debug, Clone, Error)]
pub enum ReadError {
    /// Series index beyond the source's series count
    #[error("Series {series} out of range: source has {count} series")]
    SeriesOutOfRange { series: usize, count: usize },

    /// Plane index beyond the series' plane count
    #[error("Plane {plane} out of range for series {series}: {count} planes")]
    PlaneOutOfRange {
        series: usize,
        plane: usize,
        count: usize,
    },

    /// Requested rectangle extends past the plane edge
    #[error("Region out of bounds: {width}x{height} at ({x}, {y}) exceeds plane {plane_width}x{plane_height}")]
    RegionOutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        plane_width: u32,
        plane_height: u32,
    },

    /// The source was already closed
    #[error("Source is closed")]
    Closed,

    /// Backend-specific failure (storage, decode, transport)
    #[error("Read failed: {0}")]
    Backend(String),
}

/// Errors writing pixel data to a sink
#[derive(Debug, Clone, Error)]
pub enum WriteError {
    /// The sink does not accept this series index
    #[error("Series mismatch: sink has {available} series, got series {series}")]
    SeriesMismatch { series: usize, available: usize },

    /// Plane index beyond the series' plane count
    #[error("Plane {plane} out of range for series {series}: {count} planes")]
    PlaneOutOfRange {
        series: usize,
        plane: usize,
        count: usize,
    },

    /// Target rectangle extends past the plane edge
    #[error("Region out of bounds: {width}x{height} at ({x}, {y}) exceeds plane {plane_width}x{plane_height}")]
    RegionOutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        plane_width: u32,
        plane_height: u32,
    },

    /// Buffer length does not match the target plane or region
    #[error("Buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    /// Write to a resolution level that was never registered
    #[error("Resolution level {level} is not registered")]
    UnregisteredLevel { level: u32 },

    /// Levels must be registered contiguously in increasing order
    #[error("Level {level} registered out of order: expected level {expected}")]
    LevelOrder { level: u32, expected: u32 },

    /// Level registration attempted after pixel data was written
    #[error("Cannot register level {level}: pixel data already written")]
    LateRegistration { level: u32 },

    /// The sink was already closed
    #[error("Sink is closed")]
    Closed,

    /// Backend-specific failure (storage, encode, transport)
    #[error("Write failed: {0}")]
    Backend(String),
}

/// Failure releasing a source or sink
#[derive(Debug, Clone, Error)]
#[error("Close failed for {locator}: {reason}")]
pub struct CloseError {
    pub locator: String,
    pub reason: String,
}

/// Fatal errors aborting a conversion run.
///
/// Per-unit read and write failures are not listed here: the driver logs
/// them, records them in the report and continues.
#[derive(Debug, Clone, Error)]
pub enum ConvertError {
    /// Requested or effective tile size is unusable
    #[error(transparent)]
    TileGrid(#[from] TileGridError),

    /// Source reports a series without a geometry
    #[error("No geometry for series {series}")]
    MissingGeometry { series: usize },

    /// A read returned the wrong number of bytes
    #[error("Series {series} plane {plane}: expected {expected} bytes, got {actual}")]
    BufferSizeMismatch {
        series: usize,
        plane: usize,
        expected: usize,
        actual: usize,
    },

    /// Source close failed after a successful run
    #[error("Source close failed: {0}")]
    SourceClose(#[source] CloseError),

    /// Sink close failed after a successful run
    #[error("Sink close failed: {0}")]
    SinkClose(#[source] CloseError),
}

/// Fatal errors aborting pyramid generation
#[derive(Debug, Clone, Error)]
pub enum PyramidError {
    /// Scale factor must be at least 2
    #[error("Invalid scale factor: {factor} (must be at least 2)")]
    InvalidScaleFactor { factor: u32 },

    /// Level count must be at least 1
    #[error("Invalid level count: {count} (must be at least 1)")]
    InvalidLevelCount { count: u32 },

    /// Source reports a series without a geometry
    #[error("No geometry for series {series}")]
    MissingGeometry { series: usize },

    /// The sink's full-resolution level does not match the source
    #[error(
        "Sink level 0 is {sink_width}x{sink_height}, source is {source_width}x{source_height}"
    )]
    SinkGeometry {
        sink_width: u32,
        sink_height: u32,
        source_width: u32,
        source_height: u32,
    },

    /// The full-resolution read failed; no level can be derived
    #[error("Base plane read failed for series {series} plane {plane}: {source}")]
    BaseRead {
        series: usize,
        plane: usize,
        #[source]
        source: ReadError,
    },

    /// The base plane buffer has the wrong byte length
    #[error("Base plane {plane}: expected {expected} bytes, got {actual}")]
    BufferSizeMismatch {
        plane: usize,
        expected: usize,
        actual: usize,
    },

    /// Level registration failed; metadata-then-data ordering cannot be met
    #[error("Cannot register level {level}: {source}")]
    RegisterLevel {
        level: u32,
        #[source]
        source: WriteError,
    },

    /// Downsampling failed
    #[error(transparent)]
    Downsample(#[from] DownsampleError),

    /// Source close failed after a successful run
    #[error("Source close failed: {0}")]
    SourceClose(#[source] CloseError),

    /// Sink close failed after a successful run
    #[error("Sink close failed: {0}")]
    SinkClose(#[source] CloseError),
}

/// Fatal errors aborting an orthogonal reslice.
///
/// Unlike conversion, strip failures are not skippable: a missing strip
/// would leave a hole in every reassembled plane.
#[derive(Debug, Clone, Error)]
pub enum ResliceError {
    /// Source reports a series without a geometry
    #[error("No geometry for series {series}")]
    MissingGeometry { series: usize },

    /// Multi-sample pixels cannot be resliced
    #[error("Unsupported geometry: RGB channel count {rgb_channel_count} (reslicing requires single-sample pixels)")]
    UnsupportedGeometry { rgb_channel_count: u32 },

    /// The sink lacks the two output series
    #[error("Sink must expose 2 series for XZ and YZ output, found {found}")]
    SinkSeries { found: usize },

    /// A sink series shape does not match the resliced output
    #[error("Sink geometry for series {series} does not match the resliced output")]
    SinkGeometry { series: usize },

    /// A strip read failed
    #[error("Strip read failed at z {z} for output plane {output_plane}: {source}")]
    StripRead {
        output_plane: usize,
        z: u32,
        #[source]
        source: ReadError,
    },

    /// A reassembled plane write failed
    #[error("Plane write failed for series {series} plane {plane}: {source}")]
    PlaneWrite {
        series: usize,
        plane: usize,
        #[source]
        source: WriteError,
    },

    /// A strip buffer has the wrong byte length
    #[error("Strip buffer mismatch: expected {expected} bytes, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    /// Source close failed after a successful run
    #[error("Source close failed: {0}")]
    SourceClose(#[source] CloseError),

    /// Sink close failed after a successful run
    #[error("Sink close failed: {0}")]
    SinkClose(#[source] CloseError),
}
