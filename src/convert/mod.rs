//! Conversion drivers.
//!
//! Three orchestrators cover the transfer shapes the crate supports:
//!
//! - [`Converter`] moves every series of a source into a sink, whole
//!   planes or bounded tiles at a time.
//! - [`PyramidBuilder`] derives a multi-resolution pyramid from a
//!   full-resolution image and writes it to a pyramid-capable sink.
//! - [`OrthogonalReslicer`] re-cuts a Z stack into XZ and YZ series.
//!
//! All three follow the same resource discipline: the source and sink
//! are borrowed for the duration of one run and closed on every exit
//! path, and each run returns a report of what was written and what had
//! to be skipped.

mod driver;
mod pyramid;
mod reslice;

pub use driver::{ConversionReport, ConvertOptions, Converter, SkippedUnit};
pub use pyramid::{plan_levels, PyramidBuilder, PyramidOptions, PyramidReport, ResolutionLevel};
pub use reslice::{output_geometries, OrthogonalReslicer, ResliceReport};

use crate::geometry::Geometry;

/// Shape agreement the drivers require between a source series and the
/// sink series receiving it. Calibration and dimension order are free
/// to differ; pixel extents and byte layout are not.
pub(crate) fn same_shape(a: &Geometry, b: &Geometry) -> bool {
    a.width == b.width
        && a.height == b.height
        && a.plane_count() == b.plane_count()
        && a.plane_size_bytes() == b.plane_size_bytes()
}
