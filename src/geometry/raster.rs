use bytes::{Bytes, BytesMut};

/// Byte layout of one stored plane.
///
/// A plane holds `samples` values per pixel (1 for grayscale, 3 for chunky
/// RGB). Interleaved planes store the samples of one pixel together
/// (RGBRGB...); non-interleaved planes store one full sample sub-plane
/// after another (RR...GG...BB...) inside the same buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneLayout {
    pub width: u32,
    pub height: u32,
    pub samples: u32,
    pub sample_bytes: usize,
    pub interleaved: bool,
}

impl PlaneLayout {
    /// Total byte length of one plane in this layout
    pub fn plane_bytes(&self) -> usize {
        self.width as usize * self.height as usize * self.samples as usize * self.sample_bytes
    }

    /// Byte length of a `width x height` region in this layout
    pub fn region_bytes(&self, width: u32, height: u32) -> usize {
        width as usize * height as usize * self.samples as usize * self.sample_bytes
    }
}

// =============================================================================
// Region Copy Helpers
// =============================================================================
//
// Sub-region extraction and scatter are the only places the engine touches
// raster addressing directly. Callers validate region bounds up front and
// report them as errors; these helpers treat violations as bugs.

/// Copy a rectangular region out of a plane buffer.
///
/// The returned buffer uses the same sample layout as the plane, with the
/// region's own dimensions.
///
/// # Panics
/// Panics if the region extends past the plane edge or if `plane` is
/// shorter than the layout requires.
pub fn extract_region(
    layout: PlaneLayout,
    plane: &[u8],
    x: u32,
    y: u32,
    width: u32,
    height: u32,
) -> Bytes {
    check_region(layout, plane.len(), x, y, width, height);
    let mut out = BytesMut::with_capacity(layout.region_bytes(width, height));
    if layout.interleaved {
        let pixel = layout.samples as usize * layout.sample_bytes;
        let row = layout.width as usize * pixel;
        for r in y..y + height {
            let start = r as usize * row + x as usize * pixel;
            out.extend_from_slice(&plane[start..start + width as usize * pixel]);
        }
    } else {
        let sub_plane = layout.width as usize * layout.height as usize * layout.sample_bytes;
        let row = layout.width as usize * layout.sample_bytes;
        for s in 0..layout.samples as usize {
            let base = s * sub_plane;
            for r in y..y + height {
                let start = base + r as usize * row + x as usize * layout.sample_bytes;
                out.extend_from_slice(&plane[start..start + width as usize * layout.sample_bytes]);
            }
        }
    }
    out.freeze()
}

/// Copy a rectangular region into a plane buffer.
///
/// `region` must use the same sample layout as the plane, with the
/// region's own dimensions (the buffer [`extract_region`] would produce).
///
/// # Panics
/// Panics if the region extends past the plane edge, if `plane` is shorter
/// than the layout requires, or if `region` has the wrong byte length.
pub fn scatter_region(
    layout: PlaneLayout,
    plane: &mut [u8],
    region: &[u8],
    x: u32,
    y: u32,
    width: u32,
    height: u32,
) {
    check_region(layout, plane.len(), x, y, width, height);
    assert_eq!(
        region.len(),
        layout.region_bytes(width, height),
        "region buffer length does not match {}x{}",
        width,
        height
    );
    if layout.interleaved {
        let pixel = layout.samples as usize * layout.sample_bytes;
        let row = layout.width as usize * pixel;
        let region_row = width as usize * pixel;
        for (i, r) in (y..y + height).enumerate() {
            let dst = r as usize * row + x as usize * pixel;
            let src = i * region_row;
            plane[dst..dst + region_row].copy_from_slice(&region[src..src + region_row]);
        }
    } else {
        let sub_plane = layout.width as usize * layout.height as usize * layout.sample_bytes;
        let region_sub_plane = width as usize * height as usize * layout.sample_bytes;
        let row = layout.width as usize * layout.sample_bytes;
        let region_row = width as usize * layout.sample_bytes;
        for s in 0..layout.samples as usize {
            let base = s * sub_plane;
            let region_base = s * region_sub_plane;
            for (i, r) in (y..y + height).enumerate() {
                let dst = base + r as usize * row + x as usize * layout.sample_bytes;
                let src = region_base + i * region_row;
                plane[dst..dst + region_row].copy_from_slice(&region[src..src + region_row]);
            }
        }
    }
}

fn check_region(layout: PlaneLayout, plane_len: usize, x: u32, y: u32, width: u32, height: u32) {
    assert!(
        x as u64 + width as u64 <= layout.width as u64
            && y as u64 + height as u64 <= layout.height as u64,
        "region {}x{} at ({}, {}) exceeds plane {}x{}",
        width,
        height,
        x,
        y,
        layout.width,
        layout.height
    );
    assert!(
        plane_len >= layout.plane_bytes(),
        "plane buffer too short: {} bytes, layout needs {}",
        plane_len,
        layout.plane_bytes()
    );
}
