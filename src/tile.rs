//! Boundary-safe tile planning.
//!
//! A [`TileGrid`] covers a plane with non-overlapping rectangles of a
//! requested size. Planes whose dimensions are not exact multiples of the
//! tile size get a clipped final column and row, so every pixel is
//! covered exactly once and no tile extends past the plane edge.

use serde::{Deserialize, Serialize};

use crate::error::TileGridError;

/// One rectangular region of a plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tile {
    /// Left edge in pixels
    pub x: u32,
    /// Top edge in pixels
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Tile {
    /// Covered area in pixels
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Tiling plan for one plane.
///
/// Tiles are produced lazily in row-major order (left to right, then top
/// to bottom). The plan is deterministic; tiles carry no data dependency
/// on one another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileGrid {
    plane_width: u32,
    plane_height: u32,
    tile_width: u32,
    tile_height: u32,
}

impl TileGrid {
    /// Plan a grid of `tile_width x tile_height` tiles over a plane.
    ///
    /// A tile size larger than the plane yields a single plane-sized
    /// tile.
    ///
    /// # Errors
    /// Returns [`TileGridError::InvalidTileSize`] if either tile
    /// dimension is zero.
    pub fn new(
        plane_width: u32,
        plane_height: u32,
        tile_width: u32,
        tile_height: u32,
    ) -> Result<Self, TileGridError> {
        if tile_width == 0 || tile_height == 0 {
            return Err(TileGridError::InvalidTileSize {
                width: tile_width,
                height: tile_height,
            });
        }
        Ok(Self {
            plane_width,
            plane_height,
            tile_width,
            tile_height,
        })
    }

    /// Number of tile columns
    pub fn tiles_across(&self) -> u32 {
        self.plane_width.div_ceil(self.tile_width)
    }

    /// Number of tile rows
    pub fn tiles_down(&self) -> u32 {
        self.plane_height.div_ceil(self.tile_height)
    }

    /// Total number of tiles in the plan
    pub fn tile_count(&self) -> usize {
        self.tiles_across() as usize * self.tiles_down() as usize
    }

    /// Tile at a grid position, clipped at the plane edge.
    ///
    /// Returns `None` when the position is outside the grid.
    pub fn tile_at(&self, col: u32, row: u32) -> Option<Tile> {
        if col >= self.tiles_across() || row >= self.tiles_down() {
            return None;
        }
        let x = col * self.tile_width;
        let y = row * self.tile_height;
        Some(Tile {
            x,
            y,
            width: (self.plane_width - x).min(self.tile_width),
            height: (self.plane_height - y).min(self.tile_height),
        })
    }

    /// All tiles in row-major order
    pub fn tiles(&self) -> impl Iterator<Item = Tile> {
        let grid = *self;
        (0..grid.tiles_down())
            .flat_map(move |row| (0..grid.tiles_across()).filter_map(move |col| grid.tile_at(col, row)))
    }
}
