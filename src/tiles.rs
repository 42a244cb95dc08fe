// tiles.rs — Partitioning the image into tiles and building their mappings.
//
// Cell size is floor-divided:
//
//   cell_height = H / rows      cell_width = W / cols
//
// so a 130×130 scan on a 4×4 grid gets 32×32 cells covering the top-left
// 128×128 pixels. The two leftover rows and columns at the bottom/right
// belong to no tile; the interpolator still reaches them by extrapolating
// from the last tile pair.
//
//   ┌────┬────┬────┬────┬─┐
//   │ 00 │ 01 │ 02 │ 03 │ │
//   ├────┼────┼────┼────┤ │
//   │ 10 │ 11 │ 12 │ 13 │ │   rows×cols tiles, each cell_height×cell_width
//   ├────┼────┼────┼────┤ │
//   │ 20 │ 21 │ 22 │ 23 │ │
//   ├────┼────┼────┼────┤ │
//   │ 30 │ 31 │ 32 │ 33 │ │
//   ├────┴────┴────┴────┘ │
//   └─────────────────────┘   ← remainder, not part of any tile
//
// Each tile reads a disjoint region of the input and writes its own slot,
// so tiles are built on the rayon pool with no synchronization.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{ClaheError, Result};
use crate::histogram::{ClipLimit, Histogram};
use crate::image::Image;
use crate::mapping::Mapping;
use crate::PARALLEL_THRESHOLD;

/// Requested tile grid: `rows` tiles vertically, `cols` horizontally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSpec {
    pub rows: usize,
    pub cols: usize,
}

impl GridSpec {
    pub const fn new(rows: usize, cols: usize) -> Self {
        GridSpec { rows, cols }
    }

    /// Reject grids smaller than 2×2.
    pub fn validate(&self) -> Result<()> {
        if self.rows < 2 || self.cols < 2 {
            return Err(ClaheError::InvalidGrid {
                rows: self.rows,
                cols: self.cols,
            });
        }
        Ok(())
    }

    /// Resolve cell sizes for a `width`×`height` image.
    ///
    /// Fails if the grid is invalid, the image is empty, or a cell would be
    /// zero pixels tall or wide.
    pub fn geometry(&self, width: usize, height: usize) -> Result<TileGeometry> {
        self.validate()?;
        if width == 0 || height == 0 {
            return Err(ClaheError::EmptyImage { width, height });
        }
        if self.rows > height || self.cols > width {
            return Err(ClaheError::GridExceedsImage {
                rows: self.rows,
                cols: self.cols,
                width,
                height,
            });
        }
        Ok(TileGeometry {
            rows: self.rows,
            cols: self.cols,
            cell_height: height / self.rows,
            cell_width: width / self.cols,
            width,
            height,
        })
    }
}

impl Default for GridSpec {
    fn default() -> Self {
        GridSpec::new(4, 4)
    }
}

/// Grid resolved against concrete image dimensions.
///
/// Only obtainable through [`GridSpec::geometry`], so `rows, cols >= 2` and
/// both cell sizes are non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGeometry {
    rows: usize,
    cols: usize,
    cell_height: usize,
    cell_width: usize,
    width: usize,
    height: usize,
}

impl TileGeometry {
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn cell_height(&self) -> usize {
        self.cell_height
    }

    #[inline]
    pub fn cell_width(&self) -> usize {
        self.cell_width
    }

    /// `(width, height)` of the image this geometry was resolved for.
    #[inline]
    pub fn image_dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Pixels per tile.
    #[inline]
    pub fn block_size(&self) -> u64 {
        (self.cell_height * self.cell_width) as u64
    }

    /// Top-left pixel `(x, y)` of tile `(row, col)`.
    #[inline]
    pub fn tile_origin(&self, row: usize, col: usize) -> (usize, usize) {
        (col * self.cell_width, row * self.cell_height)
    }

    /// Image rows/columns not covered by any tile: `(right, bottom)`.
    pub fn remainder(&self) -> (usize, usize) {
        (
            self.width - self.cols * self.cell_width,
            self.height - self.rows * self.cell_height,
        )
    }
}

/// One mapping per tile, row-major, plus the geometry they were built for.
#[derive(Debug, Clone)]
pub struct TileMappingGrid {
    geometry: TileGeometry,
    mappings: Vec<Mapping>,
    uniform_tiles: usize,
}

impl TileMappingGrid {
    /// Build every tile's mapping: histogram → clip → CDF table.
    ///
    /// A tile holding a single intensity is left unequalized (identity).
    /// Checking the raw histogram matters: once clipped, the excess is
    /// spread over all 256 bins and the tile no longer looks flat.
    ///
    /// The caller guarantees `geometry` was resolved for `image`.
    pub fn build(image: &Image<u8>, geometry: TileGeometry, clip_limit: ClipLimit) -> Self {
        debug_assert_eq!(geometry.image_dimensions(), image.dimensions());

        let tile_count = geometry.rows * geometry.cols;
        let build_tile = |index: usize| -> (Mapping, bool) {
            let (row, col) = (index / geometry.cols, index % geometry.cols);
            let (x0, y0) = geometry.tile_origin(row, col);
            let view = image.sub_image(x0, y0, geometry.cell_width, geometry.cell_height);
            let hist = Histogram::from_view(&view);

            if let Some(v) = hist.single_intensity() {
                log::trace!("tile ({row}, {col}) uniform at {v}, identity mapping");
                return (Mapping::identity(), true);
            }

            let clipped = hist.clip(clip_limit);
            log::trace!(
                "tile ({row}, {col}) {} levels, {} after clip",
                hist.occupied_bins(),
                clipped.occupied_bins()
            );
            (Mapping::from_histogram(&clipped, geometry.block_size()), false)
        };

        let tiles: Vec<(Mapping, bool)> = if image.len() >= PARALLEL_THRESHOLD {
            (0..tile_count).into_par_iter().map(build_tile).collect()
        } else {
            (0..tile_count).map(build_tile).collect()
        };

        let uniform_tiles = tiles.iter().filter(|(_, uniform)| *uniform).count();
        let mappings = tiles.into_iter().map(|(m, _)| m).collect();

        TileMappingGrid {
            geometry,
            mappings,
            uniform_tiles,
        }
    }

    /// Assemble a grid from precomputed mappings, row-major.
    ///
    /// # Panics
    /// Panics if `mappings.len() != rows * cols`.
    pub fn from_mappings(geometry: TileGeometry, mappings: Vec<Mapping>) -> Self {
        assert_eq!(
            mappings.len(),
            geometry.rows * geometry.cols,
            "expected {} tile mappings, got {}",
            geometry.rows * geometry.cols,
            mappings.len()
        );
        TileMappingGrid {
            geometry,
            mappings,
            uniform_tiles: 0,
        }
    }

    #[inline]
    pub fn geometry(&self) -> &TileGeometry {
        &self.geometry
    }

    /// Mapping of tile `(row, col)`.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> &Mapping {
        &self.mappings[row * self.geometry.cols + col]
    }

    /// All mappings, row-major.
    pub fn mappings(&self) -> &[Mapping] {
        &self.mappings
    }

    /// How many tiles were single-intensity and left unequalized.
    pub fn uniform_tiles(&self) -> usize {
        self.uniform_tiles
    }
}
