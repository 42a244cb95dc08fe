// clahe.rs — Contrast Limited Adaptive Histogram Equalization, end to end.
//
//   Image<u8> ──► TileMappingGrid::build ──► interpolate::reconstruct ──► Image<u8>
//                 (histogram → clip → CDF       (bilinear blend of the
//                  per tile, in parallel)        four neighboring tiles)
//
// Everything is validated up front: grid size, clip limit, and whether the
// grid fits the image. After that nothing can fail, so a call either
// returns a complete image of the input's size or an error with no output.
//
// The function is pure. Same (image, clip limit, grid) → same bytes, no
// matter how rayon schedules the work.
//
// Reference: Zuiderveld (1994), "Contrast Limited Adaptive Histogram
// Equalization", Graphics Gems IV. The interpolation here anchors on tile
// origins rather than tile centers; see interpolate.rs.

use crate::error::Result;
use crate::histogram::ClipLimit;
use crate::image::Image;
use crate::interpolate;
use crate::tiles::{GridSpec, TileMappingGrid};

/// Validated CLAHE parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clahe {
    clip_limit: ClipLimit,
    grid: GridSpec,
}

impl Clahe {
    /// Check the parameters once; the result can equalize any number of
    /// images.
    pub fn new(clip_limit: f64, grid: GridSpec) -> Result<Self> {
        grid.validate()?;
        let clip_limit = ClipLimit::new(clip_limit)?;
        Ok(Clahe { clip_limit, grid })
    }

    #[inline]
    pub fn clip_limit(&self) -> f64 {
        self.clip_limit.value()
    }

    #[inline]
    pub fn grid(&self) -> GridSpec {
        self.grid
    }

    /// Compute only the per-tile mappings for `image`.
    pub fn tile_mappings(&self, image: &Image<u8>) -> Result<TileMappingGrid> {
        let geometry = self.grid.geometry(image.width(), image.height())?;
        log::debug!(
            "clahe: {}×{} image, {}×{} grid of {}×{} cells, clip {}",
            image.width(),
            image.height(),
            geometry.rows(),
            geometry.cols(),
            geometry.cell_width(),
            geometry.cell_height(),
            self.clip_limit.value(),
        );
        let (right, bottom) = geometry.remainder();
        if right > 0 || bottom > 0 {
            log::debug!("clahe: {right} column(s) / {bottom} row(s) outside the tile grid");
        }

        let grid = TileMappingGrid::build(image, geometry, self.clip_limit);
        if grid.uniform_tiles() > 0 {
            log::debug!(
                "clahe: {} of {} tiles are single-intensity, left unequalized",
                grid.uniform_tiles(),
                grid.mappings().len()
            );
        }
        Ok(grid)
    }

    /// Equalize `image`, returning a new image of the same dimensions.
    pub fn equalize(&self, image: &Image<u8>) -> Result<Image<u8>> {
        let grid = self.tile_mappings(image)?;
        Ok(interpolate::reconstruct(image, &grid))
    }
}

/// Equalize `image` with the given clip limit and tile grid.
///
/// Convenience for a one-off call; build a [`Clahe`] to reuse parameters.
pub fn equalize(image: &Image<u8>, clip_limit: f64, grid: GridSpec) -> Result<Image<u8>> {
    Clahe::new(clip_limit, grid)?.equalize(image)
}
