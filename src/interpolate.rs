// interpolate.rs — Bilinear blending of neighboring tile mappings.
//
// Applying each tile's mapping only inside its own cell leaves visible
// seams wherever two neighbors disagree. Instead every output pixel blends
// the four mappings around it:
//
//   row = min(i / cell_h, rows − 2)      y = (i − row·cell_h) / cell_h
//   col = min(j / cell_w, cols − 2)      x = (j − col·cell_w) / cell_w
//
//        M00 ──── top ──── M01          top    = (1−x)·M00[p] + x·M01[p]
//         │        │        │           bottom = (1−x)·M10[p] + x·M11[p]
//         │      value      │           value  = (1−y)·top + y·bottom
//         │        │        │
//        M10 ─── bottom ─── M11
//
// Anchors are tile ORIGINS, not tile centers, and the pairing index is
// clamped to rows−2 / cols−2. The last tile row/column is therefore only
// ever reached as the lower/right partner; pixels inside it (and in any
// remainder strip past the grid) keep the second-to-last pairing and get
// x or y >= 1. Ratios above 1 extrapolate; the result is clamped to
// [0, 255]. This matches the reference preprocessing the segmentation
// models were trained with, so it is kept as is.
//
// Every output pixel depends only on its own input pixel and the finished
// mapping grid, so rows are filled in parallel.

use rayon::prelude::*;

use crate::image::Image;
use crate::tiles::TileMappingGrid;
use crate::PARALLEL_THRESHOLD;

/// Reconstruct the equalized image from the finished tile mappings.
///
/// `grid` must have been built for an image with the same dimensions as
/// `image`.
pub fn reconstruct(image: &Image<u8>, grid: &TileMappingGrid) -> Image<u8> {
    let (width, height) = image.dimensions();
    debug_assert_eq!(grid.geometry().image_dimensions(), (width, height));

    let mut out: Image<u8> = Image::new(width, height);
    let fill_row = |(i, out_row): (usize, &mut [u8])| {
        reconstruct_row(image.row(i), i, grid, out_row);
    };

    if image.len() >= PARALLEL_THRESHOLD {
        out.as_mut_slice()
            .par_chunks_mut(width)
            .enumerate()
            .for_each(fill_row);
    } else {
        out.as_mut_slice()
            .chunks_mut(width)
            .enumerate()
            .for_each(fill_row);
    }
    out
}

/// Fill output row `i`.
fn reconstruct_row(input: &[u8], i: usize, grid: &TileMappingGrid, out: &mut [u8]) {
    let g = grid.geometry();
    let (cell_h, cell_w) = (g.cell_height(), g.cell_width());

    let row = (i / cell_h).min(g.rows() - 2);
    let y = (i - row * cell_h) as f64 / cell_h as f64;

    for (j, (&p, dst)) in input.iter().zip(out.iter_mut()).enumerate() {
        let col = (j / cell_w).min(g.cols() - 2);
        let x = (j - col * cell_w) as f64 / cell_w as f64;

        let m00 = grid.get(row, col)[p] as f64;
        let m01 = grid.get(row, col + 1)[p] as f64;
        let m10 = grid.get(row + 1, col)[p] as f64;
        let m11 = grid.get(row + 1, col + 1)[p] as f64;

        let top = (1.0 - x) * m00 + x * m01;
        let bottom = (1.0 - x) * m10 + x * m11;
        let value = (1.0 - y) * top + y * bottom;

        *dst = value.round().clamp(0.0, 255.0) as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::Mapping;
    use crate::tiles::GridSpec;
    use crate::histogram::BINS;

    fn constant(v: u8) -> Mapping {
        Mapping::from_table([v; BINS])
    }

    /// 4×4 image, 2×2 grid of 2×2 cells, constant mappings 0/100/200/50.
    fn corner_grid() -> TileMappingGrid {
        let geometry = GridSpec::new(2, 2).geometry(4, 4).unwrap();
        TileMappingGrid::from_mappings(
            geometry,
            vec![constant(0), constant(100), constant(200), constant(50)],
        )
    }

    #[test]
    fn test_tile_origin_takes_top_left_mapping() {
        let out = reconstruct(&Image::new(4, 4), &corner_grid());
        assert_eq!(out.get(0, 0), 0);
    }

    #[test]
    fn test_midpoint_blends_all_four() {
        let out = reconstruct(&Image::new(4, 4), &corner_grid());
        // x = y = 0.5: top = 50, bottom = 125, value = 87.5 → 88
        assert_eq!(out.get(1, 1), 88);
        // x = 0.5, y = 0: halfway between M00 and M01
        assert_eq!(out.get(1, 0), 50);
    }

    #[test]
    fn test_last_tile_reuses_second_to_last_pairing() {
        let out = reconstruct(&Image::new(4, 4), &corner_grid());
        // (x=2, y=2) is the origin of tile (1,1) but pairs from (0,0):
        // x = y = 1.0 → exactly M11.
        assert_eq!(out.get(2, 2), 50);
        // (x=0, y=2): y = 1.0, x = 0 → M10.
        assert_eq!(out.get(0, 2), 200);
        // (x=2, y=0): x = 1.0 → M01.
        assert_eq!(out.get(2, 0), 100);
    }

    #[test]
    fn test_extrapolation_is_clamped() {
        let out = reconstruct(&Image::new(4, 4), &corner_grid());
        // x = y = 1.5: top = 150, bottom = −25, value = −112.5 → 0
        assert_eq!(out.get(3, 3), 0);
        // x = 0, y = 1.5: top = 0, bottom = 200, value = 300 → 255
        assert_eq!(out.get(0, 3), 255);
    }

    #[test]
    fn test_identity_grid_is_passthrough() {
        let img = Image::from_fn(9, 7, |x, y| (x * 28 + y * 3) as u8);
        let geometry = GridSpec::new(3, 3).geometry(9, 7).unwrap();
        let grid = TileMappingGrid::from_mappings(geometry, vec![Mapping::identity(); 9]);
        assert_eq!(reconstruct(&img, &grid), img);
    }
}
