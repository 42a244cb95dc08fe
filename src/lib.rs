// retina-clahe: contrast-limited adaptive histogram equalization for
// grayscale retinal OCT scans, ahead of U-Net layer segmentation.
//
// Pipeline, leaf-first:
//   histogram    256-bin counts per tile, clip + redistribute
//   mapping      clipped histogram → 8-bit equalization curve
//   tiles        grid partition, one mapping per tile
//   interpolate  bilinear blend of neighboring tile curves per pixel
//   clahe        validation + the two phases above, public entry point
//
// Around it: preprocess (model tensor), segmentation (model output →
// labels/overlay), config (JSON settings).

pub mod error;
pub mod image;
pub mod histogram;
pub mod mapping;
pub mod tiles;
pub mod interpolate;
pub mod clahe;
pub mod config;
pub mod preprocess;
pub mod segmentation;

pub use crate::clahe::{equalize, Clahe};
pub use crate::error::{ClaheError, Result};
pub use crate::image::Image;
pub use crate::tiles::GridSpec;

/// Images with at least this many pixels are processed on the rayon pool.
/// Smaller ones (unit tests, thumbnails) stay on the calling thread.
pub(crate) const PARALLEL_THRESHOLD: usize = 64 * 64;
