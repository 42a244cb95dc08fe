// error.rs — Error type shared by the whole crate.
//
// Every variant except `Io` / `Config` / `ShapeMismatch` is a parameter or
// dimension problem caught at the `Clahe` boundary before any tile work
// starts, so an `Err` never comes with partial output.

use thiserror::Error;

/// Errors produced by equalization, preprocessing and configuration loading.
#[derive(Debug, Error)]
pub enum ClaheError {
    /// The tile grid needs at least two rows and two columns so every
    /// pixel has a lower/right interpolation partner.
    #[error("tile grid must be at least 2×2, got {rows}×{cols}")]
    InvalidGrid { rows: usize, cols: usize },

    /// Clip limit is zero, negative or NaN.
    #[error("clip limit must be a positive number, got {0}")]
    InvalidClipLimit(f64),

    /// The image has no pixels.
    #[error("image is empty ({width}×{height})")]
    EmptyImage { width: usize, height: usize },

    /// The grid has more rows or columns than the image, which would make
    /// zero-sized cells.
    #[error("{rows}×{cols} tile grid does not fit a {width}×{height} image")]
    GridExceedsImage {
        rows: usize,
        cols: usize,
        width: usize,
        height: usize,
    },

    /// Model output with no classes, or more than a `u8` label can hold.
    #[error("class count must be in 1..=256, got {0}")]
    InvalidClassCount(usize),

    /// An image or model output does not have the expected `(width, height)`.
    #[error("{what}: expected {}×{}, got {}×{}", .expected.0, .expected.1, .actual.0, .actual.1)]
    ShapeMismatch {
        what: &'static str,
        expected: (usize, usize),
        actual: (usize, usize),
    },

    /// Class-probability buffer length disagrees with its declared shape.
    #[error("class probabilities: {len} values cannot fill {height}×{width}×{classes}")]
    ProbabilityLength {
        len: usize,
        height: usize,
        width: usize,
        classes: usize,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, ClaheError>;
