// histogram.rs — 256-bin intensity histograms and contrast limiting.
//
// A tile's histogram is the raw material for its equalization curve.
// Plain histogram equalization stretches whatever dominates the tile, so a
// mostly-flat region (vitreous above the ILM, say) has its speckle noise
// blown up to full range. Clipping caps every bin before the CDF is built,
// which bounds the slope of the resulting mapping.
//
// Clip-and-redistribute, in order:
//
//   1. excess = Σ max(0, count − cap)
//   2. count  = min(count, cap)
//   3. every bin += excess / 256
//   4. bins 0 .. (excess % 256) += 1
//
// Step 4 hands the leftover to the LOWEST bins, not spread round-robin or
// weighted by the original counts. That is intentional: it reproduces the
// reference preprocessing the segmentation models were trained against,
// and changing it shifts dark-end outputs by a level or two.
//
// Counts are integers throughout, so the total pixel count is conserved
// exactly.

use crate::error::{ClaheError, Result};
use crate::image::{Image, ImageView};

/// Number of intensity levels in an 8-bit image.
pub const BINS: usize = 256;

/// Maximum count a histogram bin may keep before the excess is redistributed.
///
/// Fractional limits are accepted; since counts are integers the effective
/// cap is `floor(limit)`. Half-step settings such as 2.5 therefore clip
/// like 2.0; they do not match a float-count clip that compares against 2.5
/// and redistributes the fractional excess.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipLimit(f64);

impl ClipLimit {
    /// Validate a clip limit. Zero, negative values and NaN are rejected.
    pub fn new(limit: f64) -> Result<Self> {
        // `!(limit > 0.0)` also catches NaN.
        if !(limit > 0.0) {
            return Err(ClaheError::InvalidClipLimit(limit));
        }
        Ok(ClipLimit(limit))
    }

    /// The limit as given.
    #[inline]
    pub fn value(self) -> f64 {
        self.0
    }

    /// Integer cap applied to each bin.
    #[inline]
    pub fn cap(self) -> u32 {
        // Float-to-int `as` saturates, so +inf means "never clip".
        self.0.floor() as u32
    }
}

/// Intensity histogram over [0, 256).
///
/// The sum of all bins equals the number of pixels the histogram was built
/// from, and clipping preserves that sum.
#[derive(Clone, PartialEq, Eq)]
pub struct Histogram {
    counts: [u32; BINS],
}

impl Histogram {
    /// All-zero histogram.
    pub fn empty() -> Self {
        Histogram { counts: [0; BINS] }
    }

    /// Histogram from explicit counts.
    pub fn from_counts(counts: [u32; BINS]) -> Self {
        Histogram { counts }
    }

    /// Count every pixel of a rectangular region.
    ///
    /// Only the region's contents matter, not where it sits in the image.
    pub fn from_view(view: &ImageView<'_, u8>) -> Self {
        let mut hist = Self::empty();
        for row in view.rows() {
            hist.accumulate(row);
        }
        hist
    }

    /// Histogram of a whole image (used for before/after charts).
    pub fn from_image(image: &Image<u8>) -> Self {
        let mut hist = Self::empty();
        hist.accumulate(image.as_slice());
        hist
    }

    #[inline]
    fn accumulate(&mut self, pixels: &[u8]) {
        for &p in pixels {
            self.counts[p as usize] += 1;
        }
    }

    /// The 256 bin counts, indexed by intensity.
    #[inline]
    pub fn counts(&self) -> &[u32; BINS] {
        &self.counts
    }

    /// Count for a single intensity.
    #[inline]
    pub fn get(&self, intensity: u8) -> u32 {
        self.counts[intensity as usize]
    }

    /// Total number of pixels counted.
    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&c| c as u64).sum()
    }

    /// Number of intensities with a non-zero count.
    pub fn occupied_bins(&self) -> usize {
        self.counts.iter().filter(|&&c| c > 0).count()
    }

    /// If every counted pixel has the same intensity, return it.
    pub fn single_intensity(&self) -> Option<u8> {
        let mut occupied = self
            .counts
            .iter()
            .enumerate()
            .filter(|&(_, &c)| c > 0)
            .map(|(i, _)| i as u8);
        match (occupied.next(), occupied.next()) {
            (Some(v), None) => Some(v),
            _ => None,
        }
    }

    /// Clip every bin at `limit` and spread the excess back over all bins.
    ///
    /// Returns a new histogram with the same total as `self`.
    pub fn clip(&self, limit: ClipLimit) -> Histogram {
        let cap = limit.cap();

        let mut counts = self.counts;
        let mut excess: u64 = 0;
        for bin in counts.iter_mut() {
            if *bin > cap {
                excess += (*bin - cap) as u64;
                *bin = cap;
            }
        }

        // The bins still sum to the original total, so none can overflow.
        let per_bin = (excess / BINS as u64) as u32;
        let remainder = (excess % BINS as u64) as usize;
        for (i, bin) in counts.iter_mut().enumerate() {
            *bin += per_bin;
            if i < remainder {
                *bin += 1;
            }
        }

        Histogram { counts }
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::fmt::Debug for Histogram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Print only occupied bins; 256 zeros are useless in a test failure.
        f.debug_map()
            .entries(
                self.counts
                    .iter()
                    .enumerate()
                    .filter(|&(_, &c)| c > 0),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limit(v: f64) -> ClipLimit {
        ClipLimit::new(v).unwrap()
    }

    #[test]
    fn test_from_view_counts_region_only() {
        // Left half 10, right half 200.
        let img = Image::from_fn(8, 4, |x, _| if x < 4 { 10u8 } else { 200 });
        let hist = Histogram::from_view(&img.sub_image(0, 0, 4, 4));
        assert_eq!(hist.get(10), 16);
        assert_eq!(hist.get(200), 0);
        assert_eq!(hist.total(), 16);
    }

    #[test]
    fn test_from_view_position_independent() {
        let img = Image::from_fn(8, 8, |x, y| ((x % 4) * 50 + (y % 4)) as u8);
        let a = Histogram::from_view(&img.sub_image(0, 0, 4, 4));
        let b = Histogram::from_view(&img.sub_image(4, 4, 4, 4));
        assert_eq!(a, b);
    }

    #[test]
    fn test_from_image_total() {
        let img = Image::from_fn(13, 7, |x, y| (x * 19 + y * 3) as u8);
        assert_eq!(Histogram::from_image(&img).total(), 13 * 7);
    }

    #[test]
    fn test_clip_limit_rejects_non_positive() {
        assert!(matches!(ClipLimit::new(0.0), Err(ClaheError::InvalidClipLimit(_))));
        assert!(matches!(ClipLimit::new(-1.5), Err(ClaheError::InvalidClipLimit(_))));
        assert!(ClipLimit::new(f64::NAN).is_err());
        assert!(ClipLimit::new(0.25).is_ok());
    }

    #[test]
    fn test_clip_redistributes_low_bins_first() {
        let mut counts = [0u32; BINS];
        counts[0] = 300;
        counts[1] = 10;
        let clipped = Histogram::from_counts(counts).clip(limit(4.0));

        // excess = 296 + 6 = 302 → 1 per bin, remainder 46 to bins 0..45
        assert_eq!(clipped.get(0), 4 + 1 + 1);
        assert_eq!(clipped.get(1), 4 + 1 + 1);
        assert_eq!(clipped.get(45), 2);
        assert_eq!(clipped.get(46), 1);
        assert_eq!(clipped.get(255), 1);
        assert_eq!(clipped.total(), 310);
    }

    #[test]
    fn test_clip_fractional_limit_floors() {
        let mut counts = [0u32; BINS];
        counts[100] = 3;
        // cap = floor(2.5) = 2, excess 1 → bin 0 gets it
        let clipped = Histogram::from_counts(counts).clip(limit(2.5));
        assert_eq!(clipped.get(100), 2);
        assert_eq!(clipped.get(0), 1);
        assert_eq!(clipped.total(), 3);
    }

    #[test]
    fn test_clip_below_limit_is_noop() {
        let mut counts = [0u32; BINS];
        counts[5] = 3;
        counts[250] = 4;
        let hist = Histogram::from_counts(counts);
        assert_eq!(hist.clip(limit(4.0)), hist);
    }

    #[test]
    fn test_clip_infinite_limit_is_noop() {
        let mut counts = [0u32; BINS];
        counts[7] = 1_000_000;
        let hist = Histogram::from_counts(counts);
        assert_eq!(hist.clip(limit(f64::INFINITY)), hist);
    }

    #[test]
    fn test_single_intensity() {
        let mut counts = [0u32; BINS];
        counts[77] = 64;
        assert_eq!(Histogram::from_counts(counts).single_intensity(), Some(77));
        counts[78] = 1;
        assert_eq!(Histogram::from_counts(counts).single_intensity(), None);
        assert_eq!(Histogram::empty().single_intensity(), None);
    }
}
