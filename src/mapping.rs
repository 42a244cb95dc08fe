// mapping.rs — Per-tile equalization lookup tables.
//
// A Mapping is the tile's normalized CDF, quantized to 8 bits:
//
//   mapping[v] = round((cdf[v] − cdf_min) / (block_size − cdf_min) × 255)
//
// where cdf_min is the first non-zero CDF entry. Subtracting cdf_min pins
// the darkest occupied level to 0 instead of wasting the bottom of the
// output range. The CDF is non-decreasing, so every Mapping is too.
//
// When block_size == cdf_min the denominator is zero: the darkest occupied
// level already accounts for the whole tile. That tile has no dynamic range
// to stretch, so it gets the identity table and passes through unchanged.

use crate::histogram::{Histogram, BINS};

/// 256-entry intensity lookup table for one tile.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Mapping {
    table: [u8; BINS],
}

impl Mapping {
    /// Identity table: every intensity maps to itself.
    pub fn identity() -> Self {
        let mut table = [0u8; BINS];
        for (v, entry) in table.iter_mut().enumerate() {
            *entry = v as u8;
        }
        Mapping { table }
    }

    /// Wrap an explicit table.
    pub fn from_table(table: [u8; BINS]) -> Self {
        Mapping { table }
    }

    /// Build the equalization curve from a (clipped) histogram.
    ///
    /// `block_size` is the pixel count of the tile the histogram came from,
    /// which clipping leaves equal to `hist.total()`.
    pub fn from_histogram(hist: &Histogram, block_size: u64) -> Self {
        let mut cdf = [0u64; BINS];
        let mut running = 0u64;
        for (c, &count) in cdf.iter_mut().zip(hist.counts().iter()) {
            running += count as u64;
            *c = running;
        }

        let cdf_min = cdf.iter().copied().find(|&c| c > 0).unwrap_or(0);
        if block_size <= cdf_min {
            return Self::identity();
        }

        let denom = (block_size - cdf_min) as f64;
        let mut table = [0u8; BINS];
        for (entry, &c) in table.iter_mut().zip(cdf.iter()) {
            // Entries below the first occupied bin come out negative.
            let scaled = (c as f64 - cdf_min as f64) / denom * 255.0;
            *entry = scaled.round().clamp(0.0, 255.0) as u8;
        }
        Mapping { table }
    }

    /// Look up the output intensity for `v`.
    #[inline]
    pub fn get(&self, v: u8) -> u8 {
        self.table[v as usize]
    }

    /// The raw table.
    #[inline]
    pub fn as_table(&self) -> &[u8; BINS] {
        &self.table
    }

    /// True if the table never decreases.
    pub fn is_monotonic(&self) -> bool {
        self.table.windows(2).all(|w| w[0] <= w[1])
    }
}

impl std::ops::Index<u8> for Mapping {
    type Output = u8;

    #[inline]
    fn index(&self, v: u8) -> &u8 {
        &self.table[v as usize]
    }
}

impl std::fmt::Debug for Mapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Mapping {{ 0→{}, 64→{}, 128→{}, 192→{}, 255→{} }}",
            self.table[0], self.table[64], self.table[128], self.table[192], self.table[255]
        )
    }
}
