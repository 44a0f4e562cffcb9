//! Describes a single CELT mode: the static, frame-size independent pieces
//! of configuration shared by the encoder and decoder (band layout, window,
//! allocation tables).

use crate::celt::tables::{self, NUM_BANDS, OVERLAP};

/// Re-exported so callers (e.g. the comb filter) can index the analysis
/// window the way the original C code indexes a flat array.
pub(crate) fn window() -> &'static [f32; OVERLAP] {
    tables::window()
}

/// A fully resolved CELT mode for one `LM` (log2 of short blocks per frame).
#[derive(Clone, Copy, Debug)]
pub(crate) struct CeltMode {
    /// `log2` of the number of short MDCT blocks in this frame (0..=3).
    pub(crate) lm: usize,
    /// MDCT size (number of frequency bins) for this frame size.
    pub(crate) mdct_size: usize,
    /// Band boundaries, in MDCT bins, for this frame size.
    pub(crate) ebands: [usize; NUM_BANDS + 1],
    /// Per-band pulse caps in 1/8-bit units.
    pub(crate) caps: [u32; NUM_BANDS],
}

impl CeltMode {
    /// Builds the mode description for the given `LM` (0 = 2.5 ms .. 3 = 20 ms).
    pub(crate) fn new(lm: usize) -> Self {
        debug_assert!(lm <= 3);
        let ebands = tables::ebands_for_lm(lm);
        let mdct_size = ebands[NUM_BANDS] * 2;
        Self {
            lm,
            mdct_size,
            ebands,
            caps: tables::caps_for_lm(lm),
        }
    }

    /// Number of MDCT bins covered by band `b`.
    pub(crate) fn band_width(&self, b: usize) -> usize {
        self.ebands[b + 1] - self.ebands[b]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_sizes_scale_with_lm() {
        for lm in 0..=3 {
            let mode = CeltMode::new(lm);
            assert_eq!(mode.ebands[NUM_BANDS], 100 << lm);
        }
    }

    #[test]
    fn window_is_power_complementary() {
        let w = window();
        for i in 0..OVERLAP {
            let sum = w[i] * w[i] + w[OVERLAP - 1 - i] * w[OVERLAP - 1 - i];
            assert!((sum - 1.0).abs() < 1e-3, "index {i}: sum = {sum}");
        }
    }
}
