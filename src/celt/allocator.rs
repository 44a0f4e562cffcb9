//! The CELT bit allocator.
//!
//! Given a total bit budget (in 1/8-bit units) and a trim parameter, decides
//! how many bits each band gets for PVQ shape coding and fine energy
//! refinement, via a binary search over [`crate::celt::tables::allocation_table`].

use crate::celt::tables::{allocation_table, NUM_BANDS, QUALITY_STEPS};

/// Result of a single allocation pass.
#[derive(Clone, Debug)]
pub(crate) struct BandAllocation {
    /// Bits (1/8-bit units) assigned to each band for PVQ pulses.
    pub(crate) pulse_bits: [u32; NUM_BANDS],
    /// Extra whole bits of fine-energy refinement per band.
    pub(crate) fine_bits: [u32; NUM_BANDS],
    /// Number of bands that received a non-zero allocation.
    pub(crate) coded_bands: usize,
    /// Bits left unspent after rounding (fed back as "balance" to later frames).
    pub(crate) balance: i32,
}

/// Maps a decoded trim symbol (`0..=10`) to a signed trim value
/// (`-5..=5`): positive trim favors high bands, negative favors low bands.
pub(crate) fn trim_value(symbol: u32) -> i32 {
    symbol as i32 - 5
}

/// Allocates `total_bits` (1/8-bit units) across `num_bands` bands, applying
/// `trim` and per-band `caps` (also 1/8-bit units).
pub(crate) fn allocate(
    total_bits: u32,
    num_bands: usize,
    caps: &[u32; NUM_BANDS],
    trim: i32,
) -> BandAllocation {
    let table = allocation_table();

    // Binary search for the largest quality step whose total cost (summed
    // over the first `num_bands` bands) does not exceed the budget.
    let cost_at = |q: usize| -> u32 { table[q][..num_bands].iter().map(|&v| v as u32).sum() };

    let mut lo = 0usize;
    let mut hi = QUALITY_STEPS - 1;
    while lo < hi {
        let mid = (lo + hi + 1) / 2;
        if cost_at(mid) <= total_bits {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }
    let q = lo;

    let mut pulse_bits = [0u32; NUM_BANDS];
    for b in 0..num_bands {
        let base = table[q][b] as u32;
        // Trim shifts weight from low bands (b small) to high bands (b
        // large) or vice versa, proportional to distance from the middle band.
        let mid_band = num_bands as i32 / 2;
        let offset = trim * (b as i32 - mid_band);
        let adjusted = (base as i32 + offset * 4).max(0) as u32;
        pulse_bits[b] = adjusted.min(caps[b]);
    }

    let spent: u32 = pulse_bits.iter().sum();
    let balance = total_bits as i32 - spent as i32;

    // Whatever whole bits remain after pulse allocation go to fine-energy
    // refinement, one bit at a time, low bands first (they're perceptually
    // more important and cheaper to refine).
    let mut fine_bits = [0u32; NUM_BANDS];
    let mut remaining_whole_bits = balance.max(0) as u32 / 8;
    let mut b = 0;
    while remaining_whole_bits > 0 && num_bands > 0 {
        let idx = b % num_bands;
        fine_bits[idx] += 1;
        remaining_whole_bits -= 1;
        b += 1;
        if b > num_bands * 8 {
            break;
        }
    }

    let coded_bands = pulse_bits.iter().take(num_bands).filter(|&&b| b > 0).count();

    BandAllocation {
        pulse_bits,
        fine_bits,
        coded_bands,
        balance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocation_never_exceeds_caps() {
        let caps = [1000u32; NUM_BANDS];
        let alloc = allocate(5000, NUM_BANDS, &caps, 0);
        for (b, &bits) in alloc.pulse_bits.iter().enumerate() {
            assert!(bits <= caps[b]);
        }
    }

    #[test]
    fn more_bits_never_decreases_total_allocation() {
        let caps = [u32::MAX; NUM_BANDS];
        let low = allocate(100, NUM_BANDS, &caps, 0);
        let high = allocate(10000, NUM_BANDS, &caps, 0);
        let low_sum: u32 = low.pulse_bits.iter().sum();
        let high_sum: u32 = high.pulse_bits.iter().sum();
        assert!(high_sum >= low_sum);
    }

    #[test]
    fn positive_trim_favors_high_bands() {
        let caps = [u32::MAX; NUM_BANDS];
        let alloc = allocate(8000, NUM_BANDS, &caps, 5);
        let low_half: u32 = alloc.pulse_bits[..NUM_BANDS / 2].iter().sum();
        let high_half: u32 = alloc.pulse_bits[NUM_BANDS / 2..].iter().sum();
        assert!(high_half >= low_half);
    }
}
