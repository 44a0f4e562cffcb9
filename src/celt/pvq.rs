//! Pyramid vector quantization (PVQ): shape coding for CELT bands.
//!
//! Each band's normalized residual is coded as an integer lattice point on
//! the L1-norm-`K` pyramid (`sum |y_i| == K`), found by a greedy
//! Rayleigh-quotient pulse search, then packed into a single range-coded
//! index via the combinatorial numbering system ("CWRS").

use crate::range_coder::{RangeDecoder, RangeEncoder};

/// Number of ways to choose an `n`-dimensional integer vector with L1 norm
/// exactly `k` (signed components). Memoized: `V(n, k)`.
///
/// `V(n, k) = V(n-1, k) + 2 * sum_{j=0}^{k-1} V(n-1, j)`, with `V(0, 0) = 1`
/// and `V(0, k > 0) = 0`. Saturates rather than overflows; bands wide/loud
/// enough to hit the cap are never actually reachable at CELT's bitrates.
fn pulse_counts(n: usize, max_k: u32) -> Vec<Vec<u64>> {
    let max_k = max_k as usize;
    let mut v = vec![vec![0u64; max_k + 1]; n + 1];
    v[0][0] = 1;
    for row in 1..=n {
        let mut prefix = 0u64;
        for k in 0..=max_k {
            let contribution = v[row - 1][k];
            v[row][k] = contribution.saturating_add(2 * prefix);
            prefix = prefix.saturating_add(contribution);
        }
    }
    v
}

/// Encodes a pulse vector `pulses` (length `n`, `sum |pulses| == k`) into a
/// single combinatorial index in `0..V(n, k)`.
fn cwrs_encode(pulses: &[i32], k: u32) -> u64 {
    let n = pulses.len();
    let table = pulse_counts(n, k);
    let mut index = 0u64;
    let mut remaining_k = k;
    for i in 0..n {
        let y = pulses[i];
        let mag = y.unsigned_abs();
        // Every vector with a smaller magnitude at this position precedes
        // this one in the canonical ordering.
        for m in 0..mag {
            index += table[n - i - 1][(remaining_k - m) as usize];
        }
        if y != 0 {
            // The sign bit splits the magnitude-m count in two, except the
            // final position where the sign is implied by the remaining k.
            if remaining_k > mag {
                index += table[n - i - 1][(remaining_k - mag) as usize];
            }
            if y < 0 {
                index += if remaining_k > mag {
                    table[n - i - 1][(remaining_k - mag) as usize]
                } else {
                    0
                };
            }
        }
        remaining_k -= mag;
    }
    index
}

/// Inverse of [`cwrs_encode`]: recovers the pulse vector from its index.
fn cwrs_decode(mut index: u64, n: usize, k: u32) -> Vec<i32> {
    let table = pulse_counts(n, k);
    let mut pulses = vec![0i32; n];
    let mut remaining_k = k;
    for i in 0..n {
        let mut mag = 0u32;
        loop {
            let zero_block = table[n - i - 1][remaining_k as usize];
            if remaining_k == 0 || index < zero_block {
                break;
            }
            index -= zero_block;
            mag += 1;
            if mag > remaining_k {
                mag = remaining_k;
                break;
            }
        }
        if mag == 0 {
            pulses[i] = 0;
        } else {
            let half = table[n - i - 1][(remaining_k - mag) as usize];
            let negative = index >= half;
            if negative {
                index -= half;
            }
            pulses[i] = if negative { -(mag as i32) } else { mag as i32 };
        }
        remaining_k -= mag;
    }
    pulses
}

/// Total number of codebook entries for an `n`-dimensional, `k`-pulse shape.
pub(crate) fn codebook_size(n: usize, k: u32) -> u64 {
    pulse_counts(n, k)[n][k as usize]
}

/// Greedily places `k` unit pulses on `x` (length `n`) to approximately
/// maximize the normalized correlation `(x . y) / |y|`, the standard PVQ
/// search used to quantize a band's shape before normalization.
pub(crate) fn search_pulses(x: &[f32], k: u32) -> Vec<i32> {
    let n = x.len();
    let mut y = vec![0i32; n];
    if k == 0 || n == 0 {
        return y;
    }
    let abs_x: Vec<f32> = x.iter().map(|v| v.abs()).collect();
    let mut sum_y = 0f32;
    let mut corr = vec![0f32; n];
    for _ in 0..k {
        let mut best = 0usize;
        let mut best_metric = f32::MIN;
        for j in 0..n {
            // Rayleigh quotient after tentatively adding one more pulse at j:
            // maximize (corr+x_j)^2 / (sum_y+1), equivalent for this greedy
            // step to comparing (corr_j + x_j) with the running sum already
            // factored in via sum_y.
            let candidate = corr[j] + abs_x[j];
            let metric = candidate * candidate / (sum_y + 1.0);
            if metric > best_metric {
                best_metric = metric;
                best = j;
            }
        }
        corr[best] += abs_x[best];
        sum_y += 1.0;
        y[best] += if x[best] < 0.0 { -1 } else { 1 };
    }
    y
}

/// Encodes a pulse vector into the range coder as a uniform index.
pub(crate) fn encode_vector(
    enc: &mut RangeEncoder,
    pulses: &[i32],
    k: u32,
) -> Result<(), crate::encoder_error::EncoderError> {
    let n = pulses.len();
    let size = codebook_size(n, k);
    if size <= 1 {
        return Ok(());
    }
    let index = cwrs_encode(pulses, k);
    enc.encode_uint(index as u32, size.min(u32::MAX as u64) as u32)
}

/// Decodes a pulse vector of dimension `n` and L1 norm `k` from the range coder.
pub(crate) fn decode_vector(dec: &mut RangeDecoder, n: usize, k: u32) -> Vec<i32> {
    let size = codebook_size(n, k);
    if size <= 1 {
        return vec![0i32; n];
    }
    let index = dec.decode_uint(size.min(u32::MAX as u64) as u32);
    cwrs_decode(index as u64, n, k)
}

/// Normalizes a pulse vector to unit L2 norm, the shape CELT reconstructs
/// before scaling by the band's quantized energy.
pub(crate) fn normalize(pulses: &[i32]) -> Vec<f32> {
    let norm: f32 = pulses.iter().map(|p| (*p * *p) as f32).sum::<f32>().sqrt();
    if norm == 0.0 {
        return vec![0.0; pulses.len()];
    }
    pulses.iter().map(|p| *p as f32 / norm).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_produces_correct_l1_norm() {
        let x = [0.1f32, -0.9, 0.3, 0.05, -0.2];
        let k = 7;
        let pulses = search_pulses(&x, k);
        let l1: u32 = pulses.iter().map(|p| p.unsigned_abs()).sum();
        assert_eq!(l1, k);
    }

    #[test]
    fn cwrs_round_trips_through_all_indices_small() {
        let n = 3;
        let k = 4;
        let size = codebook_size(n, k);
        for index in 0..size {
            let pulses = cwrs_decode(index, n, k);
            let l1: u32 = pulses.iter().map(|p| p.unsigned_abs()).sum();
            assert_eq!(l1, k);
            assert_eq!(cwrs_encode(&pulses, k), index);
        }
    }

    #[test]
    fn encode_decode_vector_round_trip() {
        let mut buffer = vec![0u8; 256];
        let n = 5;
        let k = 6;
        let pulses = search_pulses(&[0.2, -0.4, 0.1, 0.5, -0.05], k);

        let mut enc = RangeEncoder::new(&mut buffer);
        encode_vector(&mut enc, &pulses, k).unwrap();
        enc.done().unwrap();
        drop(enc);

        let mut dec = RangeDecoder::new(&buffer);
        let decoded = decode_vector(&mut dec, n, k);
        assert_eq!(decoded, pulses);
    }
}
