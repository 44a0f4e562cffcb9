//! Normalized Line Spectral Frequency (NLSF) coding: vector quantization of
//! the LPC coefficients in a perceptually and numerically well-behaved
//! domain, plus the conversion back to LPC coefficients and interpolation
//! between consecutive frames' NLSF vectors.

use crate::range_coder::{RangeDecoder, RangeEncoder};
use crate::silk::tables::{nlsf_stage1_codebook, nlsf_stage2_codebook, NLSF_STAGE2_SIZE};

/// Quantizes `nlsf` (normalized, monotonically increasing frequencies in
/// `[0, 1)`) against the two-stage codebook, returning `(stage1_index,
/// stage2_indices)`.
pub(crate) fn quantize(nlsf: &[f32]) -> (usize, Vec<usize>) {
    let order = nlsf.len();
    let codebook = nlsf_stage1_codebook(order);
    let stage1 = codebook
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            let da: f32 = a.iter().zip(nlsf).map(|(x, y)| (x - y).powi(2)).sum();
            let db: f32 = b.iter().zip(nlsf).map(|(x, y)| (x - y).powi(2)).sum();
            da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(i, _)| i)
        .unwrap_or(0);

    let residual_codebook = nlsf_stage2_codebook();
    let stage2: Vec<usize> = nlsf
        .iter()
        .zip(codebook[stage1].iter())
        .map(|(&target, &base)| {
            let residual = target - base;
            residual_codebook
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| {
                    (*a - residual)
                        .abs()
                        .partial_cmp(&(*b - residual).abs())
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .map(|(i, _)| i)
                .unwrap_or(0)
        })
        .collect();

    (stage1, stage2)
}

/// Reconstructs a (sorted, stabilized) NLSF vector from its codebook indices.
pub(crate) fn reconstruct(order: usize, stage1: usize, stage2: &[usize]) -> Vec<f32> {
    let codebook = nlsf_stage1_codebook(order);
    let residual_codebook = nlsf_stage2_codebook();
    let mut nlsf: Vec<f32> = codebook[stage1]
        .iter()
        .zip(stage2.iter())
        .map(|(&base, &idx)| base + residual_codebook[idx])
        .collect();
    stabilize(&mut nlsf);
    nlsf
}

/// Enforces strictly increasing order and a minimum spacing between
/// consecutive coefficients, the "NLSF stabilization" step that keeps the
/// derived LPC filter stable.
fn stabilize(nlsf: &mut [f32]) {
    const MIN_GAP: f32 = 0.01;
    for i in 1..nlsf.len() {
        if nlsf[i] < nlsf[i - 1] + MIN_GAP {
            nlsf[i] = nlsf[i - 1] + MIN_GAP;
        }
    }
    for v in nlsf.iter_mut() {
        *v = v.clamp(0.0, 0.999);
    }
}

/// Encodes the two-stage NLSF indices into the range coder as uniform symbols.
pub(crate) fn encode(
    enc: &mut RangeEncoder,
    stage1: usize,
    stage2: &[usize],
) -> Result<(), crate::encoder_error::EncoderError> {
    enc.encode_uint(stage1 as u32, crate::silk::tables::nlsf_stage1_codebook(stage2.len()).len() as u32)?;
    for &idx in stage2 {
        enc.encode_uint(idx as u32, NLSF_STAGE2_SIZE as u32)?;
    }
    Ok(())
}

/// Decodes the two-stage NLSF indices for an `order`-coefficient filter.
pub(crate) fn decode(dec: &mut RangeDecoder, order: usize) -> (usize, Vec<usize>) {
    let stage1_count = nlsf_stage1_codebook(order).len();
    let stage1 = dec.decode_uint(stage1_count as u32) as usize;
    let stage2 = (0..order)
        .map(|_| dec.decode_uint(NLSF_STAGE2_SIZE as u32) as usize)
        .collect();
    (stage1, stage2)
}

/// Linearly interpolates between the previous frame's NLSF vector and the
/// current one. `weight` is in `0..=4` (quarter steps), matching SILK's
/// four-way subframe interpolation; `4` means "use the current frame's
/// NLSFs with no interpolation".
pub(crate) fn interpolate(prev: &[f32], current: &[f32], weight: u32) -> Vec<f32> {
    let w = (weight.min(4) as f32) / 4.0;
    prev.iter()
        .zip(current.iter())
        .map(|(&p, &c)| p + w * (c - p))
        .collect()
}

/// Converts an NLSF vector to direct-form LPC coefficients via the
/// standard line-spectral-pair product-of-factors construction, evaluated
/// directly in floating point (the reference does this with a Chebyshev
/// polynomial expansion in Q-format fixed point; the math is the same
/// cosine-domain root-finding, just not bit-exact).
pub(crate) fn nlsf_to_lpc(nlsf: &[f32]) -> Vec<f32> {
    let order = nlsf.len();
    let half = order / 2;
    let cos_vals: Vec<f32> = nlsf
        .iter()
        .map(|&f| (std::f32::consts::PI * f).cos())
        .collect();

    // Build the two symmetric/antisymmetric polynomials P(z), Q(z) whose
    // sum/difference yields the LPC polynomial, using every other NLSF
    // frequency for each (the classic LSP factorization).
    let mut p = vec![1.0f32];
    let mut q = vec![1.0f32];
    for i in 0..half {
        p = poly_mul_root(&p, cos_vals[2 * i]);
    }
    for i in 0..(order - half) {
        let idx = 2 * i + 1;
        if idx < cos_vals.len() {
            q = poly_mul_root(&q, cos_vals[idx]);
        }
    }

    let len = order + 1;
    let mut p_full = vec![0f32; len];
    let mut q_full = vec![0f32; len];
    for (i, v) in p.iter().enumerate() {
        p_full[i] = *v;
    }
    for (i, v) in q.iter().enumerate() {
        q_full[i] = *v;
    }

    let mut a = vec![0f32; order];
    for i in 0..order {
        a[i] = -0.5 * (p_full[i + 1] + q_full[i + 1]) / p_full[0].max(1e-9);
    }
    a
}

/// Estimates direct-form LPC coefficients of `signal` via windowed
/// autocorrelation and Levinson-Durbin recursion, the encoder-side analysis
/// counterpart of [`nlsf_to_lpc`]/[`reconstruct`].
pub(crate) fn lpc_analysis(signal: &[f32], order: usize) -> Vec<f32> {
    let mut autocorr = vec![0f32; order + 1];
    for (lag, slot) in autocorr.iter_mut().enumerate() {
        let mut sum = 0f32;
        for i in lag..signal.len() {
            sum += signal[i] * signal[i - lag];
        }
        *slot = sum;
    }
    // White-noise correction: keeps the recursion well-conditioned for
    // near-silent or perfectly periodic input.
    autocorr[0] = autocorr[0] * 1.0001 + 1e-6;

    let mut lpc = vec![0f32; order];
    let mut error = autocorr[0];
    for i in 0..order {
        let mut acc = autocorr[i + 1];
        for j in 0..i {
            acc -= lpc[j] * autocorr[i - j];
        }
        let reflection = if error.abs() > 1e-9 { acc / error } else { 0.0 };

        let mut updated = lpc.clone();
        updated[i] = reflection;
        for j in 0..i {
            updated[j] = lpc[j] - reflection * lpc[i - 1 - j];
        }
        lpc = updated;

        error *= 1.0 - reflection * reflection;
        if error <= 0.0 {
            break;
        }
    }
    lpc
}

/// Approximates the normalized line spectral frequencies of an LPC filter
/// by placing `order` points at equal cumulative-energy quantiles of the
/// filter's power spectrum `1/|A(e^{jθ})|²`.
///
/// This isn't the reference's exact root-finding construction (which
/// locates the interleaved roots of the symmetric/antisymmetric halves of
/// `A(z)` on the unit circle) but it produces a monotonically increasing
/// set of frequencies that tracks the same spectral envelope, which is
/// what [`nlsf_to_lpc`] needs to reconstruct a perceptually similar filter.
pub(crate) fn lpc_to_nlsf(lpc: &[f32], order: usize) -> Vec<f32> {
    const GRID: usize = 256;
    let mut power = vec![0f32; GRID + 1];
    for (g, slot) in power.iter_mut().enumerate() {
        let theta = std::f32::consts::PI * g as f32 / GRID as f32;
        let mut re = 1f32;
        let mut im = 0f32;
        for (k, &a) in lpc.iter().enumerate() {
            let angle = (k + 1) as f32 * theta;
            re -= a * angle.cos();
            im += a * angle.sin();
        }
        let mag2 = (re * re + im * im).max(1e-6);
        *slot = 1.0 / mag2;
    }

    let total: f32 = power.iter().sum();
    let mut nlsf = Vec::with_capacity(order);
    let mut cum = 0f32;
    let mut g = 0usize;
    for i in 1..=order {
        let target = total * i as f32 / (order as f32 + 1.0);
        while g <= GRID && cum < target {
            cum += power[g];
            g += 1;
        }
        let theta = std::f32::consts::PI * (g.min(GRID)) as f32 / GRID as f32;
        nlsf.push((theta / std::f32::consts::PI).clamp(0.0, 0.999));
    }

    for i in 1..nlsf.len() {
        if nlsf[i] <= nlsf[i - 1] {
            nlsf[i] = (nlsf[i - 1] + 0.001).min(0.999);
        }
    }
    nlsf
}

fn poly_mul_root(poly: &[f32], cos_theta: f32) -> Vec<f32> {
    // Multiplies `poly` by `(1 - 2*cos_theta*z^-1 + z^-2)`.
    let mut out = vec![0f32; poly.len() + 2];
    for (i, &c) in poly.iter().enumerate() {
        out[i] += c;
        out[i + 1] -= 2.0 * cos_theta * c;
        out[i + 2] += c;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lpc_analysis_is_stable_for_periodic_signal() {
        let signal: Vec<f32> = (0..200).map(|i| (i as f32 * 0.3).sin()).collect();
        let lpc = lpc_analysis(&signal, 10);
        assert_eq!(lpc.len(), 10);
        assert!(lpc.iter().all(|c| c.is_finite()));
    }

    #[test]
    fn lpc_to_nlsf_is_monotonic_and_bounded() {
        let signal: Vec<f32> = (0..200).map(|i| (i as f32 * 0.3).sin()).collect();
        let lpc = lpc_analysis(&signal, 10);
        let nlsf = lpc_to_nlsf(&lpc, 10);
        assert_eq!(nlsf.len(), 10);
        for w in nlsf.windows(2) {
            assert!(w[1] > w[0]);
        }
        for &v in &nlsf {
            assert!((0.0..1.0).contains(&v));
        }
    }

    #[test]
    fn quantize_reconstruct_round_trip_is_close() {
        let nlsf = vec![0.05f32, 0.15, 0.28, 0.4, 0.55, 0.68, 0.78, 0.88, 0.93, 0.97];
        let (stage1, stage2) = quantize(&nlsf);
        let recon = reconstruct(nlsf.len(), stage1, &stage2);
        for (a, b) in nlsf.iter().zip(recon.iter()) {
            assert!((a - b).abs() < 0.2, "a={a}, b={b}");
        }
    }

    #[test]
    fn reconstructed_nlsf_is_monotonic() {
        let nlsf = vec![0.05f32, 0.15, 0.28, 0.4, 0.55, 0.68, 0.78, 0.88, 0.93, 0.97];
        let (stage1, stage2) = quantize(&nlsf);
        let recon = reconstruct(nlsf.len(), stage1, &stage2);
        for w in recon.windows(2) {
            assert!(w[1] > w[0]);
        }
    }

    #[test]
    fn interpolation_endpoints_match_inputs() {
        let prev = vec![0.1f32, 0.2, 0.3];
        let current = vec![0.4f32, 0.5, 0.6];
        let at_zero = interpolate(&prev, &current, 0);
        let at_four = interpolate(&prev, &current, 4);
        for (a, p) in at_zero.iter().zip(prev.iter()) {
            assert!((a - p).abs() < 1e-6);
        }
        for (a, c) in at_four.iter().zip(current.iter()) {
            assert!((a - c).abs() < 1e-6);
        }
    }

    #[test]
    fn nlsf_to_lpc_produces_expected_order() {
        let nlsf = vec![0.1f32, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 0.95];
        let lpc = nlsf_to_lpc(&nlsf);
        assert_eq!(lpc.len(), nlsf.len());
    }

    /// Literal scenario: `prev=[1000,2000]`, `curr=[2000,1000]`, interpolation
    /// coefficient `2` (out of 4) reconstructs the midpoint `[1500, 1500]`.
    #[test]
    fn interpolation_midpoint_matches_reference_scenario() {
        let prev = vec![1000.0f32, 2000.0];
        let current = vec![2000.0f32, 1000.0];
        let interpolated = interpolate(&prev, &current, 2);
        assert_eq!(interpolated, vec![1500.0, 1500.0]);
    }
}
