//! A small complex DFT kernel used by the MDCT.
//!
//! The reference implementation factors the transform into a mixed-radix
//! (2/3/4/5) FFT over `N/4` points plus a pre/post rotation. That kernel is
//! fast but intricate to get right without a running reference to check
//! against. This module instead precomputes the full `N x N` twiddle matrix
//! and evaluates the DFT directly: `O(N^2)` instead of `O(N log N)`, but
//! exact for every `N` CELT uses (30, 60, 120, 240), not just power-of-two
//! sizes. See `DESIGN.md` for the tradeoff.
///
/// This code is originally from Mark Borgerding's KISS-FFT but has been
/// heavily modified to better suit Opus.
use crate::math::Complex;

/// A complex DFT of fixed size `n`, with its twiddle factors precomputed.
pub(crate) struct KissFft {
    n: usize,
    /// `twiddle[k*n + j] = exp(-2*pi*i*k*j/n)`.
    twiddle: Vec<Complex>,
}

impl KissFft {
    /// Builds the twiddle-factor table for a transform of size `n`.
    pub(crate) fn new(n: usize) -> Self {
        debug_assert!(n > 0);
        let mut twiddle = Vec::with_capacity(n * n);
        for k in 0..n {
            for j in 0..n {
                let angle = -2.0 * std::f32::consts::PI * (k * j) as f32 / n as f32;
                twiddle.push(Complex {
                    r: angle.cos(),
                    i: angle.sin(),
                });
            }
        }
        Self { n, twiddle }
    }

    /// Number of points this kernel transforms.
    pub(crate) fn size(&self) -> usize {
        self.n
    }

    /// Forward complex DFT: `out[k] = sum_j in[j] * exp(-2*pi*i*k*j/n)`.
    pub(crate) fn forward(&self, input: &[Complex], output: &mut [Complex]) {
        debug_assert_eq!(input.len(), self.n);
        debug_assert_eq!(output.len(), self.n);
        for (k, out) in output.iter_mut().enumerate() {
            let mut acc = Complex { r: 0.0, i: 0.0 };
            for (j, x) in input.iter().enumerate() {
                acc += *x * self.twiddle[k * self.n + j];
            }
            *out = acc;
        }
    }

    /// Inverse complex DFT (unnormalized: callers divide by `n` themselves
    /// if they need the exact inverse, matching the reference's convention
    /// of folding the `1/n` scale into the surrounding MDCT math).
    pub(crate) fn inverse(&self, input: &[Complex], output: &mut [Complex]) {
        debug_assert_eq!(input.len(), self.n);
        debug_assert_eq!(output.len(), self.n);
        for (k, out) in output.iter_mut().enumerate() {
            let mut acc = Complex { r: 0.0, i: 0.0 };
            for (j, x) in input.iter().enumerate() {
                // Conjugate the twiddle to invert the rotation direction.
                let tw = self.twiddle[j * self.n + k];
                acc += *x * Complex { r: tw.r, i: -tw.i };
            }
            *out = acc;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_then_inverse_is_identity_up_to_scale() {
        let n = 8;
        let fft = KissFft::new(n);
        let input: Vec<Complex> = (0..n)
            .map(|i| Complex {
                r: (i as f32 * 0.37).sin(),
                i: 0.0,
            })
            .collect();

        let mut freq = vec![Complex { r: 0.0, i: 0.0 }; n];
        fft.forward(&input, &mut freq);
        let mut back = vec![Complex { r: 0.0, i: 0.0 }; n];
        fft.inverse(&freq, &mut back);

        for i in 0..n {
            assert!((back[i].r / n as f32 - input[i].r).abs() < 1e-4);
        }
    }

    #[test]
    fn dc_component_matches_sum() {
        let n = 5;
        let fft = KissFft::new(n);
        let input: Vec<Complex> = (0..n).map(|i| Complex { r: i as f32, i: 0.0 }).collect();
        let mut freq = vec![Complex { r: 0.0, i: 0.0 }; n];
        fft.forward(&input, &mut freq);
        let expected: f32 = input.iter().map(|c| c.r).sum();
        assert!((freq[0].r - expected).abs() < 1e-3);
    }
}
