//! Per-band energy computation and quantization.
//!
//! CELT encodes spectral shape (via PVQ, see [`crate::celt::pvq`]) and
//! spectral envelope (per-band energy) separately. Energy is quantized in
//! two passes: a coarse pass using an inter-frame/intra-frame Laplace
//! predictor, and a fine pass that refines each band's coarse value with
//! uniformly-coded extra bits.

use crate::celt::tables::{
    BETA_COEF, BETA_INTRA, ENERGY_LAPLACE_DECAY, ENERGY_LAPLACE_START, NUM_BANDS, PRED_COEF,
};
use crate::range_coder::{RangeDecoder, RangeEncoder};

/// Energy values are clamped to this range (log2 domain) to keep the
/// predictor and fine-quantizer arithmetic well behaved across silence and
/// full-scale signal.
pub(crate) const ENERGY_CLAMP: f32 = 28.0;

/// Computes `log2(energy)` for each band of a (single-channel) MDCT spectrum.
pub(crate) fn compute_band_log_energy(spectrum: &[f32], ebands: &[usize]) -> Vec<f32> {
    let num_bands = ebands.len() - 1;
    let mut energy = Vec::with_capacity(num_bands);
    for b in 0..num_bands {
        let lo = ebands[b];
        let hi = ebands[b + 1];
        let sum: f32 = spectrum[lo..hi].iter().map(|x| x * x).sum();
        let mean = sum / (hi - lo).max(1) as f32;
        let log_e = if mean > 0.0 {
            0.5 * mean.log2()
        } else {
            -ENERGY_CLAMP
        };
        energy.push(log_e.clamp(-ENERGY_CLAMP, ENERGY_CLAMP));
    }
    energy
}

/// Coarse energy quantizer/predictor state, carried across frames.
#[derive(Clone, Debug)]
pub(crate) struct EnergyPredictor {
    /// Previous frame's quantized log2 energy per band, clamped to
    /// `[-28, 28]` per frame (the invariant the bit allocator and PLC rely
    /// on to keep the predictor numerically stable across silence).
    old_band_e: [f32; NUM_BANDS],
}

impl Default for EnergyPredictor {
    fn default() -> Self {
        Self {
            old_band_e: [-ENERGY_CLAMP; NUM_BANDS],
        }
    }
}

impl EnergyPredictor {
    /// Resets the predictor to silence (as if the previous frame had zero energy).
    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }

    /// Quantizes and encodes the coarse per-band log-energies, updating the
    /// predictor state for the next frame.
    pub(crate) fn encode_coarse(
        &mut self,
        enc: &mut RangeEncoder,
        log_energy: &[f32],
        lm: usize,
        intra: bool,
    ) -> Result<(), crate::encoder_error::EncoderError> {
        let pred = if intra { 0.0 } else { PRED_COEF[lm] };
        let beta = if intra { BETA_INTRA } else { BETA_COEF[lm] };
        let decay = ENERGY_LAPLACE_DECAY[lm];
        let start = ENERGY_LAPLACE_START[lm];

        let mut prev_residual = 0f32;
        for b in 0..log_energy.len() {
            let prediction = pred * self.old_band_e[b] + beta * prev_residual;
            let target = log_energy[b].clamp(-ENERGY_CLAMP, ENERGY_CLAMP);
            let residual = target - prediction;
            // Fixed-point Q7 residual, matching the coarse quantizer's
            // resolution of 1/8th of a `log2` step.
            let mut qi = (residual * 8.0).round() as i32;
            enc.encode_laplace(&mut qi, start, decay)?;
            let quantized_residual = qi as f32 / 8.0;
            let new_energy = (prediction + quantized_residual).clamp(-ENERGY_CLAMP, ENERGY_CLAMP);
            self.old_band_e[b] = new_energy;
            prev_residual = quantized_residual;
        }
        Ok(())
    }

    /// Decodes the coarse per-band log-energies, updating predictor state.
    pub(crate) fn decode_coarse(
        &mut self,
        dec: &mut RangeDecoder,
        num_bands: usize,
        lm: usize,
        intra: bool,
    ) -> Vec<f32> {
        let pred = if intra { 0.0 } else { PRED_COEF[lm] };
        let beta = if intra { BETA_INTRA } else { BETA_COEF[lm] };
        let decay = ENERGY_LAPLACE_DECAY[lm];
        let start = ENERGY_LAPLACE_START[lm];

        let mut out = Vec::with_capacity(num_bands);
        let mut prev_residual = 0f32;
        for b in 0..num_bands {
            let prediction = pred * self.old_band_e[b] + beta * prev_residual;
            let qi = dec.decode_laplace(start, decay);
            let quantized_residual = qi as f32 / 8.0;
            let new_energy = (prediction + quantized_residual).clamp(-ENERGY_CLAMP, ENERGY_CLAMP);
            self.old_band_e[b] = new_energy;
            prev_residual = quantized_residual;
            out.push(new_energy);
        }
        out
    }
}

/// Refines `coarse` band energies with `bits_per_band[b]` extra uniform
/// bits each, halving the quantization step per bit.
pub(crate) fn encode_fine(
    enc: &mut RangeEncoder,
    coarse: &[f32],
    actual: &[f32],
    bits_per_band: &[u32],
) -> Result<(), crate::encoder_error::EncoderError> {
    for b in 0..coarse.len() {
        let bits = bits_per_band[b];
        if bits == 0 {
            continue;
        }
        let steps = 1u32 << bits;
        let step_size = 1.0 / steps as f32;
        let offset = (actual[b] - coarse[b] + 0.5).clamp(0.0, 0.999_999);
        let q = ((offset / step_size) as u32).min(steps - 1);
        enc.encode_bits(q, bits)?;
    }
    Ok(())
}

/// Decodes the fine energy refinement, returning the final per-band energy.
pub(crate) fn decode_fine(dec: &mut RangeDecoder, coarse: &[f32], bits_per_band: &[u32]) -> Vec<f32> {
    let mut out = Vec::with_capacity(coarse.len());
    for (b, &base) in coarse.iter().enumerate() {
        let bits = bits_per_band[b];
        if bits == 0 {
            out.push(base);
            continue;
        }
        let steps = 1u32 << bits;
        let step_size = 1.0 / steps as f32;
        let q = dec.decode_bits(bits);
        let offset = (q as f32 + 0.5) * step_size - 0.5;
        out.push(base + offset);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coarse_energy_stays_within_clamp() {
        let mut rng_energy = vec![100.0f32; NUM_BANDS];
        rng_energy[0] = -1000.0;
        let clamped: Vec<f32> = rng_energy
            .iter()
            .map(|e| e.clamp(-ENERGY_CLAMP, ENERGY_CLAMP))
            .collect();
        assert!(clamped.iter().all(|e| e.abs() <= ENERGY_CLAMP));
    }

    #[test]
    fn coarse_round_trip() {
        let mut buffer = vec![0u8; 4096];
        let log_energy: Vec<f32> = (0..NUM_BANDS)
            .map(|i| (i as f32 * 0.37).sin() * 10.0)
            .collect();

        let mut enc_pred = EnergyPredictor::default();
        let mut enc = RangeEncoder::new(&mut buffer);
        enc_pred.encode_coarse(&mut enc, &log_energy, 2, true).unwrap();
        enc.done().unwrap();
        drop(enc);

        let mut dec_pred = EnergyPredictor::default();
        let mut dec = RangeDecoder::new(&buffer);
        let decoded = dec_pred.decode_coarse(&mut dec, NUM_BANDS, 2, true);

        for (a, b) in log_energy.iter().zip(decoded.iter()) {
            assert!((a - b).abs() < 1.0, "a = {a}, b = {b}");
        }
    }

    #[test]
    fn fine_refinement_round_trip() {
        let mut buffer = vec![0u8; 1024];
        let coarse = vec![1.0f32, 2.0, -3.0];
        let actual = vec![1.2f32, 1.9, -2.7];
        let bits = vec![3u32, 0, 4];

        let mut enc = RangeEncoder::new(&mut buffer);
        encode_fine(&mut enc, &coarse, &actual, &bits).unwrap();
        enc.done().unwrap();
        drop(enc);

        let mut dec = RangeDecoder::new(&buffer);
        let decoded = decode_fine(&mut dec, &coarse, &bits);
        for ((a, d), b) in actual.iter().zip(decoded.iter()).zip(bits.iter()) {
            if *b == 0 {
                continue;
            }
            assert!((a - d).abs() < 0.2, "a = {a}, d = {d}");
        }
    }
}
