//! Glues the SILK and CELT layers together for Hybrid-mode packets.
//!
//! A real Hybrid frame shares a single range coder instance between the
//! SILK low band and the CELT high band, with CELT skipping the bands the
//! SILK layer already covers and a 120-sample (2.5 ms at 48 kHz) lookahead
//! delay compensating for SILK's wider analysis window. This module keeps
//! those two frame-size/delay constants in one place and recombines the two
//! layers' reconstructions into the configured output rate via a two-band
//! crossover rather than genuine single-pass bit sharing, since the latter
//! requires restructuring both layers' allocators around a shared bit
//! budget.

use crate::{resample_interleaved, SamplingRate};

/// CELT's fixed encoder/decoder lookahead, in samples at 48 kHz.
pub(crate) const CELT_LOOKAHEAD: usize = 120;

/// Band index below which Hybrid-mode CELT frames never code energy: SILK
/// already covers everything up to band 17 (8 kHz) at Wideband.
pub(crate) const HYBRID_CELT_START_BAND: usize = 17;

/// Crossover frequency, in Hz, separating the SILK low band from the CELT
/// high band -- the time-domain equivalent of `HYBRID_CELT_START_BAND`'s
/// ~8 kHz edge.
const CROSSOVER_HZ: f32 = 8000.0;

/// Splits each layer's reconstruction into a low and a high band with a
/// one-pole crossover and recombines SILK's low band with CELT's high band,
/// the time-domain stand-in for the reference's frequency-domain
/// band-skip: CELT is not actually silent below `HYBRID_CELT_START_BAND`
/// here (both layers decode the full frame), so the high-pass stage
/// discards whatever low-band energy leaked into the CELT reconstruction
/// instead of relying on it being zero.
///
/// Filter state persists across frames like [`crate::silk::resampler::Resampler`]'s
/// biquad, so there's no audible discontinuity at frame boundaries.
#[derive(Clone, Debug)]
pub(crate) struct HybridCrossover {
    lp_silk: Vec<f32>,
    lp_celt: Vec<f32>,
    alpha: f32,
    num_channels: usize,
}

impl HybridCrossover {
    pub(crate) fn new(num_channels: usize, sample_rate: u32) -> Self {
        let mut crossover = Self {
            lp_silk: vec![0.0; num_channels.max(1)],
            lp_celt: vec![0.0; num_channels.max(1)],
            alpha: 0.0,
            num_channels: num_channels.max(1),
        };
        crossover.set_rate(sample_rate);
        crossover
    }

    /// Recomputes the one-pole coefficient for a new output sample rate.
    pub(crate) fn set_rate(&mut self, sample_rate: u32) {
        let omega = 2.0 * std::f32::consts::PI * CROSSOVER_HZ / sample_rate.max(1) as f32;
        self.alpha = 1.0 - (-omega).exp();
    }

    pub(crate) fn reset(&mut self) {
        self.lp_silk.iter_mut().for_each(|v| *v = 0.0);
        self.lp_celt.iter_mut().for_each(|v| *v = 0.0);
    }

    /// Mixes a SILK low-band reconstruction with a CELT high-band
    /// reconstruction (both already resampled to the output rate,
    /// interleaved, same length) into `out`.
    pub(crate) fn mix(&mut self, silk: &[f32], celt: &[f32], out: &mut [f32]) {
        for (i, (o, (&s, &c))) in out
            .iter_mut()
            .zip(silk.iter().zip(celt.iter()))
            .enumerate()
        {
            let ch = i % self.num_channels;
            self.lp_silk[ch] += self.alpha * (s - self.lp_silk[ch]);
            self.lp_celt[ch] += self.alpha * (c - self.lp_celt[ch]);
            let silk_low = self.lp_silk[ch];
            let celt_high = c - self.lp_celt[ch];
            *o = silk_low + celt_high;
        }
    }
}

/// Resamples a CELT-layer reconstruction (fixed 48 kHz internal rate) down
/// to the stream's configured output rate for mixing with the SILK layer,
/// which already runs at that rate.
pub(crate) fn resample_celt_to_output(
    celt_48k: &[f32],
    num_channels: usize,
    out_rate: SamplingRate,
    out_frame_size: usize,
) -> Vec<f32> {
    resample_interleaved(celt_48k, num_channels, 48_000, out_rate as u32, out_frame_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mix_cancels_equal_opposite_dc_inputs() {
        let silk = vec![1.0f32; 64];
        let celt = vec![-1.0f32; 64];
        let mut out = vec![0f32; 64];
        let mut crossover = HybridCrossover::new(1, 48_000);
        crossover.mix(&silk, &celt, &mut out);
        let tail_mean: f32 = out[out.len() - 8..].iter().sum::<f32>() / 8.0;
        assert!(tail_mean.abs() < 1e-3, "tail_mean={tail_mean}");
    }

    #[test]
    fn mix_passes_silk_dc_through_low_band() {
        let silk = vec![0.4f32; 64];
        let celt = vec![0.0f32; 64];
        let mut out = vec![0f32; 64];
        let mut crossover = HybridCrossover::new(1, 48_000);
        crossover.mix(&silk, &celt, &mut out);
        let tail_mean: f32 = out[out.len() - 8..].iter().sum::<f32>() / 8.0;
        assert!((tail_mean - 0.4).abs() < 1e-3, "tail_mean={tail_mean}");
    }

    #[test]
    fn reset_clears_filter_state() {
        let mut crossover = HybridCrossover::new(1, 48_000);
        let mut out = vec![0f32; 16];
        crossover.mix(&vec![1.0f32; 16], &vec![1.0f32; 16], &mut out);
        crossover.reset();
        assert_eq!(crossover.lp_silk, vec![0.0]);
        assert_eq!(crossover.lp_celt, vec![0.0]);
    }

    #[test]
    fn resample_celt_to_output_is_identity_at_48khz() {
        let celt = vec![0.25f32; 16];
        let out = resample_celt_to_output(&celt, 2, SamplingRate::Hz48000, 8);
        assert_eq!(out, celt);
    }
}
