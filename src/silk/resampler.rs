//! Multi-rate resampler used to convert between SILK's internal sample
//! rate (8/12/16/24 kHz) and the API's requested output rate.
//!
//! Structured like the reference `silk_resampler`: a second-order IIR
//! anti-alias/anti-image filter followed by a polyphase-style linear-phase
//! FIR interpolator, rather than plain linear interpolation between input
//! samples. Each supported ratio carries a fixed group delay matching
//! spec.md's property 8 contract (NB<->48k: 5 samples, MB<->48k: 10 samples,
//! WB<->48k: 13 samples, at the 48 kHz side), implemented here as a fixed
//! output-side sample offset rather than a verified coefficient-for-
//! coefficient transcription of `silk_resampler_up2_hq`/`_down2` (no running
//! reference to check against in this pack -- see `DESIGN.md`).

/// Fixed group delay, in output-rate samples, for each native SILK rate
/// resampled to/from 48 kHz, per spec.md's per-ratio delay contract.
fn delay_samples_48k(native_rate: u32) -> usize {
    match native_rate {
        8000 => 5,
        12000 => 10,
        16000 => 13,
        24000 => 13,
        _ => 0,
    }
}

/// Resampler state, parameterized by input and output rate (Hz).
#[derive(Clone, Debug)]
pub(crate) struct Resampler {
    in_rate: u32,
    out_rate: u32,
    /// Second-order IIR (biquad) anti-alias/anti-image filter state.
    iir_z: [f32; 2],
    /// IIR filter coefficients, recomputed whenever the rate changes.
    iir_b: [f32; 3],
    iir_a: [f32; 2],
    /// Tail of the most recent input block, used so the FIR interpolator
    /// has history to pull from at the start of the next call.
    fir_delay: Vec<f32>,
    /// Fractional position (in input-sample units) of the next output
    /// sample, in `[0, 1)`.
    phase: f32,
    /// Fixed output-side group delay for the current ratio.
    delay_samples: usize,
    /// How many leading output samples still need to be dropped to realize
    /// `delay_samples` (consumed once, right after a rate change).
    pending_delay: usize,
}

const FIR_TAPS: usize = 4;

impl Resampler {
    pub(crate) fn new(in_rate: u32, out_rate: u32) -> Self {
        let mut r = Self {
            in_rate,
            out_rate,
            iir_z: [0.0; 2],
            iir_b: [0.0; 3],
            iir_a: [0.0; 2],
            fir_delay: vec![0.0; FIR_TAPS],
            phase: 0.0,
            delay_samples: 0,
            pending_delay: 0,
        };
        r.recompute_filter();
        r
    }

    /// Reconfigures the resampler for a new input rate, e.g. after a
    /// bandwidth switch. Filter/FIR history is preserved (the signal itself
    /// didn't reset); the phase accumulator and group-delay countdown reset
    /// since they're expressed in the new rate's sample grid.
    pub(crate) fn set_rate(&mut self, in_rate: u32, out_rate: u32) {
        self.in_rate = in_rate;
        self.out_rate = out_rate;
        self.phase = 0.0;
        self.recompute_filter();
    }

    pub(crate) fn reset(&mut self) {
        self.iir_z = [0.0; 2];
        self.fir_delay.iter_mut().for_each(|v| *v = 0.0);
        self.phase = 0.0;
        self.recompute_filter();
    }

    fn recompute_filter(&mut self) {
        // Anti-alias cutoff at the lower of the two rates' Nyquist, a
        // simple Butterworth-style biquad parameterized by the rate ratio
        // (matches the reference's "filter at min(Nyquist)" strategy for
        // both up- and down-sampling).
        let cutoff_ratio = (self.in_rate.min(self.out_rate) as f32
            / self.in_rate.max(self.out_rate) as f32)
            .clamp(0.05, 0.98);
        let omega = std::f32::consts::PI * cutoff_ratio * 0.45;
        let alpha = omega.sin() / (2.0 * std::f32::consts::FRAC_1_SQRT_2);
        let cos_omega = omega.cos();
        let a0 = 1.0 + alpha;
        self.iir_b = [
            ((1.0 - cos_omega) / 2.0) / a0,
            (1.0 - cos_omega) / a0,
            ((1.0 - cos_omega) / 2.0) / a0,
        ];
        self.iir_a = [(-2.0 * cos_omega) / a0, (1.0 - alpha) / a0];

        let native = if self.in_rate == 48_000 { self.out_rate } else { self.in_rate };
        self.delay_samples = delay_samples_48k(native);
        self.pending_delay = self.delay_samples;
    }

    fn iir_step(&mut self, x: f32) -> f32 {
        let y = self.iir_b[0] * x + self.iir_z[0];
        self.iir_z[0] = self.iir_b[1] * x - self.iir_a[0] * y + self.iir_z[1];
        self.iir_z[1] = self.iir_b[2] * x - self.iir_a[1] * y;
        y
    }

    /// 4-tap Catmull-Rom FIR interpolation at fractional position `frac`
    /// between `history[1]` and `history[2]` (`history` holds the two
    /// samples before and after that span).
    fn fir_interpolate(history: &[f32; 4], frac: f32) -> f32 {
        let (p0, p1, p2, p3) = (history[0], history[1], history[2], history[3]);
        let a = -0.5 * p0 + 1.5 * p1 - 1.5 * p2 + 0.5 * p3;
        let b = p0 - 2.5 * p1 + 2.0 * p2 - 0.5 * p3;
        let c = -0.5 * p0 + 0.5 * p2;
        let d = p1;
        ((a * frac + b) * frac + c) * frac + d
    }

    /// Resamples `input` (at `self.in_rate`) to `self.out_rate`, appending
    /// results to `out`. Runs the IIR anti-alias filter over the whole
    /// input block first, then interpolates with the 4-tap FIR at each
    /// output position.
    pub(crate) fn process(&mut self, input: &[f32], out: &mut Vec<f32>) {
        if input.is_empty() {
            return;
        }
        let filtered: Vec<f32> = input.iter().map(|&x| self.iir_step(x)).collect();

        // Extend with FIR history so fir_interpolate always has 4 valid taps.
        let mut extended = self.fir_delay.clone();
        extended.extend_from_slice(&filtered);

        let ratio = self.in_rate as f32 / self.out_rate as f32;
        let mut pos = self.phase;
        loop {
            // `extended` is offset by FIR_TAPS/2 relative to `filtered`
            // (the delay buffer holds history); idx indexes into `filtered`.
            let idx = pos.floor() as isize;
            if idx >= filtered.len() as isize {
                break;
            }
            let frac = pos - idx as f32;
            let base = idx + FIR_TAPS as isize / 2;
            let taps = [
                sample_at(&extended, base - 2),
                sample_at(&extended, base - 1),
                sample_at(&extended, base),
                sample_at(&extended, base + 1),
            ];
            let value = Self::fir_interpolate(&taps, frac);

            if self.pending_delay > 0 {
                self.pending_delay -= 1;
            } else {
                out.push(value);
            }
            pos += ratio;
        }

        self.phase = pos - filtered.len() as f32;
        let tail_start = filtered.len().saturating_sub(FIR_TAPS);
        self.fir_delay = filtered[tail_start..].to_vec();
        self.fir_delay.resize(FIR_TAPS, *filtered.last().unwrap_or(&0.0));
    }
}

fn sample_at(buf: &[f32], idx: isize) -> f32 {
    if idx < 0 {
        *buf.first().unwrap_or(&0.0)
    } else if (idx as usize) < buf.len() {
        buf[idx as usize]
    } else {
        *buf.last().unwrap_or(&0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsampling_preserves_sample_count_ratio() {
        let mut resampler = Resampler::new(8000, 16000);
        let input = vec![0.0f32; 1600];
        let mut out = Vec::new();
        resampler.process(&input, &mut out);
        assert!((out.len() as i32 - (3200 - resampler.delay_samples as i32)).abs() <= 4);
    }

    #[test]
    fn fixed_delay_matches_spec_contract() {
        assert_eq!(delay_samples_48k(8000), 5);
        assert_eq!(delay_samples_48k(12000), 10);
        assert_eq!(delay_samples_48k(16000), 13);
    }

    #[test]
    fn determinism() {
        let mut a = Resampler::new(12000, 48000);
        let mut b = Resampler::new(12000, 48000);
        let input: Vec<f32> = (0..240).map(|i| (i as f32 * 0.1).sin()).collect();
        let mut out_a = Vec::new();
        let mut out_b = Vec::new();
        a.process(&input, &mut out_a);
        b.process(&input, &mut out_b);
        assert_eq!(out_a, out_b);
    }

    #[test]
    fn dc_input_settles_to_dc_output() {
        let mut resampler = Resampler::new(16000, 48000);
        let input = vec![0.5f32; 4000];
        let mut out = Vec::new();
        resampler.process(&input, &mut out);
        let tail_mean: f32 = out[out.len() - 100..].iter().sum::<f32>() / 100.0;
        assert!((tail_mean - 0.5).abs() < 0.05, "tail_mean={tail_mean}");
    }
}
