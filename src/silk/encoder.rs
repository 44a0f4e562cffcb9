//! Implements the Silk encoder.

use crate::encoder_error::EncoderError;
use crate::range_coder::RangeEncoder;
use crate::silk::nlsf;
use crate::silk::nsq::NsqState;
use crate::silk::resampler::Resampler;
use crate::silk::shell;
use crate::silk::stereo;
use crate::silk::tables::{GAIN_ICDF, GAIN_TABLE_Q10, LPC_ORDER_WB};
use crate::{Channels, SamplingRate};

#[derive(Clone, Debug)]
struct ChannelState {
    nsq: NsqState,
    prev_nlsf: Vec<f32>,
    resampler: Resampler,
}

impl ChannelState {
    fn new(order: usize, in_rate: u32, internal_rate: u32) -> Self {
        Self {
            nsq: NsqState::new(order),
            prev_nlsf: (0..order)
                .map(|i| (i as f32 + 1.0) / (order as f32 + 1.0))
                .collect(),
            resampler: Resampler::new(in_rate, internal_rate),
        }
    }

    fn reset(&mut self, order: usize) {
        self.nsq.reset();
        self.prev_nlsf = (0..order)
            .map(|i| (i as f32 + 1.0) / (order as f32 + 1.0))
            .collect();
        self.resampler.reset();
    }
}

/// The Silk encoder.
///
/// Mirrors [`super::decoder::SilkDecoder`]'s bitstream shape: per-channel
/// NLSF codewords, a range-coded gain index into [`GAIN_TABLE_Q10`], and the
/// excitation shell-coded by [`shell::encode_excitation`]. The pitch lag is
/// never transmitted — the decoder re-estimates it from its own decode
/// history, so the encoder doesn't need to agree on a codeword for it
/// either. Stereo predictor indices are transmitted once per frame, ahead of
/// the per-channel loop, mirroring [`stereo::decode_indices`]'s call site.
#[derive(Clone, Debug)]
pub(crate) struct SilkEncoder {
    sampling_rate: SamplingRate,
    channels: Channels,
    internal_sampling_rate: SamplingRate,
    lpc_order: usize,
    channel_state: Vec<ChannelState>,
}

impl SilkEncoder {
    /// Creates a new Silk encoder.
    pub(crate) fn new(sampling_rate: SamplingRate, channels: Channels) -> Self {
        let lpc_order = LPC_ORDER_WB;
        let num_channels = match channels {
            Channels::Mono => 1,
            Channels::Stereo => 2,
        };
        let internal_sampling_rate = SamplingRate::Hz16000;
        Self {
            sampling_rate,
            channels,
            internal_sampling_rate,
            lpc_order,
            channel_state: (0..num_channels)
                .map(|_| ChannelState::new(lpc_order, sampling_rate as u32, internal_sampling_rate as u32))
                .collect(),
        }
    }

    /// Resets the Silk encoder.
    pub(crate) fn reset(&mut self) {
        for ch in &mut self.channel_state {
            ch.reset(self.lpc_order);
        }
    }

    /// Sets the internal (native SILK) sampling rate, e.g. after a
    /// bandwidth change.
    pub(crate) fn set_internal_sampling_rate(&mut self, sampling_rate: SamplingRate) {
        self.internal_sampling_rate = sampling_rate;
        for ch in &mut self.channel_state {
            ch.resampler
                .set_rate(self.sampling_rate as u32, sampling_rate as u32);
        }
    }

    /// Encodes one SILK frame from interleaved `f32` input `pcm`
    /// (`frame_size` samples per channel, at `self.sampling_rate`).
    pub(crate) fn encode(
        &mut self,
        enc: &mut RangeEncoder,
        pcm: &[f32],
        frame_size: usize,
    ) -> Result<(), EncoderError> {
        let num_channels = self.channel_state.len();
        let order = self.lpc_order;

        let mut deinterleaved = vec![Vec::with_capacity(frame_size); num_channels];
        for frame in pcm.chunks(num_channels) {
            for (ch, &sample) in frame.iter().enumerate() {
                deinterleaved[ch].push(sample);
            }
        }

        let mut native: Vec<Vec<f32>> = Vec::with_capacity(num_channels);
        for (ch, samples) in deinterleaved.iter().enumerate() {
            let mut out = Vec::new();
            self.channel_state[ch].resampler.process(samples, &mut out);
            native.push(out);
        }

        let coded: Vec<Vec<f32>> = if num_channels == 2 {
            let (mid, side) = stereo::to_mid_side(&native[0], &native[1]);
            let predictor = stereo::StereoPredictor::fit(&mid, &side);
            let w0_q13 = (predictor.w0 * 8192.0).round() as i32;
            let w1_q13 = (predictor.w1 * 8192.0).round() as i32;
            let (ix0, ix1) = stereo::quantize_indices(w0_q13, w1_q13);
            stereo::encode_indices(enc, ix0, ix1)?;
            vec![mid, side]
        } else {
            native
        };

        for (ch, signal) in coded.iter().enumerate() {
            if signal.len() < order + 1 {
                // Not enough native-rate samples to run LPC analysis on
                // (e.g. the last partial frame); hold the previous filter.
                let held_nlsf = self.channel_state[ch].prev_nlsf.clone();
                self.encode_channel(enc, ch, signal, &held_nlsf)?;
                continue;
            }

            let lpc = nlsf::lpc_analysis(signal, order);
            let current_nlsf = nlsf::lpc_to_nlsf(&lpc, order);
            self.encode_channel(enc, ch, signal, &current_nlsf)?;
            self.channel_state[ch].prev_nlsf = current_nlsf;
        }

        Ok(())
    }

    fn encode_channel(
        &mut self,
        enc: &mut RangeEncoder,
        ch: usize,
        signal: &[f32],
        current_nlsf: &[f32],
    ) -> Result<(), EncoderError> {
        let (stage1, stage2) = nlsf::quantize(current_nlsf);
        nlsf::encode(enc, stage1, &stage2)?;

        // No subframe interpolation: always transmit "use current NLSF".
        const NO_INTERPOLATION: u32 = 4;
        enc.encode_uint(NO_INTERPOLATION, 5)?;

        let quantized_nlsf = nlsf::reconstruct(current_nlsf.len(), stage1, &stage2);
        let lpc = nlsf::nlsf_to_lpc(&quantized_nlsf);

        let gain_index = select_gain_index(signal);
        enc.encode_icdf(gain_index, &GAIN_ICDF, 3)?;
        let gain_q10 = GAIN_TABLE_Q10[gain_index];

        let state = &mut self.channel_state[ch];
        state.nsq.set_gain_q10(gain_q10);
        let pulses = state.nsq.quantize(signal, &lpc, 0.5);

        shell::encode_excitation(enc, &pulses)?;
        Ok(())
    }
}

/// Picks the [`GAIN_TABLE_Q10`] entry that keeps `signal`'s peak sample
/// using most of the NSQ's output alphabet without saturating, mirroring
/// the reference's "gain tracks subframe energy" behavior at a coarse,
/// per-table-entry level (see [`GAIN_TABLE_Q10`]'s doc comment for the
/// `out ~= sample_Q14 * gain_Q10 / 2^24` scaling this inverts).
fn select_gain_index(signal: &[f32]) -> usize {
    let peak = signal.iter().fold(0.0f32, |m, &s| m.max(s.abs())).max(1e-4);
    let target_gain_q10 = 16_384_000.0f32 / peak;
    GAIN_TABLE_Q10
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            (**a as f32 - target_gain_q10)
                .abs()
                .partial_cmp(&(**b as f32 - target_gain_q10).abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(i, _)| i)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::silk::decoder::{LostFlag, SilkDecoder};

    #[test]
    fn encode_then_decode_mono_round_trips_finite_output() {
        let frame_size = 320;
        let pcm: Vec<f32> = (0..frame_size)
            .map(|i| 0.3 * (i as f32 * 0.1).sin())
            .collect();

        let mut encoder = SilkEncoder::new(SamplingRate::Hz16000, Channels::Mono);
        let mut buffer = vec![0u8; 8192];
        let mut enc = RangeEncoder::new(&mut buffer);
        encoder.encode(&mut enc, &pcm, frame_size).unwrap();
        enc.done().unwrap();
        drop(enc);

        let mut dec = Some(crate::range_coder::RangeDecoder::new(&buffer));
        let mut decoder = SilkDecoder::new(SamplingRate::Hz16000, Channels::Mono).unwrap();
        let mut out = vec![0f32; frame_size];
        let mut out_len = frame_size;
        decoder
            .decode(&mut dec, &mut out, &mut out_len, LostFlag::NoLoss, true)
            .unwrap();
        assert!(out.iter().all(|s| s.is_finite()));
    }
}
