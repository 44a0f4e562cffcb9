//! Implements the CELT encoder.

use crate::celt::bands::{self, EnergyPredictor};
use crate::celt::comb_filter::PostfilterParams;
use crate::celt::mdct::Mdct;
use crate::celt::mode::CeltMode;
use crate::celt::tables::{self, NUM_BANDS, SPREAD_ICDF};
use crate::celt::{allocator, pvq};
use crate::encoder_error::EncoderError;
use crate::range_coder::RangeEncoder;
use crate::{Channels, SamplingRate};

#[derive(Clone, Debug)]
struct ChannelState {
    mdct_overlap: Vec<f32>,
    energy: EnergyPredictor,
    postfilter: Option<PostfilterParams>,
}

impl ChannelState {
    fn new() -> Self {
        Self {
            mdct_overlap: vec![0.0; tables::OVERLAP],
            energy: EnergyPredictor::default(),
            postfilter: None,
        }
    }

    fn reset(&mut self) {
        self.mdct_overlap.iter_mut().for_each(|v| *v = 0.0);
        self.energy.reset();
        self.postfilter = None;
    }
}

/// The CELT encoder.
#[derive(Clone, Debug)]
pub(crate) struct CeltEncoder {
    channels: Channels,
    sampling_rate: SamplingRate,
    channel_state: Vec<ChannelState>,
    /// Encoder-side trim choice; a fixed middle trim is used since the
    /// perceptual trim heuristic (based on tonality/transient analysis) is
    /// out of scope for this encoder.
    trim: i32,
}

impl CeltEncoder {
    /// Creates a new CELT encoder.
    pub(crate) fn new(sampling_rate: SamplingRate, channels: Channels) -> Self {
        let num_channels = match channels {
            Channels::Mono => 1,
            Channels::Stereo => 2,
        };
        Self {
            channels,
            sampling_rate,
            channel_state: (0..num_channels).map(|_| ChannelState::new()).collect(),
            trim: 0,
        }
    }

    /// Resets the CELT encoder.
    pub(crate) fn reset(&mut self) {
        for ch in &mut self.channel_state {
            ch.reset();
        }
    }

    /// Encodes one CELT frame from interleaved `f32` input `pcm`.
    pub(crate) fn encode(
        &mut self,
        enc: &mut RangeEncoder,
        lm: usize,
        pcm: &[f32],
    ) -> Result<(), EncoderError> {
        let mode = CeltMode::new(lm);
        let num_channels = self.channel_state.len();
        let frame_size = mode.mdct_size;

        let mut deinterleaved = vec![vec![0f32; 2 * frame_size]; num_channels];
        for (i, frame) in pcm.chunks(num_channels).enumerate() {
            for (ch, &sample) in frame.iter().enumerate() {
                if i < frame_size {
                    deinterleaved[ch][frame_size + i] = sample;
                }
            }
        }
        for ch in 0..num_channels {
            deinterleaved[ch][..frame_size].copy_from_slice(&self.channel_state[ch].mdct_overlap_history(frame_size));
        }

        let silence = pcm.iter().all(|&v| v == 0.0);
        let transient = false;
        let intra = false;

        enc.encode_bit_logp(silence as u32, 15)?;
        enc.encode_bit_logp(0, 1)?; // no postfilter (pitch search out of scope for this encoder)
        if lm > 0 {
            enc.encode_bit_logp(transient as u32, 3)?;
        }
        enc.encode_bit_logp(intra as u32, 3)?;

        for ch in 0..num_channels {
            let mdct = Mdct::new(frame_size);
            let window = crate::celt::mode::window();
            let mut windowed = deinterleaved[ch].clone();
            let overlap_len = window.len().min(frame_size);
            for i in 0..overlap_len {
                windowed[i] *= window[i];
                windowed[2 * frame_size - 1 - i] *= window[overlap_len - 1 - i];
            }

            let mut spectrum = vec![0f32; frame_size];
            mdct.forward(&windowed, &mut spectrum);

            let log_energy = bands::compute_band_log_energy(&spectrum, &mode.ebands);
            self.channel_state[ch]
                .energy
                .encode_coarse(enc, &log_energy, lm, intra)?;

            if silence {
                continue;
            }

            let tf_changed = vec![false; NUM_BANDS];
            crate::celt::tf::encode_tf(enc, &tf_changed, lm, transient, false)?;
            enc.encode_icdf(0, &SPREAD_ICDF, 5)?;
            let trim_symbol = (self.trim + 5).clamp(0, 10) as usize;
            enc.encode_icdf(trim_symbol, &tables::TRIM_ICDF, 7)?;

            let remaining = enc.tell_frac() as i32;
            let total_bits = ((frame_size as i32 * 8).saturating_sub(remaining)).max(0) as u32;
            let alloc = allocator::allocate(total_bits, NUM_BANDS, &mode.caps, self.trim);

            let mut coarse_for_fine = Vec::with_capacity(NUM_BANDS);
            let mut pulses_per_band = Vec::with_capacity(NUM_BANDS);
            for b in 0..NUM_BANDS {
                let lo = mode.ebands[b];
                let hi = mode.ebands[b + 1];
                let width = hi - lo;
                let band_energy = 2f32.powf(log_energy[b]);
                let shape: Vec<f32> = if band_energy > 0.0 {
                    spectrum[lo..hi].iter().map(|v| v / band_energy).collect()
                } else {
                    vec![0.0; width]
                };
                let k = bits_to_pulses(alloc.pulse_bits[b], width);
                let pulses = if k == 0 {
                    vec![0i32; width]
                } else {
                    pvq::search_pulses(&shape, k)
                };
                pvq::encode_vector(enc, &pulses, k)?;
                pulses_per_band.push(pulses);
                coarse_for_fine.push(log_energy[b]);
            }

            bands::encode_fine(enc, &coarse_for_fine, &log_energy, &alloc.fine_bits)?;

            self.channel_state[ch]
                .mdct_overlap
                .copy_from_slice(&deinterleaved[ch][frame_size..frame_size + tables::OVERLAP]);
        }

        Ok(())
    }
}

impl ChannelState {
    fn mdct_overlap_history(&self, frame_size: usize) -> Vec<f32> {
        let mut out = vec![0f32; frame_size];
        let len = self.mdct_overlap.len().min(frame_size);
        out[frame_size - len..].copy_from_slice(&self.mdct_overlap[..len]);
        out
    }
}

/// Mirrors [`super::decoder::bits_to_pulses`]'s rate model so the encoder's
/// pulse count matches what the allocator actually paid for.
fn bits_to_pulses(bits: u32, n: usize) -> u32 {
    if n == 0 || bits == 0 {
        return 0;
    }
    let target_bits = bits as f32 / 8.0;
    let mut k = 0u32;
    loop {
        let cost = pvq::codebook_size(n, k + 1);
        let cost_bits = (cost.max(1) as f32).log2();
        if cost_bits > target_bits || k > 256 {
            break;
        }
        k += 1;
    }
    k
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::celt::decoder::CeltDecoder;
    use crate::DecoderError;

    #[test]
    fn encode_then_decode_silence_round_trips() {
        let mut buffer = vec![0u8; 4096];
        let frame_size = CeltMode::new(0).mdct_size;
        let pcm = vec![0f32; frame_size];

        let mut encoder = CeltEncoder::new(SamplingRate::Hz48000, Channels::Mono);
        let mut enc = RangeEncoder::new(&mut buffer);
        encoder.encode(&mut enc, 0, &pcm).unwrap();
        enc.done().unwrap();
        drop(enc);

        let mut dec = crate::range_coder::RangeDecoder::new(&buffer);
        let mut decoder = CeltDecoder::new(SamplingRate::Hz48000, Channels::Mono)
            .map_err(|e: DecoderError| e)
            .unwrap();
        let mut out = vec![1.0f32; frame_size];
        decoder.decode(&mut dec, 0, &mut out).unwrap();
        assert!(out.iter().all(|&v| v == 0.0));
    }
}
