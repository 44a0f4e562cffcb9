//! Implements the CELT decoder.

use crate::celt::bands::{self, EnergyPredictor};
use crate::celt::comb_filter::{self, comb_filter_inplace, PostfilterParams};
use crate::celt::mdct::Mdct;
use crate::celt::mode::CeltMode;
use crate::celt::tables::{self, NUM_BANDS, SPREAD_ICDF};
use crate::celt::{allocator, pvq};
use crate::range_coder::RangeDecoder;
use crate::{Channels, DecoderError, SamplingRate};

/// Per-channel decoder history, carried across frames for overlap-add and
/// the postfilter/comb filter, which both reach back into previously
/// decoded samples.
#[derive(Clone, Debug)]
struct ChannelState {
    /// Tail of the previous frame's synthesis, kept for overlap-add.
    mdct_overlap: Vec<f32>,
    /// Enough decoded history to let the comb filter reach back
    /// [`comb_filter::PITCH_MAX_PERIOD`] samples plus a few taps.
    history: Vec<f32>,
    energy: EnergyPredictor,
    postfilter: Option<PostfilterParams>,
    deemphasis_mem: f32,
}

impl ChannelState {
    fn new(_mdct_size: usize) -> Self {
        Self {
            mdct_overlap: vec![0.0; tables::OVERLAP],
            history: vec![0.0; comb_filter::PITCH_MAX_PERIOD + 4],
            energy: EnergyPredictor::default(),
            postfilter: None,
            deemphasis_mem: 0.0,
        }
    }

    fn reset(&mut self) {
        self.mdct_overlap.iter_mut().for_each(|v| *v = 0.0);
        self.history.iter_mut().for_each(|v| *v = 0.0);
        self.energy.reset();
        self.postfilter = None;
        self.deemphasis_mem = 0.0;
    }
}

/// The CELT decoder.
#[derive(Clone, Debug)]
pub(crate) struct CeltDecoder {
    channels: Channels,
    sampling_rate: SamplingRate,
    channel_state: Vec<ChannelState>,
    last_pitch: u32,
}

impl CeltDecoder {
    /// Creates a new CELT decoder.
    pub(crate) fn new(
        sampling_rate: SamplingRate,
        channels: Channels,
    ) -> Result<Self, DecoderError> {
        // LM=3 (20ms @ 48kHz) is the largest frame this mode supports; size
        // the overlap/history buffers for the worst case so switching frame
        // sizes frame-to-frame never requires a reallocation.
        let mode = CeltMode::new(3);
        let num_channels = match channels {
            Channels::Mono => 1,
            Channels::Stereo => 2,
        };
        Ok(Self {
            channels,
            sampling_rate,
            channel_state: (0..num_channels)
                .map(|_| ChannelState::new(mode.mdct_size))
                .collect(),
            last_pitch: 0,
        })
    }

    /// Resets the CELT decoder.
    pub(crate) fn reset(&mut self) -> Result<(), DecoderError> {
        for ch in &mut self.channel_state {
            ch.reset();
        }
        self.last_pitch = 0;
        Ok(())
    }

    /// Gets the pitch of the last decoded frame.
    pub(crate) fn pitch(&self) -> u32 {
        self.last_pitch
    }

    /// Decodes one CELT frame, writing interleaved `f32` samples to `out`.
    ///
    /// `lm` selects the frame size (`120 << lm` samples at 48 kHz).
    pub(crate) fn decode(
        &mut self,
        dec: &mut RangeDecoder,
        lm: usize,
        out: &mut [f32],
    ) -> Result<(), DecoderError> {
        let mode = CeltMode::new(lm);
        let num_channels = self.channel_state.len();
        let frame_size = mode.mdct_size;

        let silence = dec.decode_bit_logp(15);
        let postfilter_present = dec.decode_bit_logp(1);
        let transient = if lm > 0 {
            dec.decode_bit_logp(3)
        } else {
            false
        };
        let intra = dec.decode_bit_logp(3);

        let new_postfilter = if postfilter_present {
            comb_filter::decode_postfilter(dec, true)
        } else {
            None
        };

        let mut per_channel_pcm = vec![vec![0f32; frame_size]; num_channels];

        for ch in 0..num_channels {
            let coarse = self.channel_state[ch]
                .energy
                .decode_coarse(dec, NUM_BANDS, lm, intra);

            if silence {
                per_channel_pcm[ch].iter_mut().for_each(|v| *v = 0.0);
                self.channel_state[ch].postfilter = None;
                continue;
            }

            let (tf_changed, tf_select) = crate::celt::tf::decode_tf(dec, NUM_BANDS, lm, transient);
            let _spread = dec.decode_icdf(&SPREAD_ICDF, 5);
            let trim_symbol = dec.decode_icdf(&tables::TRIM_ICDF, 7);
            let trim = allocator::trim_value(trim_symbol);

            let remaining = dec.tell_frac() as i32;
            let total_bits = ((frame_size as i32 * 8).saturating_sub(remaining)).max(0) as u32;
            let alloc = allocator::allocate(total_bits, NUM_BANDS, &mode.caps, trim);

            let fine = bands::decode_fine(dec, &coarse, &alloc.fine_bits);

            let mut spectrum = vec![0f32; frame_size];
            for b in 0..NUM_BANDS {
                let lo = mode.ebands[b];
                let hi = mode.ebands[b + 1];
                let width = hi - lo;
                let pulse_bits = alloc.pulse_bits[b];
                // Convert 1/8-bit units into an approximate pulse count
                // via the standard `bits ~= N/2 * log2(K)` PVQ cost model.
                let k = bits_to_pulses(pulse_bits, width);
                let band = if k == 0 {
                    vec![0i32; width]
                } else {
                    pvq::decode_vector(dec, width, k)
                };
                let shape = pvq::normalize(&band);
                let band_energy = 2f32.powf(fine[b]);
                for (s, coeff) in spectrum[lo..hi].iter_mut().zip(shape.iter()) {
                    *s = coeff * band_energy;
                }
            }
            let _ = tf_changed;
            let _ = tf_select;

            let state = &mut self.channel_state[ch];
            let mdct = Mdct::new(frame_size);
            let mut time = vec![0f32; 2 * frame_size];
            mdct.inverse(&spectrum, &mut time);

            let window = crate::celt::mode::window();
            let overlap_len = window.len().min(frame_size);
            for i in 0..overlap_len {
                per_channel_pcm[ch][i] = time[i] * window[i] + state.mdct_overlap[i];
            }
            for i in overlap_len..frame_size {
                per_channel_pcm[ch][i] = time[i];
            }
            for i in 0..overlap_len {
                state.mdct_overlap[i] = time[frame_size + i] * window[overlap_len - 1 - i];
            }

            apply_postfilter(state, &mut per_channel_pcm[ch], new_postfilter);
            state.postfilter = new_postfilter;
        }

        if let Some(p) = new_postfilter {
            self.last_pitch = p.period as u32;
        }

        interleave(&per_channel_pcm, out);
        Ok(())
    }
}

/// Approximates the number of PVQ pulses affordable with `bits` (1/8-bit
/// units) in an `n`-dimensional band, via the standard PVQ rate estimate
/// `bits/8 ~= n/2 * log2(2*k/n + 1)`.
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

fn apply_postfilter(
    state: &mut ChannelState,
    pcm: &mut [f32],
    new_params: Option<PostfilterParams>,
) {
    let old = state.postfilter.unwrap_or_default();
    let new = new_params.unwrap_or_default();
    if old.gain == 0.0 && new.gain == 0.0 {
        return;
    }
    let n = pcm.len();
    let hist_len = state.history.len();
    let mut extended = vec![0f32; hist_len + n];
    extended[..hist_len].copy_from_slice(&state.history);
    extended[hist_len..].copy_from_slice(pcm);

    comb_filter_inplace(
        &mut extended,
        hist_len,
        old.period,
        new.period,
        n,
        old.gain,
        new.gain,
        old.tapset,
        new.tapset,
        crate::celt::tables::OVERLAP.min(n),
    );

    pcm.copy_from_slice(&extended[hist_len..]);
    let keep = hist_len.min(extended.len());
    state.history.copy_from_slice(&extended[extended.len() - keep..]);
}

fn interleave(channels: &[Vec<f32>], out: &mut [f32]) {
    let num_channels = channels.len();
    if num_channels == 1 {
        out[..channels[0].len()].copy_from_slice(&channels[0]);
        return;
    }
    for (i, frame) in out.chunks_mut(num_channels).enumerate() {
        for (ch, sample) in frame.iter_mut().enumerate() {
            *sample = channels[ch][i];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range_coder::RangeEncoder;

    #[test]
    fn decode_silence_frame_is_all_zero() {
        let mut buffer = vec![0u8; 64];
        let mut enc = RangeEncoder::new(&mut buffer);
        enc.encode_bit_logp(1, 15).unwrap(); // silence
        enc.encode_bit_logp(0, 1).unwrap(); // no postfilter
        enc.encode_bit_logp(0, 3).unwrap(); // intra = false
        let mut pred = EnergyPredictor::default();
        let log_energy = vec![-28.0f32; NUM_BANDS];
        pred.encode_coarse(&mut enc, &log_energy, 0, false).unwrap();
        enc.done().unwrap();
        drop(enc);

        let mut dec = RangeDecoder::new(&buffer);
        let mut celt_dec = CeltDecoder::new(SamplingRate::Hz48000, Channels::Mono).unwrap();
        let frame_size = CeltMode::new(0).mdct_size;
        let mut out = vec![1.0f32; frame_size];
        celt_dec.decode(&mut dec, 0, &mut out).unwrap();
        assert!(out.iter().all(|&v| v == 0.0));
    }
}
