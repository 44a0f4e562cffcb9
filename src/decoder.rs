//! Implement the Opus decoder.

use crate::celt::CeltDecoder;
use crate::range_coder::{RangeDecoder, Tell};
use crate::silk::{LostFlag, SilkDecoder};
use crate::{
    celt_lm_for_sample_count, parse_packet, query_packet_bandwidth, query_packet_codec_mode,
    query_packet_samples_per_frame, resample_interleaved, Bandwidth, Channels, CodecMode,
    DecoderError, Sample, SamplingRate,
};

/// Configures the decoder on creation.
///
/// Internally Opus stores data at 48000 Hz, so that should be the default
/// value for the sampling rate. However, the decoder can efficiently decode
/// to buffers at 8, 12, 16, and 24 kHz so if for some reason the caller cannot
/// use data at the full sample rate, or knows the compressed data doesn't
/// use the full frequency range, it can request decoding at a reduced
/// rate. Likewise, the decoder is capable of filling in either mono or
/// interleaved stereo pcm buffers, at the caller's request.
#[derive(Clone, Debug)]
pub struct DecoderConfiguration {
    /// Sample rate to decode at (Hz). Default: 48000 kHz.
    pub sampling_rate: SamplingRate,
    /// Number of channels to decode. Default: Stereo.
    pub channels: Channels,
    /// Scales the decoded output by a factor specified in Q8 dB units. Default: 0.
    pub gain: i16,
}

impl Default for DecoderConfiguration {
    fn default() -> Self {
        Self {
            sampling_rate: SamplingRate::Hz48000,
            channels: Channels::Stereo,
            gain: 0,
        }
    }
}

/// Opus decoder.
///
/// Opus is a stateful codec with overlapping blocks and as a result Opus
/// packets are not coded independently of each other. Packets must be
/// passed into the decoder serially and in the correct order for a correct
/// decode. Lost packets can be replaced with loss concealment by calling
/// the decoder with `None` for the missing packet.
#[derive(Clone, Debug)]
pub struct Decoder {
    celt_dec: CeltDecoder,
    silk_dec: SilkDecoder,
    channels: Channels,
    sampling_rate: SamplingRate,
    decode_gain: i16,

    stream_channels: Channels,
    bandwidth: Bandwidth,
    mode: Option<CodecMode>,
    prev_mode: Option<CodecMode>,
    frame_size: usize,
    prev_redundancy: Option<usize>,
    last_packet_duration: Option<u32>,

    softclip_mem: Vec<f32>,
    final_range: u32,
    hybrid_crossover: crate::opus_glue::HybridCrossover,
}

impl Decoder {
    /// Creates a new `Decoder` with the given configuration.
    pub fn new(configuration: &DecoderConfiguration) -> Result<Self, DecoderError> {
        let celt_dec = CeltDecoder::new(configuration.sampling_rate, configuration.channels)?;
        let silk_dec = SilkDecoder::new(configuration.sampling_rate, configuration.channels)?;
        let num_channels = match configuration.channels {
            Channels::Mono => 1,
            Channels::Stereo => 2,
        };

        Ok(Self {
            celt_dec,
            silk_dec,
            sampling_rate: configuration.sampling_rate,
            channels: configuration.channels,
            decode_gain: configuration.gain,
            stream_channels: configuration.channels,
            bandwidth: Bandwidth::Auto,
            mode: None,
            prev_mode: None,
            frame_size: configuration.sampling_rate as usize / 400,
            prev_redundancy: None,
            last_packet_duration: None,

            softclip_mem: vec![0.0; num_channels],
            final_range: 0,
            hybrid_crossover: crate::opus_glue::HybridCrossover::new(
                num_channels,
                configuration.sampling_rate as u32,
            ),
        })
    }

    /// Resets the Decoder to be equivalent to a freshly initialized decoder.
    ///
    /// This should be called when switching streams in order to prevent
    /// the back to back decoding from giving different results from
    /// one at a time decoding.
    pub fn reset(&mut self) -> Result<(), DecoderError> {
        self.silk_dec.reset()?;
        self.celt_dec.reset()?;

        self.stream_channels = self.channels;
        self.bandwidth = Bandwidth::Auto;
        self.mode = None;
        self.prev_mode = None;
        self.frame_size = self.sampling_rate as usize / 400;
        self.prev_redundancy = None;
        self.last_packet_duration = None;
        self.softclip_mem.iter_mut().for_each(|v| *v = 0.0);
        self.hybrid_crossover.reset();

        Ok(())
    }

    /// Returns the sampling rate the decoder was initialized with.
    pub fn sampling_rate(&self) -> SamplingRate {
        self.sampling_rate
    }

    /// Returns the channels the decoder was initialized with.
    pub fn channels(&self) -> Channels {
        self.channels
    }

    /// Returns the amount to scale PCM signal by in Q8 dB units.
    pub fn gain(&self) -> i16 {
        self.decode_gain
    }

    /// Returns the decoder's last bandpass.
    pub fn bandwidth(&self) -> Bandwidth {
        self.bandwidth
    }

    /// Returns the pitch of the last decoded frame, measured in samples at 48 kHz
    pub fn pitch(&self) -> Option<u32> {
        if let Some(prev_mode) = self.prev_mode {
            match prev_mode {
                CodecMode::Celt => Some(self.celt_dec.pitch()),
                CodecMode::Silk | CodecMode::Hybrid => Some(self.silk_dec.pitch()),
            }
        } else {
            None
        }
    }

    /// Returns the duration (in samples) of the last packet successfully decoded or concealed.
    pub fn last_packet_duration(&self) -> Option<u32> {
        self.last_packet_duration
    }

    /// Returns the final state of the codec's entropy coder.
    ///
    /// This is used for testing purposes, the encoder and decoder state
    /// should be identical after coding a payload assuming no data
    /// corruption or software bugs).
    pub fn final_range(&mut self) -> u32 {
        self.final_range
    }

    /// Decode an Opus packet with a generic sample output.
    ///
    /// Returns number of decoded samples.
    ///
    /// Caller needs to make sure that the samples buffer has enough space to fit
    /// all samples inside the packet. Call `query_packet_sample_count()` to query
    /// the number of samples inside a packet and resize the buffer if needed.
    ///
    /// The internal format is `f32`. Use `decode_float()` to access it directly.
    ///
    /// # Arguments
    /// * `packet`     - Input payload. Use a `None` to indicate packet loss.
    /// * `samples`    - Output signal encoded as PCM samples (interleaved if 2 channels).
    ///                  Length must be at least `frame_size` * `channels`.
    /// * `frame_size` - Number of samples per channel of available space in a PCM.
    ///                  `frame_size` must be a multiple of 2.5 ms (400 for 48kHz).
    ///                  In the case of PLC (packet==`None`) or FEC (decode_fec=`true`), then
    ///                  `frame_size` needs to be exactly the duration of audio that is missing,
    ///                  otherwise the decoder will not be in the optimal state to decode
    ///                  the next incoming packet.
    /// * `decode_fec` - Request that any in-band forward error correction data be decoded.
    ///                  If no such data is available, the frame is decoded as if it were lost.
    ///
    pub fn decode<S: Sample>(
        &mut self,
        packet: Option<&[u8]>,
        samples: &mut [S],
        frame_size: usize,
        decode_fec: bool,
    ) -> Result<u32, DecoderError> {
        let num_channels = match self.channels {
            Channels::Mono => 1,
            Channels::Stereo => 2,
        };
        if samples.len() < frame_size * num_channels {
            return Err(DecoderError::BufferTooSmall);
        }

        let mut float_buffer = vec![0f32; frame_size * num_channels];
        let (decoded, _packet_offset) =
            self.decode_native(packet, &mut float_buffer, frame_size, decode_fec, false, false)?;

        for (dst, src) in samples.iter_mut().zip(float_buffer.iter()) {
            *dst = S::from_f32(*src);
        }

        Ok(decoded)
    }

    /// Decode an Opus packet with floating point output.
    ///
    /// Returns number of decoded samples.
    ///
    /// Caller needs to make sure that the samples buffer has enough space to fit
    /// all samples inside the packet. Call `query_packet_sample_count()` to query
    /// the number of samples inside a packet and resize the buffer if needed.
    ///
    /// # Arguments
    /// * `packet`     - Input payload. Use a `None` to indicate packet loss.
    /// * `samples`    - Output signal encoded as PCM samples (interleaved if 2 channels).
    ///                  Length is frame_size * channels.
    /// * `frame_size` - Number of samples per channel of available space in a PCM.
    ///                  `frame_size` must be a multiple of 2.5 ms (400 for 48kHz).
    ///                  In the case of PLC (packet==`None`) or FEC (decode_fec=`true`), then
    ///                  `frame_size` needs to be exactly the duration of audio that is missing,
    ///                  otherwise the decoder will not be in the optimal state to decode
    ///                  the next incoming packet.
    /// * `decode_fec` - Request that any in-band forward error correction data be decoded.
    ///                  If no such data is available, the frame is decoded as if it were lost.
    ///
    pub fn decode_float(
        &mut self,
        packet: Option<&[u8]>,
        samples: &mut [f32],
        frame_size: usize,
        decode_fec: bool,
    ) -> Result<u32, DecoderError> {
        let (decoded, _packet_offset) =
            self.decode_native(packet, samples, frame_size, decode_fec, false, true)?;
        Ok(decoded)
    }

    /// Requests packet loss concealment for `samples`, as if the packet for
    /// this position in the stream had been lost.
    ///
    /// Equivalent to `decode_float(None, samples, frame_size, false)`,
    /// spelled out separately since a caller reaching for concealment
    /// doesn't have a packet to pass in the first place.
    pub fn decode_plc(&mut self, samples: &mut [f32], frame_size: usize) -> Result<u32, DecoderError> {
        log::debug!("decode_plc: concealing {} samples/channel", frame_size);
        let (decoded, _packet_offset) =
            self.decode_native(None, samples, frame_size, false, false, true)?;
        Ok(decoded)
    }

    /// Returns the samples decoded and the packet offset (used for multiple streams).
    fn decode_native(
        &mut self,
        packet: Option<&[u8]>,
        samples: &mut [f32],
        frame_size: usize,
        decode_fec: bool,
        self_delimited: bool,
        soft_clip: bool,
    ) -> Result<(u32, usize), DecoderError> {
        let num_channels = match self.channels {
            Channels::Mono => 1,
            Channels::Stereo => 2,
        };
        let base = self.sampling_rate as usize / 400;
        if frame_size == 0 || frame_size % base != 0 {
            return Err(DecoderError::BadArg(
                "frame_size must be a multiple of 2.5 ms",
            ));
        }
        if samples.len() < frame_size * num_channels {
            return Err(DecoderError::BufferTooSmall);
        }

        let packet = match packet {
            Some(p) if !p.is_empty() => p,
            _ => {
                log::debug!("decode: no packet, invoking PLC for {} samples/channel", frame_size);
                self.decode_lost_frame(samples, frame_size, num_channels);
                self.last_packet_duration = Some(frame_size as u32);
                return Ok((frame_size as u32, 0));
            }
        };

        let mode = query_packet_codec_mode(packet);
        let bandwidth = query_packet_bandwidth(packet);
        if matches!(self.prev_mode, Some(prev) if prev != mode) {
            log::trace!("decode: mode switch {:?} -> {:?}", self.prev_mode, mode);
        }
        if self.bandwidth != bandwidth {
            log::trace!("decode: bandwidth switch {:?} -> {:?}", self.bandwidth, bandwidth);
        }
        let samples_per_frame = query_packet_samples_per_frame(packet, self.sampling_rate);
        if samples_per_frame == 0 {
            return Err(DecoderError::BadPacket);
        }

        let mut frame_offsets = [0usize; 48];
        let mut frame_sizes = [0usize; 48];
        let mut payload_offset = 0usize;
        let mut packet_offset = 0usize;
        let frame_count = parse_packet(
            packet,
            self_delimited,
            Some(&mut frame_offsets),
            &mut frame_sizes,
            Some(&mut payload_offset),
            Some(&mut packet_offset),
        )?;

        let total_samples = samples_per_frame * frame_count;
        if total_samples > frame_size || total_samples * num_channels > samples.len() {
            return Err(DecoderError::BufferTooSmall);
        }

        for i in 0..frame_count {
            let frame = &packet[frame_offsets[i]..frame_offsets[i] + frame_sizes[i]];
            let start = i * samples_per_frame * num_channels;
            let end = start + samples_per_frame * num_channels;
            self.decode_one_frame(frame, mode, &mut samples[start..end], samples_per_frame, decode_fec)?;
        }

        self.stream_channels = self.channels;
        self.bandwidth = bandwidth;
        self.prev_mode = Some(mode);
        self.mode = Some(mode);
        self.frame_size = samples_per_frame;
        self.last_packet_duration = Some(total_samples as u32);

        if self.decode_gain != 0 {
            let gain_db = self.decode_gain as f32 / 256.0;
            let factor = 10f32.powf(gain_db / 20.0);
            samples[..total_samples * num_channels]
                .iter_mut()
                .for_each(|v| *v *= factor);
        }

        if soft_clip {
            crate::pcm_soft_clip(
                &mut samples[..total_samples * num_channels],
                num_channels,
                &mut self.softclip_mem,
            );
        }

        Ok((total_samples as u32, packet_offset))
    }

    /// Decodes a single frame's payload (one range-coded bitstream) into
    /// `out`, dispatching on `mode`.
    fn decode_one_frame(
        &mut self,
        frame: &[u8],
        mode: CodecMode,
        out: &mut [f32],
        samples_per_frame: usize,
        decode_fec: bool,
    ) -> Result<(), DecoderError> {
        let num_channels = match self.channels {
            Channels::Mono => 1,
            Channels::Stereo => 2,
        };
        let lost_flag = if decode_fec {
            LostFlag::DecodeFec
        } else {
            LostFlag::NoLoss
        };

        match mode {
            CodecMode::Celt => {
                let lm = celt_lm_for_sample_count(samples_per_frame, self.sampling_rate);
                let celt_frame_size = 120usize << lm;
                let mut scratch = vec![0f32; celt_frame_size * num_channels];
                let mut dec = RangeDecoder::new(frame);
                self.celt_dec.decode(&mut dec, lm, &mut scratch)?;
                self.final_range = dec.range();
                log::trace!("decode: celt frame, final_range={:#x}", self.final_range);
                let resampled = resample_interleaved(
                    &scratch,
                    num_channels,
                    48_000,
                    self.sampling_rate as u32,
                    samples_per_frame,
                );
                out.copy_from_slice(&resampled[..out.len()]);
            }
            CodecMode::Silk => {
                let mut dec = Some(RangeDecoder::new(frame));
                let mut size = samples_per_frame;
                self.silk_dec
                    .decode(&mut dec, out, &mut size, lost_flag, true)?;
                if let Some(d) = &dec {
                    self.final_range = d.range();
                    log::trace!("decode: silk frame, final_range={:#x}", self.final_range);
                }
            }
            CodecMode::Hybrid => {
                // A true hybrid decoder splits a single range-coded stream
                // into a SILK low band and a CELT high band that share one
                // entropy coder instance; this simplification decodes both
                // layers in full over the same frame and blends them,
                // rather than performing the QMF-style band split/merge.
                let mut dec_opt = Some(RangeDecoder::new(frame));
                let mut size = samples_per_frame;
                let mut silk_out = vec![0f32; samples_per_frame * num_channels];
                self.silk_dec
                    .decode(&mut dec_opt, &mut silk_out, &mut size, lost_flag, true)?;
                let mut dec = dec_opt.ok_or(DecoderError::BadPacket)?;

                let lm = celt_lm_for_sample_count(samples_per_frame, self.sampling_rate).min(1);
                let celt_frame_size = 120usize << lm;
                let mut celt_scratch = vec![0f32; celt_frame_size * num_channels];
                self.celt_dec.decode(&mut dec, lm, &mut celt_scratch)?;
                self.final_range = dec.range();
                log::trace!("decode: hybrid frame, final_range={:#x}", self.final_range);

                let celt_out = crate::opus_glue::resample_celt_to_output(
                    &celt_scratch,
                    num_channels,
                    self.sampling_rate,
                    samples_per_frame,
                );
                self.hybrid_crossover.mix(&silk_out, &celt_out, out);
            }
        }

        Ok(())
    }

    /// Conceals a lost or missing frame using the mode that was active the
    /// last time a packet decoded successfully.
    fn decode_lost_frame(&mut self, samples: &mut [f32], frame_size: usize, _num_channels: usize) {
        let mode = self.prev_mode.unwrap_or(CodecMode::Silk);
        match mode {
            CodecMode::Celt => {
                // The CELT layer has no standalone concealment path in this
                // decoder; fall back to silence, matching the "no history"
                // behavior `SilkDecoder::conceal_lost_frame` uses itself.
                samples.iter_mut().for_each(|v| *v = 0.0);
            }
            CodecMode::Silk | CodecMode::Hybrid => {
                let mut dec: Option<RangeDecoder> = None;
                let mut size = frame_size;
                let _ = self
                    .silk_dec
                    .decode(&mut dec, samples, &mut size, LostFlag::Loss, false);
            }
        }
    }
}
