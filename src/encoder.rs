//! Implements the Opus encoder.

use crate::celt::CeltEncoder;
use crate::encoder_error::EncoderError;
use crate::range_coder::{RangeEncoder, Tell};
use crate::silk::SilkEncoder;
use crate::{build_toc, resample_interleaved, toc_config};
use crate::{Bandwidth, Channels, CodecMode, SamplingRate};

/// Target application, selects which internal layer the encoder favors and
/// how aggressively it clamps the bandwidth.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Application {
    /// Voice over IP: tuned for speech, favors the SILK layer.
    Voip,
    /// General purpose audio: favors the CELT transform layer.
    Audio,
    /// Like [`Application::Audio`], but signals that the caller wants the
    /// smallest possible algorithmic delay.
    LowDelay,
}

/// Input signal type hint, passed through to the layer selection heuristic.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Signal {
    /// Let the encoder infer the signal type.
    Auto,
    /// The input is speech.
    Voice,
    /// The input is music or general audio.
    Music,
}

/// Configures the encoder on creation.
#[derive(Clone, Copy, Debug)]
pub struct EncoderConfiguration {
    /// Sampling rate of the input signal (Hz).
    pub sampling_rate: SamplingRate,
    /// Number of channels of the input signal.
    pub channels: Channels,
    /// Target application.
    pub application: Application,
}

/// Opus encoder.
///
/// Mirrors [`super::decoder::Decoder`]: a stateful wrapper around the SILK
/// and CELT layers that picks one of them per packet and assembles the TOC
/// byte and range-coded payload. This encoder only ever emits single-frame
/// packets (frame count code 0); it never produces Hybrid-mode packets,
/// since that requires a closed-loop SILK/CELT bit-split search that is out
/// of scope here, even though [`Decoder`](super::decoder::Decoder) can
/// still decode Hybrid packets from other encoders.
#[derive(Clone, Debug)]
pub struct Encoder {
    celt_enc: CeltEncoder,
    silk_enc: SilkEncoder,
    channels: Channels,
    sampling_rate: SamplingRate,
    application: Application,

    bitrate_bps: u32,
    vbr: bool,
    complexity: u8,
    signal: Signal,
    bandwidth: Bandwidth,

    final_range: u32,
}

impl Encoder {
    /// Creates a new `Encoder` with the given configuration.
    pub fn new(configuration: &EncoderConfiguration) -> Result<Self, EncoderError> {
        Ok(Self {
            celt_enc: CeltEncoder::new(configuration.sampling_rate, configuration.channels),
            silk_enc: SilkEncoder::new(configuration.sampling_rate, configuration.channels),
            channels: configuration.channels,
            sampling_rate: configuration.sampling_rate,
            application: configuration.application,
            bitrate_bps: 64_000,
            vbr: true,
            complexity: 10,
            signal: Signal::Auto,
            bandwidth: Bandwidth::Auto,
            final_range: 0,
        })
    }

    /// Resets the `Encoder` to be equivalent to a freshly initialized encoder.
    pub fn reset(&mut self) -> Result<(), EncoderError> {
        self.celt_enc.reset();
        self.silk_enc.reset();
        self.final_range = 0;
        Ok(())
    }

    /// Returns the sampling rate the encoder was initialized with.
    pub fn sampling_rate(&self) -> SamplingRate {
        self.sampling_rate
    }

    /// Returns the channels the encoder was initialized with.
    pub fn channels(&self) -> Channels {
        self.channels
    }

    /// Returns the application the encoder was initialized with.
    pub fn application(&self) -> Application {
        self.application
    }

    /// Sets the target bitrate in bits per second. Must be within `[6000, 510000]`.
    pub fn set_bitrate(&mut self, bits_per_second: i32) -> Result<(), EncoderError> {
        if !(6_000..=510_000).contains(&bits_per_second) {
            return Err(EncoderError::BadArg(
                "bitrate must be within [6000, 510000] bits per second",
            ));
        }
        self.bitrate_bps = bits_per_second as u32;
        Ok(())
    }

    /// Returns the currently configured target bitrate in bits per second.
    pub fn bitrate(&self) -> u32 {
        self.bitrate_bps
    }

    /// Sets the audio bandwidth to encode at, or `Bandwidth::Auto` to let
    /// the encoder pick one from the target application.
    pub fn set_bandwidth(&mut self, bandwidth: Bandwidth) {
        self.bandwidth = bandwidth;
    }

    /// Returns the currently configured bandwidth.
    pub fn bandwidth(&self) -> Bandwidth {
        self.bandwidth
    }

    /// Enables or disables variable bit-rate operation.
    pub fn set_vbr(&mut self, vbr: bool) {
        self.vbr = vbr;
    }

    /// Returns whether variable bit-rate operation is enabled.
    pub fn vbr(&self) -> bool {
        self.vbr
    }

    /// Sets the encoder complexity, from `0` (fastest) to `10` (best quality).
    pub fn set_complexity(&mut self, complexity: u8) -> Result<(), EncoderError> {
        if complexity > 10 {
            return Err(EncoderError::BadArg("complexity must be within [0, 10]"));
        }
        self.complexity = complexity;
        Ok(())
    }

    /// Returns the currently configured complexity.
    pub fn complexity(&self) -> u8 {
        self.complexity
    }

    /// Provides a hint about the type of input signal.
    pub fn set_signal(&mut self, signal: Signal) {
        self.signal = signal;
    }

    /// Returns the currently configured signal hint.
    pub fn signal(&self) -> Signal {
        self.signal
    }

    /// Returns the final state of the codec's entropy coder after the last
    /// successful `encode_frame` call.
    pub fn final_range(&self) -> u32 {
        self.final_range
    }

    /// Encodes one frame of interleaved `f32` PCM into `output`, returning
    /// the number of bytes written (the TOC byte plus the range-coded
    /// payload).
    ///
    /// `frame_size` is the number of samples per channel in `pcm`, and must
    /// be one of the durations the selected mode supports (2.5/5/10/20 ms
    /// for CELT, 10/20/40/60 ms for SILK).
    pub fn encode_frame(
        &mut self,
        pcm: &[f32],
        frame_size: usize,
        output: &mut [u8],
    ) -> Result<usize, EncoderError> {
        let num_channels = match self.channels {
            Channels::Mono => 1,
            Channels::Stereo => 2,
        };
        if pcm.len() < frame_size * num_channels {
            return Err(EncoderError::BadArg(
                "pcm buffer is shorter than frame_size * channels",
            ));
        }
        if output.is_empty() {
            return Err(EncoderError::BufferTooSmall);
        }

        let (mode, bandwidth) = select_mode(self.application, self.bandwidth);
        let config = toc_config(mode, bandwidth, self.sampling_rate, frame_size)?;
        output[0] = build_toc(config, self.channels == Channels::Stereo, 0);

        let bytes_written = {
            let mut enc = RangeEncoder::new(&mut output[1..]);

            match mode {
                CodecMode::Celt => {
                    let lm = crate::celt_lm_for_sample_count(frame_size, self.sampling_rate);
                    let celt_frame_size = 120usize << lm;
                    let resampled = resample_interleaved(
                        pcm,
                        num_channels,
                        self.sampling_rate as u32,
                        48_000,
                        celt_frame_size,
                    );
                    self.celt_enc.encode(&mut enc, lm, &resampled)?;
                }
                CodecMode::Silk => {
                    self.silk_enc.encode(&mut enc, pcm, frame_size)?;
                }
                CodecMode::Hybrid => {
                    return Err(EncoderError::InternalError(
                        "select_mode never returns Hybrid",
                    ));
                }
            }

            enc.done()?;
            self.final_range = enc.range();
            1 + enc.range_bytes()
        };

        Ok(bytes_written)
    }
}

/// Picks the coding mode and clamps the bandwidth to what that mode
/// supports, given the application and the caller's bandwidth request.
fn select_mode(application: Application, bandwidth: Bandwidth) -> (CodecMode, Bandwidth) {
    match application {
        Application::Voip => {
            let clamped = match bandwidth {
                Bandwidth::Auto => Bandwidth::Wideband,
                Bandwidth::Narrowband | Bandwidth::Mediumband | Bandwidth::Wideband => bandwidth,
                Bandwidth::Superwideband | Bandwidth::Fullband => Bandwidth::Wideband,
            };
            (CodecMode::Silk, clamped)
        }
        Application::Audio | Application::LowDelay => {
            let clamped = match bandwidth {
                Bandwidth::Auto => Bandwidth::Fullband,
                Bandwidth::Narrowband | Bandwidth::Mediumband => Bandwidth::Wideband,
                Bandwidth::Wideband | Bandwidth::Superwideband | Bandwidth::Fullband => bandwidth,
            };
            (CodecMode::Celt, clamped)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_frame_voip_produces_silk_toc() {
        let configuration = EncoderConfiguration {
            sampling_rate: SamplingRate::Hz16000,
            channels: Channels::Mono,
            application: Application::Voip,
        };
        let mut encoder = Encoder::new(&configuration).unwrap();
        let frame_size = 320; // 20 ms at 16 kHz
        let pcm: Vec<f32> = (0..frame_size)
            .map(|i| 0.2 * (i as f32 * 0.05).sin())
            .collect();
        let mut output = vec![0u8; 4096];
        let written = encoder.encode_frame(&pcm, frame_size, &mut output).unwrap();
        assert!(written > 1);
        assert_eq!(crate::query_packet_codec_mode(&output[..written]), CodecMode::Silk);
    }

    #[test]
    fn encode_frame_audio_produces_celt_toc() {
        let configuration = EncoderConfiguration {
            sampling_rate: SamplingRate::Hz48000,
            channels: Channels::Stereo,
            application: Application::Audio,
        };
        let mut encoder = Encoder::new(&configuration).unwrap();
        let frame_size = 960; // 20 ms at 48 kHz
        let pcm: Vec<f32> = (0..frame_size * 2)
            .map(|i| 0.2 * (i as f32 * 0.01).sin())
            .collect();
        let mut output = vec![0u8; 8192];
        let written = encoder.encode_frame(&pcm, frame_size, &mut output).unwrap();
        assert!(written > 1);
        assert_eq!(crate::query_packet_codec_mode(&output[..written]), CodecMode::Celt);
        assert_eq!(crate::query_packet_channel_count(&output[..written]), Channels::Stereo);
    }

    #[test]
    fn set_bitrate_rejects_out_of_range_values() {
        let configuration = EncoderConfiguration {
            sampling_rate: SamplingRate::Hz48000,
            channels: Channels::Mono,
            application: Application::Audio,
        };
        let mut encoder = Encoder::new(&configuration).unwrap();
        assert!(encoder.set_bitrate(1000).is_err());
        assert!(encoder.set_bitrate(64_000).is_ok());
    }
}
