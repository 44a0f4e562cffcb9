//! Implements the SILK linear-prediction layer: NLSF-coded LPC spectral
//! envelope, pitch/long-term prediction, the noise shaping quantizer, the
//! multi-rate resampler, and mid-side stereo prediction.

pub(crate) use decoder::{LostFlag, SilkDecoder};
#[cfg(feature = "encoder")]
pub(crate) use encoder::SilkEncoder;

mod decoder;
#[cfg(feature = "encoder")]
mod encoder;
pub(crate) mod fixed_point;
pub(crate) mod ltp;
pub(crate) mod nlsf;
pub(crate) mod nsq;
pub(crate) mod pitch;
pub(crate) mod resampler;
pub(crate) mod shell;
pub(crate) mod stereo;
pub(crate) mod tables;
