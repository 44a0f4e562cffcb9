//! Implements the CELT transform-domain layer: MDCT analysis/synthesis,
//! band energy quantization, PVQ shape coding, the bit allocator, TF
//! decision, anti-collapse, and the postfilter/comb filter.

#[cfg(feature = "decoder")]
pub(crate) use decoder::CeltDecoder;
#[cfg(feature = "encoder")]
pub(crate) use encoder::CeltEncoder;

pub(crate) mod allocator;
pub(crate) mod bands;
pub(crate) mod comb_filter;
#[cfg(feature = "decoder")]
mod decoder;
#[cfg(feature = "encoder")]
mod encoder;
pub(crate) mod kiss_fft;
pub(crate) mod mdct;
pub(crate) mod mode;
pub(crate) mod pvq;
pub(crate) mod tables;
pub(crate) mod tf;
