//! A shared error type unifying [`crate::DecoderError`] and
//! [`crate::EncoderError`], for call sites that need to handle both (e.g.
//! the `ogg` container shim, which drives both a decoder and an encoder).

use crate::{DecoderError, EncoderError};

/// Either a decoder or an encoder error.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum OpusError {
    /// An error from the decoder.
    Decoder(DecoderError),
    /// An error from the encoder.
    Encoder(EncoderError),
}

impl From<DecoderError> for OpusError {
    fn from(error: DecoderError) -> Self {
        OpusError::Decoder(error)
    }
}

impl From<EncoderError> for OpusError {
    fn from(error: EncoderError) -> Self {
        OpusError::Encoder(error)
    }
}

impl std::fmt::Display for OpusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OpusError::Decoder(error) => write!(f, "{}", error),
            OpusError::Encoder(error) => write!(f, "{}", error),
        }
    }
}

impl std::error::Error for OpusError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_decoder_error() {
        let error: OpusError = DecoderError::BadPacket.into();
        assert_eq!(error, OpusError::Decoder(DecoderError::BadPacket));
    }

    #[test]
    fn wraps_encoder_error() {
        let error: OpusError = EncoderError::BufferTooSmall.into();
        assert_eq!(error, OpusError::Encoder(EncoderError::BufferTooSmall));
    }
}
