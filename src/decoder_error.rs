//! Decoder errors.

/// Errors thrown by the decoder.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum DecoderError {
    /// The packet is malformed: a reserved bit pattern, an out-of-range
    /// codebook index, an invalid TOC, or the range coder read past the
    /// end of its storage.
    BadPacket,
    /// The caller-provided PCM buffer is too small to hold the frame.
    BufferTooSmall,
    /// A configuration value was outside its permitted set.
    BadArg(&'static str),
    /// An invariant check failed; this indicates a bug rather than a
    /// recoverable condition.
    InternalError(&'static str),
    /// The requested combination of inputs is not yet supported.
    Unimplemented,
}

impl std::fmt::Display for DecoderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecoderError::BadPacket => write!(f, "corrupt or unsupported Opus packet"),
            DecoderError::BufferTooSmall => write!(f, "output buffer is too small"),
            DecoderError::BadArg(message) => write!(f, "{}", message),
            DecoderError::InternalError(message) => write!(f, "{}", message),
            DecoderError::Unimplemented => write!(f, "unimplemented"),
        }
    }
}

impl std::error::Error for DecoderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}
