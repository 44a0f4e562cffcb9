//! Encoder errors.

/// Errors thrown by the encoder.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum EncoderError {
    /// The output buffer is too small to hold the encoded frame.
    BufferTooSmall,
    /// A configuration value was outside its permitted set.
    BadArg(&'static str),
    /// The range coder would need more bytes than the allotted budget.
    Overflow,
    /// An invariant check failed; this indicates a bug rather than a
    /// recoverable condition.
    InternalError(&'static str),
}

impl std::fmt::Display for EncoderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EncoderError::BufferTooSmall => write!(f, "output buffer is too small"),
            EncoderError::BadArg(message) => write!(f, "{}", message),
            EncoderError::Overflow => write!(f, "encoded frame exceeds the byte budget"),
            EncoderError::InternalError(message) => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for EncoderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}
