//! Ogg container framing for Opus streams.
//!
//! Out of scope for this crate: demuxing/muxing the Ogg container that
//! typically wraps an Opus elementary stream is left to a dedicated
//! container crate. This module exists only so the `ogg` feature has
//! something to compile against, matching the teacher's own stub shape.

use crate::{DecoderError, OpusError};

/// Placeholder for an Ogg-encapsulated Opus stream.
#[derive(Debug)]
pub struct OggStream;

impl OggStream {
    /// Always returns [`DecoderError::Unimplemented`]: Ogg container
    /// support is out of scope for this crate.
    pub fn new() -> Result<Self, OpusError> {
        Err(OpusError::from(DecoderError::Unimplemented))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_is_unimplemented() {
        assert!(OggStream::new().is_err());
    }
}
