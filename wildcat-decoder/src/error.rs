//! Error types for wildcat-decoder
//!
//! Every session operation fails with one [`Error`]. Hosts that speak the
//! negative-integer convention use [`Error::code`]; only the sign is portable.

use crate::audio::decoder::DecoderFault;
use crate::audio::resampler::ResampleFault;
use thiserror::Error;

/// Main error type for wildcat-decoder
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Container could not be opened or parsed
    #[error("Failed to open stream: {0}")]
    OpenFailure(#[source] DecoderFault),

    /// Open called on a session that is already open
    #[error("Session is already open")]
    AlreadyOpen,

    /// Operation requires an open session
    #[error("Session is not open")]
    NotOpen,

    /// Decoder reported zero channels
    #[error("Unsupported channel count: 0")]
    UnsupportedChannelCount,

    /// Buffer allocation failed or the budget rounds to nothing
    #[error("Failed to allocate {what} buffer of {frames} frames")]
    AllocationFailure { what: &'static str, frames: usize },

    /// Resampler could not be constructed
    #[error("Failed to initialize resampler: {0}")]
    ResamplerInitFailure(#[source] ResampleFault),

    /// Decoder could not report the stream length
    #[error("Failed to query stream length: {0}")]
    LengthQueryFailure(#[source] DecoderFault),

    /// Seek target rejected by the decoder
    #[error("Failed to seek to frame {target}: {source}")]
    SeekFailure { target: u64, source: DecoderFault },

    /// Decoder could not report its position
    #[error("Failed to query position: {0}")]
    TellFailure(#[source] DecoderFault),

    /// Unrecoverable decode error; `code` is the decoder's raw result code
    #[error("Fatal decode error ({code}): {source}")]
    DecodeFatal { code: i32, source: DecoderFault },

    /// Too many consecutive holes in one read
    #[error("Gave up after {holes} consecutive stream holes")]
    HoleRetryExhausted { holes: u32 },

    /// Resampler failed while converting a batch
    #[error("Resampler processing error: {0}")]
    ResamplerProcess(#[source] ResampleFault),

    /// Resampler consumed a different frame count than it was given
    #[error("Frame count mismatch: supplied {supplied} frames, resampler consumed {consumed}")]
    FrameCountMismatch { supplied: usize, consumed: usize },
}

impl Error {
    /// Negative result code for this error.
    ///
    /// `DecodeFatal` carries the decoder's own code through unchanged.
    pub fn code(&self) -> i32 {
        match self {
            Error::OpenFailure(_) => -1,
            Error::UnsupportedChannelCount => -2,
            Error::AllocationFailure { .. } => -3,
            Error::ResamplerInitFailure(_) => -4,
            Error::LengthQueryFailure(_) => -5,
            Error::AlreadyOpen => -6,
            Error::NotOpen => -7,
            Error::SeekFailure { .. } => -8,
            Error::TellFailure(_) => -9,
            Error::DecodeFatal { code, .. } => *code,
            Error::HoleRetryExhausted { .. } => -10,
            Error::ResamplerProcess(_) => -11,
            Error::FrameCountMismatch { .. } => -12,
        }
    }
}

/// Convenience Result type using wildcat-decoder Error
pub type Result<T> = std::result::Result<T, Error>;
