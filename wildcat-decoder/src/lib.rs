//! # Wildcat Decoder Library (wildcat-decoder)
//!
//! Streaming decode sessions for in-memory audio containers.
//!
//! **Purpose:** Decode an encoded blob into interleaved f32 PCM, one bounded
//! batch at a time, converting from the native 48 kHz rate to whatever rate
//! the host plays at.
//!
//! **Architecture:** [`Session`] owns a decoder collaborator
//! ([`audio::PcmDecoder`], symphonia by default) and, when the rates differ, a
//! resampler collaborator ([`audio::StreamResampler`], rubato by default).

pub mod audio;
pub mod error;
pub mod session;

pub use audio::{DecodeStatus, DecoderFault, ResampleFault, Tags, NATIVE_SAMPLE_RATE};
pub use error::{Error, Result};
pub use session::{Session, SessionOptions, SessionState};
