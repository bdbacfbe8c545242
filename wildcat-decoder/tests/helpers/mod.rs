//! Test helper modules for wildcat-decoder integration tests
//!
//! - audio_generator: in-memory WAV fixtures with known content
//! - flac_generator: hand-assembled FLAC streams, optionally with undecodable frames
//! - stubs: scripted decoder and resampler collaborators

#![allow(dead_code, unused_imports)]

pub mod audio_generator;
pub mod flac_generator;
pub mod stubs;

pub use audio_generator::{generate_ramp_wav, generate_silent_wav, generate_sine_wav, ramp_frame};
pub use flac_generator::{FlacFixture, FLAC_BLOCK_FRAMES};
pub use stubs::{ScriptedDecoder, ShortResampler};
