//! Decoder and resampler collaborators

pub mod decoder;
pub mod resampler;
pub mod types;

pub use decoder::{DecoderFault, PcmDecoder, SymphoniaDecoder};
pub use resampler::{ResampleFault, ResamplerQuality, RubatoResampler, StreamResampler};
pub use types::{DecodeStatus, Tags, NATIVE_SAMPLE_RATE};
