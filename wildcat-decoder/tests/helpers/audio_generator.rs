//! Audio test fixture generation
//!
//! Builds deterministic WAV containers in memory so tests can hand the bytes
//! straight to a session without touching the filesystem.

use hound::{SampleFormat, WavSpec, WavWriter};
use std::f32::consts::PI;
use std::io::Cursor;

/// Native test sample rate (48 kHz)
pub const TEST_SAMPLE_RATE: u32 = 48000;

fn spec(channels: u16, sample_rate: u32) -> WavSpec {
    WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

/// Write `frames` frames produced by `sample(frame, channel)` into a WAV blob
fn build_wav<F>(channels: u16, sample_rate: u32, frames: u64, mut sample: F) -> Vec<u8>
where
    F: FnMut(u64, u16) -> i16,
{
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer =
            WavWriter::new(&mut cursor, spec(channels, sample_rate)).expect("WAV header");
        for frame in 0..frames {
            for channel in 0..channels {
                writer
                    .write_sample(sample(frame, channel))
                    .expect("WAV sample");
            }
        }
        writer.finalize().expect("WAV finalize");
    }
    cursor.into_inner()
}

/// Silent WAV of `duration_ms` at `sample_rate`
pub fn generate_silent_wav(channels: u16, sample_rate: u32, duration_ms: u64) -> Vec<u8> {
    let frames = sample_rate as u64 * duration_ms / 1000;
    build_wav(channels, sample_rate, frames, |_, _| 0)
}

/// Sine WAV at 48 kHz, same signal on every channel
///
/// `amplitude` is 0.0-1.0; keep it below 1.0 so resampler overshoot stays in range.
pub fn generate_sine_wav(channels: u16, duration_ms: u64, frequency_hz: f32, amplitude: f32) -> Vec<u8> {
    let frames = TEST_SAMPLE_RATE as u64 * duration_ms / 1000;
    build_wav(channels, TEST_SAMPLE_RATE, frames, |frame, _| {
        let t = frame as f32 / TEST_SAMPLE_RATE as f32;
        ((2.0 * PI * frequency_hz * t).sin() * amplitude * i16::MAX as f32) as i16
    })
}

/// 48 kHz WAV whose every sample encodes its frame index (mod 32768)
///
/// Lets tests check exactly which frames a read delivered.
pub fn generate_ramp_wav(channels: u16, frames: u64) -> Vec<u8> {
    build_wav(channels, TEST_SAMPLE_RATE, frames, |frame, _| (frame % 32768) as i16)
}

/// Frame index a ramp sample decodes to
pub fn ramp_frame(sample: f32) -> u64 {
    (sample * 32768.0).round() as u64
}
