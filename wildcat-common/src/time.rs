//! Frame and duration arithmetic
//!
//! All positions in wildcat are frame counts (one sample per channel) on some
//! sample-rate timeline. These helpers keep the integer math in one place so
//! buffer sizing and callers converting between timelines round the same way.

/// Number of whole frames covered by `duration_ms` at `sample_rate`.
///
/// Truncates toward zero, e.g. 20 ms at 48 kHz is 960 frames and
/// 21 ms at 16 kHz is 336 frames.
pub fn frames_for_duration(sample_rate: u32, duration_ms: u32) -> usize {
    ((sample_rate as u64 * duration_ms as u64) / 1000) as usize
}

/// Duration in milliseconds of `frames` at `sample_rate` (truncated).
pub fn frames_to_millis(frames: u64, sample_rate: u32) -> u64 {
    if sample_rate == 0 {
        return 0;
    }
    frames.saturating_mul(1000) / sample_rate as u64
}

/// Convert a frame count from one sample-rate timeline to another.
///
/// Positions reported by a session live on the native-rate timeline; hosts
/// working in output-rate frames use this to translate.
pub fn convert_frames(frames: u64, from_rate: u32, to_rate: u32) -> u64 {
    if from_rate == 0 || from_rate == to_rate {
        return frames;
    }
    ((frames as u128 * to_rate as u128) / from_rate as u128) as u64
}
