//! Session buffer management
//!
//! Two buffers back an open session:
//! - the **source** buffer receives native-rate PCM from the decoder and holds
//!   `native_rate * ms / 1000` frames
//! - the **destination** buffer receives target-rate PCM from the resampler and
//!   holds `target_rate * (ms + 1) / 1000` frames; the extra millisecond absorbs
//!   the resampler's rounding so a full source batch never overruns it
//!
//! When no resampling is needed there is no destination storage at all: the
//! output stage is [`OutputStage::Passthrough`] and callers read the source
//! buffer directly. Because the aliased case owns nothing, releasing a session
//! can never free the same storage twice.

use crate::audio::types::NATIVE_SAMPLE_RATE;
use crate::error::{Error, Result};
use tracing::debug;
use wildcat_common::time::frames_for_duration;

/// Frames the source buffer holds for a duration budget
pub fn source_frames(buffer_duration_ms: u32) -> usize {
    frames_for_duration(NATIVE_SAMPLE_RATE, buffer_duration_ms)
}

/// Frames the destination buffer holds for a duration budget at `target_rate`
pub fn dest_frames(target_rate: u32, buffer_duration_ms: u32) -> usize {
    frames_for_duration(target_rate, buffer_duration_ms.saturating_add(1))
}

/// Allocate a zeroed interleaved buffer without aborting on exhaustion.
fn allocate_samples(what: &'static str, frames: usize, channels: usize) -> Result<Vec<f32>> {
    let failure = Error::AllocationFailure { what, frames };
    if frames == 0 {
        return Err(failure);
    }
    let len = frames.checked_mul(channels).ok_or(failure.clone())?;

    let mut samples = Vec::new();
    samples.try_reserve_exact(len).map_err(|_| failure)?;
    samples.resize(len, 0.0);

    debug!("Allocated {} buffer: {} frames x {} channels", what, frames, channels);
    Ok(samples)
}

/// Native-rate decode buffer
#[derive(Debug)]
pub struct SourceBuffer {
    samples: Vec<f32>,
    channels: usize,
}

impl SourceBuffer {
    pub fn allocate(buffer_duration_ms: u32, channels: usize) -> Result<Self> {
        let samples = allocate_samples("source", source_frames(buffer_duration_ms), channels)?;
        Ok(Self { samples, channels })
    }

    pub fn capacity_frames(&self) -> usize {
        self.samples.len() / self.channels
    }

    /// Writable prefix holding `frames` frames (clamped to capacity)
    pub fn frames_mut(&mut self, frames: usize) -> &mut [f32] {
        let len = frames.min(self.capacity_frames()) * self.channels;
        &mut self.samples[..len]
    }

    /// Readable prefix holding `frames` frames (clamped to capacity)
    pub fn frames(&self, frames: usize) -> &[f32] {
        let len = frames.min(self.capacity_frames()) * self.channels;
        &self.samples[..len]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.samples
    }
}

/// Target-rate output buffer, only present when resampling
#[derive(Debug)]
pub struct DestBuffer {
    samples: Vec<f32>,
    channels: usize,
}

impl DestBuffer {
    pub fn allocate(target_rate: u32, buffer_duration_ms: u32, channels: usize) -> Result<Self> {
        let frames = dest_frames(target_rate, buffer_duration_ms);
        let samples = allocate_samples("destination", frames, channels)?;
        Ok(Self { samples, channels })
    }

    pub fn capacity_frames(&self) -> usize {
        self.samples.len() / self.channels
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.samples
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.samples
    }
}

/// Where produced frames end up, decided once at open.
///
/// Variant fields drop in declaration order, so a resampled stage releases
/// its destination buffer before its resampler.
pub enum OutputStage<R> {
    /// Target rate equals native rate; output is read from the source buffer
    Passthrough,

    /// Separate target-rate buffer fed by the resampler
    Resample { dest: DestBuffer, resampler: R },
}

impl<R> OutputStage<R> {
    /// Output capacity in frames, given the source buffer it may alias
    pub fn capacity_frames(&self, source: &SourceBuffer) -> usize {
        match self {
            OutputStage::Passthrough => source.capacity_frames(),
            OutputStage::Resample { dest, .. } => dest.capacity_frames(),
        }
    }

    /// The buffer callers read produced frames from
    pub fn samples<'a>(&'a self, source: &'a SourceBuffer) -> &'a [f32] {
        match self {
            OutputStage::Passthrough => source.as_slice(),
            OutputStage::Resample { dest, .. } => dest.as_slice(),
        }
    }

    pub fn is_resampling(&self) -> bool {
        matches!(self, OutputStage::Resample { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_sizing() {
        // 20 ms at 48 kHz stereo
        let source = SourceBuffer::allocate(20, 2).unwrap();
        assert_eq!(source.capacity_frames(), 960);
        assert_eq!(source.as_slice().len(), 1920);
    }

    #[test]
    fn test_dest_sizing_has_one_ms_margin() {
        // (16000 * (20 + 1) / 1000) * 2
        let dest = DestBuffer::allocate(16000, 20, 2).unwrap();
        assert_eq!(dest.capacity_frames(), 336);
        assert_eq!(dest.as_slice().len(), 672);
        assert_eq!(dest_frames(44100, 120), 5336);
    }

    #[test]
    fn test_zero_duration_is_allocation_failure() {
        let result = SourceBuffer::allocate(0, 2);
        assert_eq!(
            result.unwrap_err(),
            Error::AllocationFailure { what: "source", frames: 0 }
        );
    }

    #[test]
    fn test_oversized_request_fails_cleanly() {
        let result = allocate_samples("source", usize::MAX / 2, 4);
        assert!(matches!(result, Err(Error::AllocationFailure { .. })));
    }

    #[test]
    fn test_frames_mut_clamps_to_capacity() {
        let mut source = SourceBuffer::allocate(1, 2).unwrap();
        assert_eq!(source.capacity_frames(), 48);
        assert_eq!(source.frames_mut(10).len(), 20);
        assert_eq!(source.frames_mut(1000).len(), 96);
    }

    #[test]
    fn test_passthrough_reads_source_storage() {
        let source = SourceBuffer::allocate(20, 1).unwrap();
        let stage: OutputStage<()> = OutputStage::Passthrough;
        assert_eq!(stage.samples(&source).as_ptr(), source.as_slice().as_ptr());
        assert_eq!(stage.capacity_frames(&source), 960);
        assert!(!stage.is_resampling());
    }

    #[test]
    fn test_resample_stage_reads_dest_storage() {
        let source = SourceBuffer::allocate(20, 2).unwrap();
        let stage = OutputStage::Resample {
            dest: DestBuffer::allocate(16000, 20, 2).unwrap(),
            resampler: (),
        };
        assert_ne!(stage.samples(&source).as_ptr(), source.as_slice().as_ptr());
        assert_eq!(stage.capacity_frames(&source), 336);
        assert!(stage.is_resampling());
    }
}
