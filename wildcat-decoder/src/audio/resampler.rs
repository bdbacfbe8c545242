//! Audio resampling using rubato
//!
//! Streaming sample-rate conversion from the native 48 kHz decode rate to the
//! session's target rate.
//!
//! Rubato works on fixed-size planar chunks, while the session feeds whatever
//! one decode call produced. [`RubatoResampler`] bridges the two:
//! - all supplied input is queued, so every call consumes everything it is given
//! - full 1 ms chunks run through one long-lived `SincFixedIn`, keeping filter
//!   history across calls
//! - produced frames wait in an interleaved FIFO and are copied out up to the
//!   caller's capacity; the rest is delivered on the next call
//!
//! Splitting a stream into many short calls therefore yields the same samples
//! as one long call. A session never reads less than 1 ms of native audio, so
//! each full read produces at most one millisecond's worth of output per
//! millisecond of input and the FIFO never outgrows the destination buffer.
//!
//! `SincFixedIn` already compensates its own filter delay: output frame `k`
//! lines up with input time `k / ratio`, with no leading silence.

use rubato::{
    Resampler as RubatoTrait, SincFixedIn, SincInterpolationParameters, SincInterpolationType,
    WindowFunction,
};
use std::collections::VecDeque;
use thiserror::Error;
use tracing::debug;

/// Errors reported by a resampler collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResampleFault {
    /// Rates or channel count rejected before construction
    #[error("Invalid resampler configuration: {0}")]
    InvalidConfig(String),

    /// The backend refused the configuration
    #[error("Failed to create resampler: {0}")]
    Construction(String),

    /// The backend failed while processing a chunk
    #[error("Resampling failed: {0}")]
    Process(String),
}

impl ResampleFault {
    /// Negative result code for this fault
    pub fn code(&self) -> i32 {
        match self {
            ResampleFault::InvalidConfig(_) => -201,
            ResampleFault::Construction(_) => -202,
            ResampleFault::Process(_) => -203,
        }
    }
}

/// Resampler quality level, 0 (fastest) to 10 (best).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ResamplerQuality(u8);

impl ResamplerQuality {
    pub const MIN: ResamplerQuality = ResamplerQuality(0);
    pub const MAX: ResamplerQuality = ResamplerQuality(10);

    /// Mid-high quality used by every session
    pub const DEFAULT: ResamplerQuality = ResamplerQuality(5);

    /// Create a quality level, clamped to 0..=10
    pub fn new(level: u8) -> Self {
        ResamplerQuality(level.min(Self::MAX.0))
    }

    pub fn level(self) -> u8 {
        self.0
    }

    /// Sinc filter parameters for this level.
    ///
    /// Filter length and oversampling grow linearly with the level; cubic
    /// interpolation between table entries kicks in at level 7.
    pub fn sinc_parameters(self) -> SincInterpolationParameters {
        let q = self.0 as usize;
        SincInterpolationParameters {
            sinc_len: 16 + 24 * q,
            f_cutoff: 0.80 + 0.015 * q as f32,
            interpolation: if q >= 7 {
                SincInterpolationType::Cubic
            } else {
                SincInterpolationType::Linear
            },
            oversampling_factor: 64 + 32 * q,
            window: WindowFunction::BlackmanHarris2,
        }
    }
}

impl Default for ResamplerQuality {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Stateful sample-rate converter over interleaved f32 frames.
pub trait StreamResampler {
    /// Create a converter for `channels` interleaved channels.
    fn new(
        channels: usize,
        input_rate: u32,
        output_rate: u32,
        quality: ResamplerQuality,
    ) -> Result<Self, ResampleFault>
    where
        Self: Sized;

    /// Drop any leading silence the converter emits before the first real
    /// output frame. Backends whose output is already aligned do nothing.
    fn skip_zeros(&mut self);

    /// Convert interleaved input into interleaved output.
    ///
    /// On entry `in_frames` is the number of input frames supplied and
    /// `out_frames` the output capacity in frames. On return they hold the
    /// frames consumed and produced.
    fn process_interleaved(
        &mut self,
        input: &[f32],
        in_frames: &mut usize,
        output: &mut [f32],
        out_frames: &mut usize,
    ) -> Result<(), ResampleFault>;

    /// Forget all filter history and buffered frames.
    fn reset(&mut self);
}

/// Streaming sinc resampler backed by rubato's `SincFixedIn`.
pub struct RubatoResampler {
    inner: SincFixedIn<f32>,

    channels: usize,

    /// Planar input waiting for a full chunk
    input_queue: Vec<Vec<f32>>,

    /// Planar output of the last chunk
    scratch: Vec<Vec<f32>>,

    /// Interleaved output not yet handed to the caller
    output_queue: VecDeque<f32>,
}

impl RubatoResampler {
    /// Input chunk length: 1 ms of input, the smallest session read
    fn chunk_frames(input_rate: u32) -> usize {
        (input_rate as usize / 1000).max(1)
    }

    /// Frames produced but not yet delivered
    pub fn buffered_output_frames(&self) -> usize {
        self.output_queue.len() / self.channels
    }

    /// Run every full chunk waiting in the input queue.
    fn run_chunks(&mut self) -> Result<(), ResampleFault> {
        loop {
            let needed = self.inner.input_frames_next();
            if self.input_queue[0].len() < needed {
                return Ok(());
            }

            let chunk: Vec<&[f32]> = self.input_queue.iter().map(|q| &q[..needed]).collect();
            let (used, produced) = self
                .inner
                .process_into_buffer(&chunk, &mut self.scratch, None)
                .map_err(|e| ResampleFault::Process(e.to_string()))?;

            for queue in &mut self.input_queue {
                queue.drain(..used);
            }

            for frame_idx in 0..produced {
                for ch_idx in 0..self.channels {
                    self.output_queue.push_back(self.scratch[ch_idx][frame_idx]);
                }
            }
        }
    }
}

impl StreamResampler for RubatoResampler {
    fn new(
        channels: usize,
        input_rate: u32,
        output_rate: u32,
        quality: ResamplerQuality,
    ) -> Result<Self, ResampleFault> {
        if channels == 0 {
            return Err(ResampleFault::InvalidConfig("zero channels".to_string()));
        }
        if input_rate == 0 || output_rate == 0 {
            return Err(ResampleFault::InvalidConfig(format!(
                "sample rates must be positive ({} -> {})",
                input_rate, output_rate
            )));
        }

        let chunk_size = Self::chunk_frames(input_rate);
        let inner = SincFixedIn::<f32>::new(
            output_rate as f64 / input_rate as f64,
            1.0, // max_relative_ratio (no runtime changes)
            quality.sinc_parameters(),
            chunk_size,
            channels,
        )
        .map_err(|e| ResampleFault::Construction(e.to_string()))?;

        debug!(
            "Resampler {}Hz -> {}Hz, {} channels, quality {}, chunk {} frames, delay {} frames",
            input_rate,
            output_rate,
            channels,
            quality.level(),
            chunk_size,
            inner.output_delay()
        );

        let scratch = vec![vec![0.0f32; inner.output_frames_max()]; channels];
        let input_queue = vec![Vec::with_capacity(chunk_size * 2); channels];

        Ok(Self {
            inner,
            channels,
            input_queue,
            scratch,
            output_queue: VecDeque::new(),
        })
    }

    fn skip_zeros(&mut self) {
        // Output is delay-compensated, there is no warm-up to trim
    }

    fn process_interleaved(
        &mut self,
        input: &[f32],
        in_frames: &mut usize,
        output: &mut [f32],
        out_frames: &mut usize,
    ) -> Result<(), ResampleFault> {
        let channels = self.channels;
        let supplied = (*in_frames).min(input.len() / channels);

        // De-interleave into the planar queue
        for frame in input[..supplied * channels].chunks_exact(channels) {
            for (ch_idx, sample) in frame.iter().enumerate() {
                self.input_queue[ch_idx].push(*sample);
            }
        }
        *in_frames = supplied;

        self.run_chunks()?;

        let capacity = (*out_frames).min(output.len() / channels);
        let produced = capacity.min(self.buffered_output_frames());
        let samples = produced * channels;
        for (dst, src) in output[..samples]
            .iter_mut()
            .zip(self.output_queue.drain(..samples))
        {
            *dst = src;
        }
        *out_frames = produced;

        Ok(())
    }

    fn reset(&mut self) {
        self.inner.reset();
        for queue in &mut self.input_queue {
            queue.clear();
        }
        self.output_queue.clear();
    }
}
