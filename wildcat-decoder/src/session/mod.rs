//! Decode session controller
//!
//! A [`Session`] is a Closed/Open state machine over one encoded stream. While
//! open it owns the decoder (and through it the encoded blob), the source
//! buffer, and, when the target rate differs from the native 48 kHz, a
//! resampler with its own destination buffer.
//!
//! # Reading
//!
//! `read(end)` decodes at most one buffer's worth of native-rate frames,
//! stopping at `end` on the native timeline, and returns the number of
//! frames now available in [`Session::buffer_handle`] at the target rate:
//!
//! ```ignore
//! let mut session = Session::new();
//! let total = session.open(blob, 44100, 20)?;
//! loop {
//!     let frames = session.read(total)?;
//!     if frames == 0 {
//!         break;
//!     }
//!     let samples = session.output(frames).unwrap();
//!     // hand `samples` to the host
//! }
//! session.close();
//! ```
//!
//! # Lifecycle
//!
//! `open` either installs a fully built session or leaves the handle Closed;
//! nothing half-built survives a failure. `close` releases the destination
//! buffer, the resampler, the source buffer, then the decoder, and is a no-op
//! on a closed handle. Dropping the handle releases the same way.

pub mod buffers;
pub mod pipeline;

use crate::audio::decoder::{PcmDecoder, SymphoniaDecoder};
use crate::audio::resampler::{ResamplerQuality, RubatoResampler, StreamResampler};
use crate::audio::types::{Tags, NATIVE_SAMPLE_RATE};
use crate::error::{Error, Result};
use buffers::{DestBuffer, OutputStage, SourceBuffer};
use tracing::{debug, trace, warn};
use wildcat_common::time::convert_frames;
use wildcat_common::DecoderConfig;

/// Upper bound on what `read_all` reserves up front (one minute at 48 kHz)
const READ_ALL_PREALLOC_FRAMES: u64 = 60 * NATIVE_SAMPLE_RATE as u64;

/// Session behavior knobs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Maximum consecutive holes absorbed by one read (`None` = unbounded)
    pub hole_retry_limit: Option<u32>,

    /// Clear resampler filter history on seek
    pub reset_resampler_on_seek: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            hole_retry_limit: None,
            reset_resampler_on_seek: true,
        }
    }
}

impl From<&DecoderConfig> for SessionOptions {
    fn from(config: &DecoderConfig) -> Self {
        Self {
            hole_retry_limit: config.hole_retry_limit,
            reset_resampler_on_seek: config.reset_resampler_on_seek,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Closed,
    Open,
}

/// Everything an open session owns. Fields drop in declaration order,
/// which is the release order.
struct OpenSession<D, R> {
    output: OutputStage<R>,
    source: SourceBuffer,
    decoder: D,
    channels: usize,
    target_rate: u32,
    current_position: u64,
    total_length: u64,
}

impl<D, R> OpenSession<D, R> {
    fn release(self) {
        let OpenSession {
            output,
            source,
            decoder,
            ..
        } = self;
        if let OutputStage::Resample { dest, resampler } = output {
            drop(dest);
            drop(resampler);
        }
        drop(source);
        drop(decoder);
    }
}

/// Streaming decode session over one in-memory container.
pub struct Session<D = SymphoniaDecoder, R = RubatoResampler> {
    open: Option<OpenSession<D, R>>,
    options: SessionOptions,
}

impl Session<SymphoniaDecoder, RubatoResampler> {
    /// Closed session using the symphonia decoder and rubato resampler
    pub fn new() -> Self {
        Self::with_options(SessionOptions::default())
    }
}

impl Default for Session<SymphoniaDecoder, RubatoResampler> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: PcmDecoder, R: StreamResampler> Session<D, R> {
    /// Closed session with explicit options
    pub fn with_options(options: SessionOptions) -> Self {
        Self {
            open: None,
            options,
        }
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Open `blob` for decoding at `target_rate`.
    ///
    /// `buffer_duration_ms` bounds how much native-rate audio one `read`
    /// decodes. Returns the stream's total length in native-rate frames.
    pub fn open(&mut self, blob: Vec<u8>, target_rate: u32, buffer_duration_ms: u32) -> Result<u64> {
        if self.is_open() {
            warn!("Open rejected: session already open");
            return Err(Error::AlreadyOpen);
        }

        let decoder = D::open_memory(blob).map_err(|fault| {
            warn!("Failed to open stream: {}", fault);
            Error::OpenFailure(fault)
        })?;

        self.open_decoder(decoder, target_rate, buffer_duration_ms)
    }

    /// Open a session around an already constructed decoder.
    ///
    /// On any failure everything acquired so far, including `decoder`, is
    /// released and the handle stays Closed.
    pub fn open_decoder(&mut self, decoder: D, target_rate: u32, buffer_duration_ms: u32) -> Result<u64> {
        if self.is_open() {
            warn!("Open rejected: session already open");
            return Err(Error::AlreadyOpen);
        }

        let channels = decoder.channels();
        if channels == 0 {
            warn!("Stream reports zero channels");
            return Err(Error::UnsupportedChannelCount);
        }

        let source = SourceBuffer::allocate(buffer_duration_ms, channels)?;

        let output = if target_rate != NATIVE_SAMPLE_RATE {
            let mut resampler = R::new(
                channels,
                NATIVE_SAMPLE_RATE,
                target_rate,
                ResamplerQuality::DEFAULT,
            )
            .map_err(|fault| {
                warn!("Failed to initialize resampler: {}", fault);
                Error::ResamplerInitFailure(fault)
            })?;
            resampler.skip_zeros();

            let dest = DestBuffer::allocate(target_rate, buffer_duration_ms, channels)?;
            OutputStage::Resample { dest, resampler }
        } else {
            OutputStage::Passthrough
        };

        let total_length = decoder.total_frames().map_err(|fault| {
            warn!("Failed to query stream length: {}", fault);
            Error::LengthQueryFailure(fault)
        })?;

        debug!(
            "Session opened: {} channels, {}Hz -> {}Hz, {} frames, {} frame buffer",
            channels,
            NATIVE_SAMPLE_RATE,
            target_rate,
            total_length,
            source.capacity_frames()
        );

        self.open = Some(OpenSession {
            output,
            source,
            decoder,
            channels,
            target_rate,
            current_position: 0,
            total_length,
        });
        Ok(total_length)
    }

    /// Seek to an absolute native-rate frame.
    pub fn seek(&mut self, sample: u64) -> Result<()> {
        let reset_resampler = self.options.reset_resampler_on_seek;
        let session = self.open.as_mut().ok_or(Error::NotOpen)?;

        session.decoder.seek(sample).map_err(|source| {
            warn!("Seek to {} failed: {}", sample, source);
            Error::SeekFailure {
                target: sample,
                source,
            }
        })?;
        session.current_position = sample;

        if reset_resampler {
            if let OutputStage::Resample { resampler, .. } = &mut session.output {
                resampler.reset();
                resampler.skip_zeros();
            }
        }

        debug!("Seeked to frame {}", sample);
        Ok(())
    }

    /// The decoder's authoritative native-rate position
    pub fn tell(&self) -> Result<u64> {
        let session = self.open.as_ref().ok_or(Error::NotOpen)?;
        session.decoder.tell().map_err(Error::TellFailure)
    }

    /// Decode toward `end_sample_pos` (native-rate frames).
    ///
    /// Returns the number of target-rate frames now in the output buffer.
    /// Without resampling, 0 means `end_sample_pos` is reached or the stream
    /// ended. A resampled read may also return 0 while the resampler is still
    /// filling its first chunk; [`Session::position`] tells the cases apart.
    pub fn read(&mut self, end_sample_pos: u64) -> Result<usize> {
        let hole_limit = self.options.hole_retry_limit;
        let session = self.open.as_mut().ok_or(Error::NotOpen)?;

        if end_sample_pos <= session.current_position {
            return Ok(0);
        }
        let remaining = end_sample_pos - session.current_position;
        let request = (session.source.capacity_frames() as u64).min(remaining) as usize;

        let written = pipeline::retry_holes(hole_limit, || {
            session
                .decoder
                .read_interleaved(session.source.frames_mut(request))
        })?;
        if written > request {
            return Err(Error::FrameCountMismatch {
                supplied: request,
                consumed: written,
            });
        }
        session.current_position += written as u64;

        trace!(
            "Decoded {} of {} requested frames, position {}",
            written,
            request,
            session.current_position
        );

        match &mut session.output {
            OutputStage::Passthrough => Ok(written),
            OutputStage::Resample { dest, resampler } => {
                pipeline::resample_batch(resampler, session.source.frames(written), written, dest)
            }
        }
    }

    /// Release everything the session owns. Safe to call repeatedly.
    pub fn close(&mut self) {
        if let Some(session) = self.open.take() {
            session.release();
            debug!("Session closed");
        }
    }

    /// Container metadata; `None` when closed or when the stream has none
    pub fn tags(&self) -> Option<&Tags> {
        self.open.as_ref().and_then(|s| s.decoder.tags())
    }

    /// Channel count, 0 when closed
    pub fn channel_count(&self) -> usize {
        self.open.as_ref().map_or(0, |s| s.channels)
    }

    /// The whole output buffer; `None` when closed.
    ///
    /// Without resampling this is the source buffer itself.
    pub fn buffer_handle(&self) -> Option<&[f32]> {
        self.open
            .as_ref()
            .map(|s| s.output.samples(&s.source))
    }

    /// The first `frames` frames of the output buffer, as returned by `read`
    pub fn output(&self, frames: usize) -> Option<&[f32]> {
        let channels = self.channel_count();
        self.buffer_handle()?.get(..frames.checked_mul(channels)?)
    }

    /// Whole-stream decode from the start at the target rate.
    ///
    /// `progress` receives the fraction of the native timeline covered after
    /// each read that advanced the position.
    pub fn read_all<F: FnMut(f32)>(&mut self, mut progress: F) -> Result<Vec<f32>> {
        let (total, channels, target_rate) = {
            let session = self.open.as_ref().ok_or(Error::NotOpen)?;
            (session.total_length, session.channels, session.target_rate)
        };
        self.seek(0)?;

        // The declared length comes from the container, so only trust it up to a point
        let expected = convert_frames(total, NATIVE_SAMPLE_RATE, target_rate)
            .min(convert_frames(READ_ALL_PREALLOC_FRAMES, NATIVE_SAMPLE_RATE, target_rate));
        let mut samples = Vec::with_capacity((expected as usize).saturating_mul(channels));

        // A resampled read can yield no frames while the position still moves,
        // so progress is judged on the native timeline
        while self.position() < total {
            let before = self.position();
            let frames = self.read(total)?;
            if self.position() == before {
                break;
            }
            if let Some(chunk) = self.output(frames) {
                samples.extend_from_slice(chunk);
            }
            progress((self.position() as f64 / total as f64).min(1.0) as f32);
        }

        debug!("Decoded whole stream: {} frames", samples.len() / channels);
        Ok(samples)
    }

    pub fn state(&self) -> SessionState {
        if self.open.is_some() {
            SessionState::Open
        } else {
            SessionState::Closed
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    /// Cached native-rate position, 0 when closed
    pub fn position(&self) -> u64 {
        self.open.as_ref().map_or(0, |s| s.current_position)
    }

    /// Total native-rate frames, 0 when closed
    pub fn total_length(&self) -> u64 {
        self.open.as_ref().map_or(0, |s| s.total_length)
    }

    /// Output rate, `None` when closed
    pub fn target_rate(&self) -> Option<u32> {
        self.open.as_ref().map(|s| s.target_rate)
    }

    /// Output buffer capacity in frames, 0 when closed
    pub fn dest_capacity_frames(&self) -> usize {
        self.open
            .as_ref()
            .map_or(0, |s| s.output.capacity_frames(&s.source))
    }

    /// Whether reads pass through the resampler
    pub fn is_resampling(&self) -> bool {
        self.open.as_ref().is_some_and(|s| s.output.is_resampling())
    }
}
