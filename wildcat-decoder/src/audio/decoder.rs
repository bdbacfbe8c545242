//! Audio decoder using symphonia
//!
//! Decodes an in-memory encoded container into interleaved f32 PCM at the
//! native 48 kHz rate, one packet at a time.
//!
//! # Collaborator contract
//!
//! The session only talks to decoders through [`PcmDecoder`]:
//! - `read_interleaved` fills at most `out.len() / channels` frames and reports
//!   [`DecodeStatus::Hole`] for packets it had to drop
//! - `seek`/`tell` work in native-rate frames
//! - channel count is fixed at open
//!
//! # Opus
//!
//! With the `opus` feature the libopus adapter is registered ahead of the
//! symphonia codecs so Ogg Opus streams decode through it.

use crate::audio::types::{DecodeStatus, Tags, NATIVE_SAMPLE_RATE};
use std::io::Cursor;
use std::sync::OnceLock;
use symphonia::core::audio::{SampleBuffer, SignalSpec};
use symphonia::core::codecs::{CodecRegistry, Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::{MetadataOptions, MetadataRevision, StandardTagKey};
use symphonia::core::probe::Hint;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors reported by a decoder collaborator.
///
/// Every fault maps to a negative [`code`](DecoderFault::code), which the
/// session surfaces unchanged for fatal decode errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecoderFault {
    /// The blob is not a container any registered reader understands
    #[error("Unrecognized container: {0}")]
    Unrecognized(String),

    /// The container holds no track with a known codec
    #[error("No audio track found")]
    NoAudioTrack,

    /// A codec was found but no decoder is registered for it
    #[error("Unsupported codec: {0}")]
    UnsupportedCodec(String),

    /// Stream is not at the native rate
    #[error("Unsupported sample rate: {0} Hz (expected 48000 Hz)")]
    UnsupportedSampleRate(u32),

    /// The container does not declare its total length
    #[error("Stream length unknown")]
    LengthUnknown,

    /// Demuxer failed to read the next packet
    #[error("Read error: {0}")]
    Read(String),

    /// Decoder state is unusable
    #[error("Decode error: {0}")]
    Decode(String),

    /// The stream switched channel count after open
    #[error("Channel layout changed mid-stream: {expected} -> {found} channels")]
    ChannelLayoutChanged { expected: usize, found: usize },

    /// Seek target lies past the end of the stream
    #[error("Seek target {target} beyond stream length {total}")]
    SeekOutOfRange { target: u64, total: u64 },

    /// The container refused the seek
    #[error("Seek failed: {0}")]
    Seek(String),

    /// Position is not available
    #[error("Position unavailable: {0}")]
    Tell(String),
}

impl DecoderFault {
    /// Negative result code for this fault
    pub fn code(&self) -> i32 {
        match self {
            DecoderFault::Unrecognized(_) => -101,
            DecoderFault::NoAudioTrack => -102,
            DecoderFault::UnsupportedCodec(_) => -103,
            DecoderFault::UnsupportedSampleRate(_) => -104,
            DecoderFault::LengthUnknown => -105,
            DecoderFault::Read(_) => -106,
            DecoderFault::Decode(_) => -107,
            DecoderFault::ChannelLayoutChanged { .. } => -108,
            DecoderFault::SeekOutOfRange { .. } => -109,
            DecoderFault::Seek(_) => -110,
            DecoderFault::Tell(_) => -111,
        }
    }
}

/// Forward PCM decoder over an encoded stream.
pub trait PcmDecoder {
    /// Open a decoder over an in-memory encoded container.
    ///
    /// The decoder takes ownership of the blob for its whole lifetime.
    fn open_memory(blob: Vec<u8>) -> Result<Self, DecoderFault>
    where
        Self: Sized;

    /// Channel count; 0 when the container does not declare one
    fn channels(&self) -> usize;

    /// Total length in native-rate frames
    fn total_frames(&self) -> Result<u64, DecoderFault>;

    /// Decode up to `out.len() / channels` frames of interleaved PCM into `out`.
    fn read_interleaved(&mut self, out: &mut [f32]) -> Result<DecodeStatus, DecoderFault>;

    /// Seek to an absolute native-rate frame
    fn seek(&mut self, frame: u64) -> Result<(), DecoderFault>;

    /// Current absolute native-rate frame
    fn tell(&self) -> Result<u64, DecoderFault>;

    /// Container metadata, if any was found
    fn tags(&self) -> Option<&Tags>;
}

/// Get codec registry with every enabled codec, plus Opus when built with `opus`
fn get_codec_registry() -> &'static CodecRegistry {
    static CODEC_REGISTRY: OnceLock<CodecRegistry> = OnceLock::new();
    CODEC_REGISTRY.get_or_init(|| {
        let mut registry = CodecRegistry::new();
        // Register Opus decoder first so it wins over any built-in stub
        #[cfg(feature = "opus")]
        registry.register_all::<symphonia_adapter_libopus::OpusDecoder>();
        symphonia::default::register_enabled_codecs(&mut registry);
        registry
    })
}

/// Streaming decoder backed by symphonia.
///
/// Holds at most one decoded packet; frames a caller did not take are served
/// by the next `read_interleaved` call. A read fills the caller's buffer across
/// packets and only comes back short at a hole or the end of the stream.
pub struct SymphoniaDecoder {
    /// Symphonia format reader (owns the encoded blob)
    format: Box<dyn FormatReader>,

    /// Symphonia decoder
    decoder: Box<dyn Decoder>,

    /// Track being decoded
    track_id: u32,

    channels: usize,

    total_frames: Option<u64>,

    tags: Option<Tags>,

    /// Conversion scratch, recreated when a packet outgrows it
    sample_buf: Option<SampleBuffer<f32>>,

    /// Frame capacity of `sample_buf`
    sample_buf_frames: u64,

    /// Interleaved samples of the current packet
    pending: Vec<f32>,

    /// Read offset into `pending` (samples)
    pending_offset: usize,

    /// Frames still to drop after an inexact seek
    discard_frames: u64,

    /// Hole hit after a partial fill, reported by the next read
    hole_pending: bool,

    /// End of stream reached; cleared by seek
    exhausted: bool,

    /// Frames delivered since open, offset by the last seek target
    position: u64,
}

impl SymphoniaDecoder {
    fn pending_frames(&self) -> usize {
        (self.pending.len() - self.pending_offset) / self.channels.max(1)
    }

    /// Decode packets until `pending` holds frames, a hole is hit, or the stream ends.
    ///
    /// Returns `Ok(None)` when frames are ready, `Ok(Some(status))` otherwise.
    fn fill_pending(&mut self) -> Result<Option<DecodeStatus>, DecoderFault> {
        while self.pending_frames() == 0 {
            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    debug!("Reached end of stream at frame {}", self.position);
                    self.exhausted = true;
                    return Ok(Some(DecodeStatus::Frames(0)));
                }
                Err(SymphoniaError::ResetRequired) => {
                    return Err(DecoderFault::Decode("decoder reset required".to_string()));
                }
                Err(e) => return Err(DecoderFault::Read(e.to_string())),
            };

            // Skip packets for other tracks
            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(msg)) => {
                    warn!("Dropped corrupt packet at ts {}: {}", packet.ts(), msg);
                    return Ok(Some(DecodeStatus::Hole));
                }
                Err(SymphoniaError::IoError(e)) => {
                    warn!("Dropped truncated packet at ts {}: {}", packet.ts(), e);
                    return Ok(Some(DecodeStatus::Hole));
                }
                Err(e) => return Err(DecoderFault::Decode(e.to_string())),
            };

            let spec: SignalSpec = *decoded.spec();
            let found = spec.channels.count();
            if found != self.channels {
                return Err(DecoderFault::ChannelLayoutChanged {
                    expected: self.channels,
                    found,
                });
            }
            if decoded.frames() == 0 {
                continue;
            }

            let needed = decoded.capacity() as u64;
            if self.sample_buf.is_none() || needed > self.sample_buf_frames {
                self.sample_buf = Some(SampleBuffer::<f32>::new(needed, spec));
                self.sample_buf_frames = needed;
            }
            let Some(sample_buf) = self.sample_buf.as_mut() else {
                continue;
            };
            sample_buf.copy_interleaved_ref(decoded);

            self.pending.clear();
            self.pending.extend_from_slice(sample_buf.samples());
            self.pending_offset = 0;

            // Decode-and-skip the gap between where the container landed and the target
            if self.discard_frames > 0 {
                let drop = self.discard_frames.min(self.pending_frames() as u64);
                self.pending_offset = drop as usize * self.channels;
                self.discard_frames -= drop;
            }
        }
        Ok(None)
    }

    fn collect_tags(revision: &MetadataRevision, tags: &mut Tags) {
        for tag in revision.tags() {
            if tag.std_key == Some(StandardTagKey::Encoder) {
                tags.vendor = Some(tag.value.to_string());
            }
            tags.insert(&tag.key, tag.value.to_string());
        }
    }
}

impl PcmDecoder for SymphoniaDecoder {
    fn open_memory(blob: Vec<u8>) -> Result<Self, DecoderFault> {
        debug!("Opening {} byte container", blob.len());

        let mss = MediaSourceStream::new(Box::new(Cursor::new(blob)), Default::default());

        let format_opts = FormatOptions {
            enable_gapless: true,
            ..Default::default()
        };
        let metadata_opts = MetadataOptions::default();

        let mut probed = symphonia::default::get_probe()
            .format(&Hint::new(), mss, &format_opts, &metadata_opts)
            .map_err(|e| DecoderFault::Unrecognized(e.to_string()))?;

        let mut tags = Tags::new();
        if let Some(metadata) = probed.metadata.get() {
            if let Some(revision) = metadata.current() {
                Self::collect_tags(revision, &mut tags);
            }
        }

        let mut format = probed.format;
        if let Some(revision) = format.metadata().current() {
            Self::collect_tags(revision, &mut tags);
        }

        // Get the first decodable track
        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(DecoderFault::NoAudioTrack)?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let sample_rate = codec_params.sample_rate.unwrap_or(0);
        if sample_rate != NATIVE_SAMPLE_RATE {
            return Err(DecoderFault::UnsupportedSampleRate(sample_rate));
        }

        // Missing channel info is reported as zero channels; the session rejects it
        let channels = codec_params.channels.map(|c| c.count()).unwrap_or(0);
        let total_frames = codec_params.n_frames;

        let decoder = get_codec_registry()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| DecoderFault::UnsupportedCodec(e.to_string()))?;

        debug!(
            "Audio format: sample_rate={}, channels={}, frames={:?}, tags={}",
            sample_rate,
            channels,
            total_frames,
            tags.len()
        );

        Ok(Self {
            format,
            decoder,
            track_id,
            channels,
            total_frames,
            tags: (!tags.is_empty()).then_some(tags),
            sample_buf: None,
            sample_buf_frames: 0,
            pending: Vec::new(),
            pending_offset: 0,
            discard_frames: 0,
            hole_pending: false,
            exhausted: false,
            position: 0,
        })
    }

    fn channels(&self) -> usize {
        self.channels
    }

    fn total_frames(&self) -> Result<u64, DecoderFault> {
        self.total_frames.ok_or(DecoderFault::LengthUnknown)
    }

    fn read_interleaved(&mut self, out: &mut [f32]) -> Result<DecodeStatus, DecoderFault> {
        if self.channels == 0 {
            return Ok(DecodeStatus::Frames(0));
        }
        if self.hole_pending {
            self.hole_pending = false;
            return Ok(DecodeStatus::Hole);
        }
        let wanted = out.len() / self.channels;
        let mut filled = 0;

        // Fill across packet boundaries so every batch but the last is full
        while filled < wanted && !self.exhausted {
            match self.fill_pending()? {
                None => {}
                Some(DecodeStatus::Hole) if filled == 0 => return Ok(DecodeStatus::Hole),
                Some(DecodeStatus::Hole) => {
                    self.hole_pending = true;
                    break;
                }
                Some(DecodeStatus::Frames(_)) => break,
            }

            let frames = (wanted - filled).min(self.pending_frames());
            let samples = frames * self.channels;
            let src = self.pending_offset;
            let dst = filled * self.channels;
            out[dst..dst + samples].copy_from_slice(&self.pending[src..src + samples]);
            self.pending_offset += samples;
            filled += frames;
        }

        self.position += filled as u64;
        Ok(DecodeStatus::Frames(filled))
    }

    fn seek(&mut self, frame: u64) -> Result<(), DecoderFault> {
        if let Some(total) = self.total_frames {
            if frame > total {
                return Err(DecoderFault::SeekOutOfRange {
                    target: frame,
                    total,
                });
            }
        }

        let seeked = self
            .format
            .seek(
                SeekMode::Accurate,
                SeekTo::TimeStamp {
                    ts: frame,
                    track_id: self.track_id,
                },
            )
            .map_err(|e| DecoderFault::Seek(e.to_string()))?;

        self.decoder.reset();
        self.pending.clear();
        self.pending_offset = 0;
        self.discard_frames = seeked.required_ts.saturating_sub(seeked.actual_ts);
        self.hole_pending = false;
        self.exhausted = false;
        self.position = frame;

        debug!(
            "Seeked to frame {} (landed at {}, discarding {})",
            frame, seeked.actual_ts, self.discard_frames
        );
        Ok(())
    }

    fn tell(&self) -> Result<u64, DecoderFault> {
        Ok(self.position)
    }

    fn tags(&self) -> Option<&Tags> {
        self.tags.as_ref()
    }
}
