//! Decode/resample pipeline stages
//!
//! One session read is: decode one batch (absorbing holes), then, when the
//! session resamples, convert that batch into the destination buffer.
//!
//! # Hole handling
//!
//! A hole is a gap the decoder already skipped past, so it is retried
//! immediately and never reaches the caller. Holes do not move the position.
//! An optional limit turns a run of more than `limit` consecutive holes into
//! [`Error::HoleRetryExhausted`]. Decoder faults are never retried.

use crate::audio::decoder::DecoderFault;
use crate::audio::resampler::StreamResampler;
use crate::audio::types::DecodeStatus;
use crate::error::{Error, Result};
use crate::session::buffers::DestBuffer;
use tracing::{debug, trace, warn};

/// Run `decode` until it yields frames, retrying through holes.
///
/// Returns the frame count of the first non-hole result.
pub fn retry_holes<F>(limit: Option<u32>, mut decode: F) -> Result<usize>
where
    F: FnMut() -> std::result::Result<DecodeStatus, DecoderFault>,
{
    let mut holes: u32 = 0;
    loop {
        match decode() {
            Ok(DecodeStatus::Frames(written)) => {
                if holes > 0 {
                    debug!("Recovered after {} stream holes", holes);
                }
                return Ok(written);
            }
            Ok(DecodeStatus::Hole) => {
                holes = holes.saturating_add(1);
                trace!("Stream hole #{}, retrying", holes);
                if let Some(limit) = limit {
                    if holes > limit {
                        warn!("Giving up after {} consecutive holes", holes);
                        return Err(Error::HoleRetryExhausted { holes });
                    }
                }
            }
            Err(fault) => {
                warn!("Fatal decode error: {}", fault);
                return Err(Error::DecodeFatal {
                    code: fault.code(),
                    source: fault,
                });
            }
        }
    }
}

/// Convert `written` native-rate frames from `input` into `dest`.
///
/// Returns the frame count now available in `dest`. The resampler must
/// consume every frame it is handed; anything else means the two stages
/// have lost sync.
pub fn resample_batch<R: StreamResampler>(
    resampler: &mut R,
    input: &[f32],
    written: usize,
    dest: &mut DestBuffer,
) -> Result<usize> {
    let capacity = dest.capacity_frames();
    let mut in_len = written;
    let mut out_len = capacity;

    resampler
        .process_interleaved(input, &mut in_len, dest.as_mut_slice(), &mut out_len)
        .map_err(Error::ResamplerProcess)?;

    if in_len != written {
        warn!(
            "Resampler consumed {} of {} frames",
            in_len, written
        );
        return Err(Error::FrameCountMismatch {
            supplied: written,
            consumed: in_len,
        });
    }
    debug_assert!(out_len <= capacity, "resampler overran destination buffer");

    trace!("Resampled {} frames into {}", written, out_len);
    Ok(out_len.min(capacity))
}
