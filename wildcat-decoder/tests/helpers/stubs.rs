//! Scripted collaborator stubs
//!
//! [`ScriptedDecoder`] replays a queue of read outcomes before falling back to
//! generating a ramp, and counts how often it is called. [`ShortResampler`]
//! consumes one frame less than it is given.

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;
use wildcat_decoder::audio::{
    DecodeStatus, DecoderFault, PcmDecoder, ResampleFault, ResamplerQuality, StreamResampler, Tags,
};

pub type ReadOutcome = Result<DecodeStatus, DecoderFault>;

pub struct ScriptedDecoder {
    pub channels: usize,
    pub total: Option<u64>,
    pub tags: Option<Tags>,
    script: VecDeque<ReadOutcome>,
    position: u64,
    reads: Rc<Cell<usize>>,
}

impl ScriptedDecoder {
    pub fn new(channels: usize, total: u64) -> Self {
        Self {
            channels,
            total: Some(total),
            tags: None,
            script: VecDeque::new(),
            position: 0,
            reads: Rc::new(Cell::new(0)),
        }
    }

    /// Queue outcomes returned by the next reads, in order
    pub fn with_script(mut self, outcomes: impl IntoIterator<Item = ReadOutcome>) -> Self {
        self.script.extend(outcomes);
        self
    }

    pub fn with_tags(mut self, tags: Tags) -> Self {
        self.tags = Some(tags);
        self
    }

    pub fn without_length(mut self) -> Self {
        self.total = None;
        self
    }

    /// Shared read counter, still readable after the session takes the decoder
    pub fn read_counter(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.reads)
    }

    fn remaining(&self) -> u64 {
        self.total.unwrap_or(u64::MAX).saturating_sub(self.position)
    }
}

impl PcmDecoder for ScriptedDecoder {
    fn open_memory(blob: Vec<u8>) -> Result<Self, DecoderFault> {
        match blob.first() {
            Some(&channels) => Ok(Self::new(channels as usize, 48000)),
            None => Err(DecoderFault::Unrecognized("empty blob".to_string())),
        }
    }

    fn channels(&self) -> usize {
        self.channels
    }

    fn total_frames(&self) -> Result<u64, DecoderFault> {
        self.total.ok_or(DecoderFault::LengthUnknown)
    }

    fn read_interleaved(&mut self, out: &mut [f32]) -> Result<DecodeStatus, DecoderFault> {
        self.reads.set(self.reads.get() + 1);

        if let Some(outcome) = self.script.pop_front() {
            if let Ok(DecodeStatus::Frames(frames)) = outcome {
                self.position += frames as u64;
            }
            return outcome;
        }

        let frames = ((out.len() / self.channels) as u64).min(self.remaining()) as usize;
        for (idx, frame) in out[..frames * self.channels]
            .chunks_exact_mut(self.channels)
            .enumerate()
        {
            frame.fill((self.position + idx as u64) as f32);
        }
        self.position += frames as u64;
        Ok(DecodeStatus::Frames(frames))
    }

    fn seek(&mut self, frame: u64) -> Result<(), DecoderFault> {
        if let Some(total) = self.total {
            if frame > total {
                return Err(DecoderFault::SeekOutOfRange { target: frame, total });
            }
        }
        self.position = frame;
        Ok(())
    }

    fn tell(&self) -> Result<u64, DecoderFault> {
        Ok(self.position)
    }

    fn tags(&self) -> Option<&Tags> {
        self.tags.as_ref()
    }
}

/// Resampler that drops the last supplied frame and halves the rest
pub struct ShortResampler {
    channels: usize,
}

impl StreamResampler for ShortResampler {
    fn new(
        channels: usize,
        _input_rate: u32,
        _output_rate: u32,
        _quality: ResamplerQuality,
    ) -> Result<Self, ResampleFault> {
        Ok(Self { channels })
    }

    fn skip_zeros(&mut self) {}

    fn process_interleaved(
        &mut self,
        input: &[f32],
        in_frames: &mut usize,
        output: &mut [f32],
        out_frames: &mut usize,
    ) -> Result<(), ResampleFault> {
        let consumed = in_frames.saturating_sub(1);
        let produced = (consumed / 2).min(*out_frames);
        for frame in 0..produced {
            let src = frame * 2 * self.channels;
            let dst = frame * self.channels;
            output[dst..dst + self.channels].copy_from_slice(&input[src..src + self.channels]);
        }
        *in_frames = consumed;
        *out_frames = produced;
        Ok(())
    }

    fn reset(&mut self) {}
}
