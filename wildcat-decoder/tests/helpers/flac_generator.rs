//! FLAC test fixture generation
//!
//! Hand-assembles small 48 kHz, 16-bit FLAC streams with verbatim subframes so
//! tests control every frame, including ones that fail to decode. Samples
//! encode their frame index the same way the WAV ramp does.

/// Frames per FLAC block in generated streams
pub const FLAC_BLOCK_FRAMES: u16 = 1024;

const RESERVED_SUBFRAME: u8 = 0b0000_0100;
const VERBATIM_SUBFRAME: u8 = 0b0000_0010;

/// Layout of a generated FLAC stream
#[derive(Debug, Clone, Default)]
pub struct FlacFixture {
    /// Channel count (1-8)
    pub channels: u8,
    /// Number of full blocks
    pub blocks: u8,
    /// Blocks whose first subframe carries a reserved type
    pub corrupt_blocks: Vec<u8>,
    /// `KEY=value` entries for a VORBIS_COMMENT block
    pub comments: Vec<String>,
}

impl FlacFixture {
    pub fn new(channels: u8, blocks: u8) -> Self {
        Self {
            channels,
            blocks,
            ..Default::default()
        }
    }

    pub fn with_corrupt_block(mut self, block: u8) -> Self {
        self.corrupt_blocks.push(block);
        self
    }

    pub fn with_comment(mut self, comment: &str) -> Self {
        self.comments.push(comment.to_string());
        self
    }

    /// Total frames declared in STREAMINFO
    pub fn total_frames(&self) -> u64 {
        u64::from(self.blocks) * u64::from(FLAC_BLOCK_FRAMES)
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = b"fLaC".to_vec();

        let has_comments = !self.comments.is_empty();
        write_block_header(&mut out, 0, !has_comments, 34);
        out.extend_from_slice(&self.stream_info());

        if has_comments {
            let body = vorbis_comment(&self.comments);
            write_block_header(&mut out, 4, true, body.len());
            out.extend_from_slice(&body);
        }

        for block in 0..self.blocks {
            out.extend_from_slice(&self.frame(block));
        }
        out
    }

    fn stream_info(&self) -> Vec<u8> {
        let mut info = Vec::with_capacity(34);
        info.extend_from_slice(&FLAC_BLOCK_FRAMES.to_be_bytes());
        info.extend_from_slice(&FLAC_BLOCK_FRAMES.to_be_bytes());
        // Min/max frame size unknown
        info.extend_from_slice(&[0; 6]);
        let packed = (48_000u64 << 44)
            | (u64::from(self.channels - 1) << 41)
            | (15u64 << 36)
            | self.total_frames();
        info.extend_from_slice(&packed.to_be_bytes());
        // No MD5
        info.extend_from_slice(&[0; 16]);
        info
    }

    fn frame(&self, block: u8) -> Vec<u8> {
        assert!(block < 0x80, "frame numbers above 127 need multi-byte coding");

        let mut frame = vec![
            0xFF,
            0xF8,
            // Block size from the 16-bit field below, 48 kHz
            0x7A,
            // Independent channels, 16 bits per sample
            ((self.channels - 1) << 4) | (0b100 << 1),
            block,
        ];
        frame.extend_from_slice(&(FLAC_BLOCK_FRAMES - 1).to_be_bytes());
        frame.push(crc8(&frame));

        let first = u64::from(block) * u64::from(FLAC_BLOCK_FRAMES);
        for channel in 0..self.channels {
            let subframe = if channel == 0 && self.corrupt_blocks.contains(&block) {
                RESERVED_SUBFRAME
            } else {
                VERBATIM_SUBFRAME
            };
            frame.push(subframe);
            for index in 0..u64::from(FLAC_BLOCK_FRAMES) {
                let sample = ((first + index) % 32768) as i16;
                frame.extend_from_slice(&sample.to_be_bytes());
            }
        }

        let crc = crc16(&frame);
        frame.extend_from_slice(&crc.to_be_bytes());
        frame
    }
}

fn write_block_header(out: &mut Vec<u8>, block_type: u8, last: bool, len: usize) {
    out.push(if last { 0x80 | block_type } else { block_type });
    out.extend_from_slice(&(len as u32).to_be_bytes()[1..]);
}

fn vorbis_comment(comments: &[String]) -> Vec<u8> {
    let vendor = b"wildcat fixture";
    let mut body = Vec::new();
    body.extend_from_slice(&(vendor.len() as u32).to_le_bytes());
    body.extend_from_slice(vendor);
    body.extend_from_slice(&(comments.len() as u32).to_le_bytes());
    for comment in comments {
        body.extend_from_slice(&(comment.len() as u32).to_le_bytes());
        body.extend_from_slice(comment.as_bytes());
    }
    body
}

/// CRC-8, polynomial 0x07, as used for FLAC frame headers
fn crc8(data: &[u8]) -> u8 {
    let mut crc: u8 = 0;
    for &byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 { (crc << 1) ^ 0x07 } else { crc << 1 };
        }
    }
    crc
}

/// CRC-16, polynomial 0x8005, as used for whole FLAC frames
fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for &byte in data {
        crc ^= u16::from(byte) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 { (crc << 1) ^ 0x8005 } else { crc << 1 };
        }
    }
    crc
}
