//! Core audio data types shared by the decoder and resampler collaborators

use std::collections::BTreeMap;

/// Rate at which every decoder collaborator produces PCM.
pub const NATIVE_SAMPLE_RATE: u32 = 48000;

/// Outcome of one forward decode call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStatus {
    /// Frames written into the caller's buffer. `Frames(0)` is end of stream.
    Frames(usize),

    /// The decoder hit corrupted or missing data and has already skipped past it.
    /// Nothing was written; calling again continues after the gap.
    Hole,
}

/// Container metadata passed through from the decoder.
///
/// Comment keys are stored upper-cased so lookups are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tags {
    /// Encoder name, taken from the container's ENCODER tag when present
    pub vendor: Option<String>,

    comments: BTreeMap<String, String>,
}

impl Tags {
    /// Create an empty tag set
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a comment. Later values for the same key replace earlier ones.
    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        self.comments.insert(key.to_uppercase(), value.into());
    }

    /// Look up a comment by key (any case)
    pub fn get(&self, key: &str) -> Option<&str> {
        self.comments.get(&key.to_uppercase()).map(String::as_str)
    }

    /// Iterate comments in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.comments.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.comments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comments.is_empty() && self.vendor.is_none()
    }
}
