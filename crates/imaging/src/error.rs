//! Imaging error types

use thiserror::Error;

/// A zero sample met mid-render; the frame is abandoned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("zero sample in segment {segment} at word {word}")]
pub struct CorruptSample {
    /// 1-based segment holding the sample
    pub segment: u8,
    /// Word index within the segment run
    pub word: usize,
}
