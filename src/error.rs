//! Engine error types.
//!
//! A hard error ends the current producer attempt; it never tears down
//! the broadcast or its viewers.

use std::fmt;

/// Convenience alias for engine results.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Hard errors surfaced by [`crate::Broadcast::write`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineError {
    /// The input cannot be parsed as EBML.
    MalformedEbml,
    /// A non-container tag longer than the 1 MiB cap.
    BlockTooLarge,
    /// `Info/TimecodeScale` is not one millisecond.
    InvalidTimecodeScale,
    /// A `Duration` too wide to void in place.
    DurationTooLarge,
    /// A track number at or beyond the 32-track limit.
    TooManyTracks,
    /// A block with a malformed or out-of-range track number.
    InvalidTrack,
    /// A `BlockGroup` without an inner `Block`.
    BlockGroupMissingBlock,
    /// A top-level element the relay does not recognize.
    UnknownTag(u32),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::MalformedEbml => write!(f, "malformed EBML"),
            EngineError::BlockTooLarge => write!(f, "data block too big"),
            EngineError::InvalidTimecodeScale => write!(f, "invalid timecode scale"),
            EngineError::DurationTooLarge => write!(f, "EBML Duration too large"),
            EngineError::TooManyTracks => write!(f, "too many tracks"),
            EngineError::InvalidTrack => write!(f, "invalid track"),
            EngineError::BlockGroupMissingBlock => {
                write!(f, "a BlockGroup contains no Blocks")
            }
            EngineError::UnknownTag(id) => write!(f, "unknown EBML tag 0x{:X}", id),
        }
    }
}

impl std::error::Error for EngineError {}
