//! Matroska/WebM element ids recognized by the relay.
//!
//! Ids keep their leading marker bit, as they appear on the wire.
//! Reference: <https://www.matroska.org/technical/elements.html>

/// Size-field value meaning "extends until the next tag of the same level".
pub const INDETERMINATE: u64 = 0x00FF_FFFF_FFFF_FFFF;

/// The eight wire encodings that decode to [`INDETERMINATE`], indexed by
/// encoded width in bytes.
pub(crate) const INDETERMINATE_CODINGS: [u64; 9] = [
    0,
    0xFF,
    0x7FFF,
    0x003F_FFFF,
    0x1FFF_FFFF,
    0x000F_FFFF_FFFF,
    0x07FF_FFFF_FFFF,
    0x0003_FFFF_FFFF_FFFF,
    0x01FF_FFFF_FFFF_FFFF,
];

pub const VOID: u32 = 0xEC;
pub const EBML: u32 = 0x1A45_DFA3;
pub const SEGMENT: u32 = 0x1853_8067;
pub const SEEK_HEAD: u32 = 0x114D_9B74;
pub const INFO: u32 = 0x1549_A966;
pub const TIMECODE_SCALE: u32 = 0x2A_D7B1;
pub const DURATION: u32 = 0x4489;
pub const TRACKS: u32 = 0x1654_AE6B;
pub const TRACK_ENTRY: u32 = 0xAE;
pub const TRACK_NUMBER: u32 = 0xD7;
pub const VIDEO: u32 = 0xE0;
pub const PIXEL_WIDTH: u32 = 0xB0;
pub const PIXEL_HEIGHT: u32 = 0xBA;
pub const AUDIO: u32 = 0xE1;
pub const CLUSTER: u32 = 0x1F43_B675;
pub const TIMECODE: u32 = 0xE7;
pub const PREV_SIZE: u32 = 0xAB;
pub const SIMPLE_BLOCK: u32 = 0xA3;
pub const BLOCK_GROUP: u32 = 0xA0;
pub const BLOCK: u32 = 0xA1;
pub const REFERENCE_BLOCK: u32 = 0xFB;
pub const CUES: u32 = 0x1C53_BB6B;
pub const CHAPTERS: u32 = 0x1043_A770;
pub const TAGS: u32 = 0x1254_C367;
