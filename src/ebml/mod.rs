//! EBML primitives: element ids, variable-length integers, and incremental
//! tag extraction.
//!
//! EBML frames every element as a variable-length id, a variable-length
//! size field, and a body of that many bytes. The relay only ever sees a
//! prefix of the stream, so the parser in [`tag`] distinguishes "the
//! buffer ends before the tag does" from "these bytes cannot start a
//! tag".

pub mod tag;
pub mod tags;
pub mod vint;

pub use tag::{Parsed, Tag};
pub use tags::INDETERMINATE;
