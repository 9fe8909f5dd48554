//! Variable-length and fixed-width integer coding.
//!
//! The width of a variable-length value is encoded in unary in the high
//! bits of its first byte: the position of the most significant 1-bit,
//! counting from the MSB and 1-indexed, is the total width in bytes
//! (1 to 8). Tag ids keep that marker bit; size fields clear it.
//!
//! ```text
//! 1xxxxxxx
//! 01xxxxxx xxxxxxxx
//! 001xxxxx xxxxxxxx xxxxxxxx
//! ...
//! 00000001 xxxxxxxx xxxxxxxx xxxxxxxx xxxxxxxx xxxxxxxx xxxxxxxx xxxxxxxx
//! ```

use bytes::BufMut;

use super::tags::{INDETERMINATE, INDETERMINATE_CODINGS};

/// Fold up to eight big-endian bytes into an unsigned integer.
pub fn fixed_uint(data: &[u8]) -> u64 {
    data.iter().fold(0, |acc, &b| acc << 8 | u64::from(b))
}

/// Decode a tag id, marker bit included.
///
/// Returns the value and its width, or `None` when the buffer is too
/// short or the first byte is zero (no marker within eight bytes).
pub fn tag_id(data: &[u8]) -> Option<(u64, usize)> {
    let first = *data.first()?;
    if first == 0 {
        return None;
    }
    let width = 1 + first.leading_zeros() as usize;
    if data.len() < width {
        return None;
    }
    Some((fixed_uint(&data[..width]), width))
}

/// Decode a size field: marker bit cleared, with the eight all-ones
/// encodings collapsed to [`INDETERMINATE`].
pub fn vint(data: &[u8]) -> Option<(u64, usize)> {
    let (raw, width) = tag_id(data)?;
    if INDETERMINATE_CODINGS[width] == raw {
        return Some((INDETERMINATE, width));
    }
    Some((raw & !(1 << (7 * width)), width))
}

/// Append `value` as a `width`-byte big-endian unsigned integer.
pub fn put_fixed_uint(out: &mut impl BufMut, value: u64, width: usize) {
    for shift in (0..width).rev() {
        out.put_u8((value >> (8 * shift)) as u8);
    }
}

/// Wire width of a tag id, marker bit included.
pub fn id_width(id: u32) -> usize {
    (32 - id.leading_zeros() as usize + 7) / 8
}

/// Append a tag header: the id bytes followed by a minimal-width size
/// field. [`INDETERMINATE`] is written in its canonical one-byte form.
pub fn put_tag_header(out: &mut impl BufMut, id: u32, size: u64) {
    put_fixed_uint(out, u64::from(id), id_width(id));
    if size == INDETERMINATE {
        out.put_u8(0xFF);
        return;
    }
    let mut width = 1;
    while size >= (1 << (7 * width)) - 1 {
        width += 1;
    }
    put_fixed_uint(out, size | 1 << (7 * width), width);
}
