//! Incremental tag-header extraction over a growing byte buffer.

use super::vint;

/// A parsed EBML tag header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag {
    /// Element id, marker bit included.
    pub id: u32,
    /// Declared body length; may be [`super::INDETERMINATE`].
    pub size: u64,
    /// Bytes occupied by the id and size fields together.
    pub header_len: usize,
}

/// Outcome of a parse over a possibly-incomplete buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parsed {
    /// A complete tag header (and, for [`Tag::parse`], body).
    Tag(Tag),
    /// The buffer ends before the tag does.
    NeedMore,
    /// The bytes cannot begin a valid tag.
    Malformed,
}

impl Tag {
    /// Parse the id and size fields at the start of `data`.
    pub fn parse_header(data: &[u8]) -> Parsed {
        match data.first() {
            None => return Parsed::NeedMore,
            Some(0) => return Parsed::Malformed,
            Some(_) => {}
        }
        let Some((id, id_len)) = vint::tag_id(data) else {
            return Parsed::NeedMore;
        };
        // Matroska ids are at most four bytes.
        let Ok(id) = u32::try_from(id) else {
            return Parsed::Malformed;
        };
        match data[id_len..].first() {
            None => return Parsed::NeedMore,
            Some(0) => return Parsed::Malformed,
            Some(_) => {}
        }
        let Some((size, size_len)) = vint::vint(&data[id_len..]) else {
            return Parsed::NeedMore;
        };
        Parsed::Tag(Tag {
            id,
            size,
            header_len: id_len + size_len,
        })
    }

    /// Parse a header and require the whole tag, body included, to be
    /// present in `data`. Used when iterating the children of a
    /// fully-buffered container.
    pub fn parse(data: &[u8]) -> Parsed {
        match Self::parse_header(data) {
            Parsed::Tag(tag) => {
                if tag.header_len as u64 + tag.size <= data.len() as u64 {
                    Parsed::Tag(tag)
                } else {
                    Parsed::NeedMore
                }
            }
            other => other,
        }
    }

    /// The tag's body within the buffer it was parsed from.
    pub fn contents<'a>(&self, data: &'a [u8]) -> &'a [u8] {
        &data[self.header_len..self.header_len + self.size as usize]
    }

    /// The bytes following the tag within the buffer it was parsed from.
    pub fn skip<'a>(&self, data: &'a [u8]) -> &'a [u8] {
        &data[self.header_len + self.size as usize..]
    }
}
