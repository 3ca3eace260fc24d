//! Stripping the trailing entries appended to text records.
//!
//! MOBI writers may append extra data after the compressed text of every
//! record. Which entries are present is declared once per section by the
//! extra data flags of the MOBI header: bit 0 marks a multibyte overhang,
//! every other set bit one self sized trailing entry.

use crate::error::DecodeError;

/// Trailing data present at the end of every text record of a section
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct TrailingEntries {
    /// Number of self sized entries
    pub count: u8,

    /// Whether a multibyte overhang precedes the entries
    pub multibyte: bool,
}

impl TrailingEntries {
    /// Derive the trailing data from the extra data flags of a MOBI header
    pub fn from_flags(flags: u16) -> Self {
        TrailingEntries {
            count: (flags >> 1).count_ones() as u8,
            multibyte: flags & 1 != 0,
        }
    }

    /// Strip the trailing data from a record, leaving the compressed text
    ///
    /// Entries are removed from the end one at a time, the multibyte overhang
    /// is only readable once every entry is gone.
    pub fn trim<'a>(&self, record: &'a [u8]) -> Result<&'a [u8], DecodeError> {
        let mut data = record;

        for _ in 0..self.count {
            let size = entry_size(data);
            if size > data.len() {
                return Err(DecodeError::TruncatedStream {
                    offset: data.len(),
                    needed: size - data.len(),
                });
            }
            data = &data[..data.len() - size];
        }

        if self.multibyte {
            let Some(last) = data.last() else {
                return Err(DecodeError::TruncatedStream {
                    offset: 0,
                    needed: 1,
                });
            };
            let size = (*last & 0x03) as usize + 1;
            if size > data.len() {
                return Err(DecodeError::TruncatedStream {
                    offset: data.len(),
                    needed: size - data.len(),
                });
            }
            data = &data[..data.len() - size];
        }

        Ok(data)
    }
}

/// Size of the trailing entry at the end of `data`, including its size bytes
///
/// The size is stored big endian in 7 bit groups within the last 4 bytes, the
/// group it starts at has its top bit set.
fn entry_size(data: &[u8]) -> usize {
    let tail = &data[data.len().saturating_sub(4)..];
    tail.iter().fold(0usize, |size, byte| {
        let size = if byte & 0x80 != 0 { 0 } else { size };
        (size << 7) | (byte & 0x7F) as usize
    })
}
