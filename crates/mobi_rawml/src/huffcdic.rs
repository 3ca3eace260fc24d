//! Huffman/CDIC text decompression.
//!
//! A book compressed this way carries one `HUFF` record describing the code
//! lengths, followed by one or more `CDIC` records holding the phrase
//! dictionary. A code read from the text selects a phrase; terminal phrases
//! are copied to the output, the others are themselves Huffman coded and get
//! decoded in turn.
//!
//! ## HUFF record
//!
//! | Offset (bytes) | Field          | Description                                        |
//! |----------------|----------------|----------------------------------------------------|
//! | 0x0000         | Magic number   | 8 bytes: `HUFF` followed by `0x00000018`           |
//! | 0x0008         | Dispatch table | 4 bytes: offset to 256 code classes                |
//! | 0x000C         | Range table    | 4 bytes: offset to the 32 min/max code pairs       |
//!
//! A code class is selected by the top 8 bits of the next code. It stores the
//! code length in bits 0-4, the terminal flag in bit 7 and the max code in
//! bits 8-31. Classes without the terminal flag only give a lower bound for
//! the length, the range table then decides the actual length.
//!
//! ## CDIC record
//!
//! | Offset (bytes) | Field          | Description                                        |
//! |----------------|----------------|----------------------------------------------------|
//! | 0x0000         | Magic number   | 8 bytes: `CDIC` followed by `0x00000010`           |
//! | 0x0008         | Phrases        | 4 bytes: number of phrases across all CDIC records |
//! | 0x000C         | Bits           | 4 bytes: phrases in this record is `1 << bits`     |
//! | 0x0010         | Offsets        | 2 bytes each: phrase offset relative to 0x10       |
//!
//! Each phrase starts with a 2 byte length, bit 15 marks the phrase as terminal.

use byteorder::{BigEndian, ByteOrder};
use tracing::{debug, instrument};

use crate::error::{DecodeError, TableError};

/// Expected start of a HUFF record
pub const HUFF_MAGIC: &[u8] = b"HUFF\x00\x00\x00\x18";

/// Expected start of a CDIC record
pub const CDIC_MAGIC: &[u8] = b"CDIC\x00\x00\x00\x10";

/// Nesting limit for phrases that expand into other phrases
pub const DEFAULT_MAX_DEPTH: usize = 16;

const PHRASE_TERMINAL: u16 = 0x8000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CodeClass {
    length: u8,
    terminal: bool,
    max_code: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Phrase {
    data: Vec<u8>,
    terminal: bool,
}

/// Huffman code tables and phrase dictionary of a book
///
/// Built once from the HUFF record and its CDIC records, afterwards only read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuffmanTable {
    classes: Vec<CodeClass>,
    min_codes: [u64; 33],
    max_codes: [u64; 33],
    phrases: Vec<Phrase>,
    max_depth: usize,
}

fn be_u32(data: &[u8], offset: usize) -> Result<u32, TableError> {
    data.get(offset..offset + 4)
        .map(BigEndian::read_u32)
        .ok_or(TableError::OutOfBounds {
            offset,
            len: 4,
            available: data.len(),
        })
}

fn be_u16(data: &[u8], offset: usize) -> Result<u16, TableError> {
    data.get(offset..offset + 2)
        .map(BigEndian::read_u16)
        .ok_or(TableError::OutOfBounds {
            offset,
            len: 2,
            available: data.len(),
        })
}

fn table<'a>(data: &'a [u8], offset: usize, len: usize) -> Result<&'a [u8], TableError> {
    data.get(offset..offset + len).ok_or(TableError::OutOfBounds {
        offset,
        len,
        available: data.len(),
    })
}

impl HuffmanTable {
    /// Read the code tables from a HUFF record
    #[instrument(skip_all, err, fields(size = huff.len()))]
    pub fn load_huff(huff: &[u8]) -> Result<HuffmanTable, TableError> {
        if !huff.starts_with(HUFF_MAGIC) {
            return Err(TableError::BadMagic {
                expected: HUFF_MAGIC,
            });
        }

        let dispatch_offset = be_u32(huff, 8)? as usize;
        let range_offset = be_u32(huff, 12)? as usize;

        let classes = table(huff, dispatch_offset, 256 * 4)?
            .chunks_exact(4)
            .enumerate()
            .map(|(index, entry)| {
                let value = BigEndian::read_u32(entry);
                let length = (value & 0x1F) as u8;
                let terminal = value & 0x80 != 0;
                if length == 0 || (length <= 8 && !terminal) {
                    return Err(TableError::InvalidCodeLength {
                        index,
                        length,
                        terminal,
                    });
                }
                let max_code = (((value >> 8) as u64 + 1) << (32 - length)) - 1;
                Ok(CodeClass {
                    length,
                    terminal,
                    max_code,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let ranges = table(huff, range_offset, 64 * 4)?;
        let mut min_codes = [0u64; 33];
        let mut max_codes = [0u64; 33];
        max_codes[0] = u32::MAX as u64;
        for (length, pair) in ranges.chunks_exact(8).enumerate() {
            let length = length + 1;
            let min = BigEndian::read_u32(&pair[..4]) as u64;
            let max = BigEndian::read_u32(&pair[4..]) as u64;
            min_codes[length] = min << (32 - length);
            max_codes[length] = ((max + 1) << (32 - length)) - 1;
        }

        debug!("loaded huffman code tables");

        Ok(HuffmanTable {
            classes,
            min_codes,
            max_codes,
            phrases: Vec::new(),
            max_depth: DEFAULT_MAX_DEPTH,
        })
    }

    /// Append the phrases of a CDIC record to the dictionary
    #[instrument(skip_all, err, fields(size = cdic.len(), loaded = self.phrases.len()))]
    pub fn load_cdic(&mut self, cdic: &[u8]) -> Result<(), TableError> {
        if !cdic.starts_with(CDIC_MAGIC) {
            return Err(TableError::BadMagic {
                expected: CDIC_MAGIC,
            });
        }

        let total = be_u32(cdic, 8)? as usize;
        let bits = be_u32(cdic, 12)?;
        if bits > 16 {
            return Err(TableError::InvalidIndexBits { bits });
        }

        let count = (1usize << bits).min(total.saturating_sub(self.phrases.len()));
        for i in 0..count {
            let offset = 16 + be_u16(cdic, 16 + i * 2)? as usize;
            let header = be_u16(cdic, offset)?;
            let data = table(cdic, offset + 2, (header & !PHRASE_TERMINAL) as usize)?;
            self.phrases.push(Phrase {
                data: data.to_vec(),
                terminal: header & PHRASE_TERMINAL != 0,
            });
        }

        debug!(count, "loaded dictionary phrases");
        Ok(())
    }

    /// Limit how deep phrases may expand into other phrases
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Number of phrases loaded from the CDIC records
    pub fn phrases(&self) -> usize {
        self.phrases.len()
    }

    /// Decode one Huffman coded record
    pub fn unpack(&self, data: &[u8]) -> Result<Vec<u8>, DecodeError> {
        let mut out = Vec::with_capacity(data.len() * 3);
        self.expand(data, 0, &mut out)?;
        Ok(out)
    }

    fn expand(&self, data: &[u8], depth: usize, out: &mut Vec<u8>) -> Result<(), DecodeError> {
        let total_bits = data.len() * 8;
        let mut position = 0usize;

        loop {
            let code = peek_code(data, position);
            let class = self.classes[(code >> 24) as usize];

            let mut length = class.length as usize;
            let mut max_code = class.max_code;
            if !class.terminal {
                while code < self.min_codes[length] {
                    length += 1;
                    if length > 32 {
                        return Err(DecodeError::InvalidCode { offset: position });
                    }
                }
                max_code = self.max_codes[length];
            }

            // Whatever is left is padding shorter than the next code
            if position + length > total_bits {
                break;
            }
            position += length;

            let symbol = (max_code.wrapping_sub(code) >> (32 - length)) as usize;
            let phrase = self
                .phrases
                .get(symbol)
                .ok_or(DecodeError::UnknownSymbol { symbol })?;

            if phrase.terminal {
                out.extend_from_slice(&phrase.data);
            } else {
                if depth >= self.max_depth {
                    return Err(DecodeError::CorruptDictionary { symbol, depth });
                }
                self.expand(&phrase.data, depth + 1, out)?;
            }
        }

        Ok(())
    }
}

/// The 32 bits starting at `position`, most significant bit first, zero padded past the end
fn peek_code(data: &[u8], position: usize) -> u64 {
    let start = position / 8;
    let mut window = [0u8; 8];
    if let Some(available) = data.get(start..) {
        let len = available.len().min(8);
        window[..len].copy_from_slice(&available[..len]);
    }
    let bits = BigEndian::read_u64(&window);
    (bits << (position % 8)) >> 32
}
