//! Text record decompression.

use std::sync::Arc;

use tracing::instrument;

use crate::{error::DecodeError, huffcdic::HuffmanTable};

/// Identifies the scheme used to compress the text records of a book section
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
#[repr(u16)]
pub enum CompressionMethod {
    /// Stores the text as it is
    #[default]
    None = 1,

    /// PalmDOC LZ77 byte pair compression
    PalmDoc = 2,

    /// Huffman coding against CDIC phrase dictionaries
    HuffCdic = 17480,
}

impl TryFrom<u16> for CompressionMethod {
    type Error = u16;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(CompressionMethod::None),
            2 => Ok(CompressionMethod::PalmDoc),
            17480 => Ok(CompressionMethod::HuffCdic),
            other => Err(other),
        }
    }
}

/// Turns a single trimmed text record into markup
///
/// Chosen once per book section from its [`CompressionMethod`]. The Huffman
/// variant shares its loaded tables read-only between every record it decodes.
#[derive(Debug, Clone)]
pub enum Decompressor {
    Uncompressed,
    PalmDoc,
    HuffCdic(Arc<HuffmanTable>),
}

impl Decompressor {
    /// The compression scheme this decompressor reads
    pub fn method(&self) -> CompressionMethod {
        match self {
            Decompressor::Uncompressed => CompressionMethod::None,
            Decompressor::PalmDoc => CompressionMethod::PalmDoc,
            Decompressor::HuffCdic(_) => CompressionMethod::HuffCdic,
        }
    }

    /// Decompress one record
    #[instrument(skip_all, err, fields(method = ?self.method(), size = data.len()))]
    pub fn unpack(&self, data: &[u8]) -> Result<Vec<u8>, DecodeError> {
        match self {
            Decompressor::Uncompressed => Ok(data.to_vec()),
            Decompressor::PalmDoc => palmdoc_decompress(data),
            Decompressor::HuffCdic(table) => table.unpack(data),
        }
    }
}

/// Decompress PalmDOC LZ77 data
///
/// | Control byte  | Meaning                                                   |
/// |---------------|-----------------------------------------------------------|
/// | `0x00`        | the byte itself                                           |
/// | `0x01..=0x08` | copy the following 1 to 8 bytes unchanged                 |
/// | `0x09..=0x7F` | the byte itself                                           |
/// | `0x80..=0xBF` | with the next byte: 11 bit distance and 3 bit length - 3  |
/// | `0xC0..=0xFF` | a space followed by the byte XOR `0x80`                   |
pub fn palmdoc_decompress(data: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let mut out: Vec<u8> = Vec::with_capacity(data.len() * 2);
    let mut pos = 0usize;

    while pos < data.len() {
        let offset = pos;
        let control = data[pos];
        pos += 1;

        match control {
            0x01..=0x08 => {
                let end = pos + control as usize;
                let literal = data.get(pos..end).ok_or_else(|| DecodeError::TruncatedStream {
                    offset,
                    needed: end - data.len(),
                })?;
                out.extend_from_slice(literal);
                pos = end;
            }
            0x00 | 0x09..=0x7F => out.push(control),
            0x80..=0xBF => {
                let next = *data
                    .get(pos)
                    .ok_or(DecodeError::TruncatedStream { offset, needed: 1 })?;
                pos += 1;

                let pair = u16::from_be_bytes([control, next]);
                let distance = ((pair >> 3) & 0x07FF) as usize;
                let length = ((pair & 0x07) + 3) as usize;

                if distance == 0 || distance > out.len() {
                    return Err(DecodeError::InvalidDistance {
                        offset,
                        distance,
                        available: out.len(),
                    });
                }

                // Copied one byte at a time, the source may overlap the bytes being written
                let start = out.len() - distance;
                for i in 0..length {
                    let byte = out[start + i];
                    out.push(byte);
                }
            }
            0xC0..=0xFF => {
                out.push(b' ');
                out.push(control ^ 0x80);
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    use crate::compression::{palmdoc_decompress, CompressionMethod, Decompressor};
    use crate::error::DecodeError;

    #[test]
    fn compression_codes() {
        assert_eq!(CompressionMethod::try_from(1), Ok(CompressionMethod::None));
        assert_eq!(CompressionMethod::try_from(2), Ok(CompressionMethod::PalmDoc));
        assert_eq!(
            CompressionMethod::try_from(17480),
            Ok(CompressionMethod::HuffCdic)
        );
        assert_eq!(CompressionMethod::try_from(0), Err(0));
        assert_eq!(CompressionMethod::try_from(3), Err(3));
    }

    #[traced_test]
    #[test]
    fn unpack_uncompressed() -> Result<(), DecodeError> {
        let input = b"<html>\x80\xff</html>";
        assert_eq!(Decompressor::Uncompressed.unpack(input)?, input.to_vec());
        Ok(())
    }

    #[test]
    fn palmdoc_literal_run_then_literal() -> Result<(), DecodeError> {
        let input = [0x05, b'H', b'e', b'l', b'l', b'o', 0x20];
        assert_eq!(palmdoc_decompress(&input)?, b"Hello ".to_vec());
        Ok(())
    }

    #[test]
    fn palmdoc_literal_run_is_not_interpreted() -> Result<(), DecodeError> {
        let input = [0x03, 0x80, 0xC1, 0x02, b'!'];
        assert_eq!(palmdoc_decompress(&input)?, vec![0x80, 0xC1, 0x02, b'!']);
        Ok(())
    }

    #[test]
    fn palmdoc_zero_byte() -> Result<(), DecodeError> {
        assert_eq!(palmdoc_decompress(&[0x00, b'a'])?, vec![0x00, b'a']);
        Ok(())
    }

    #[test]
    fn palmdoc_space_pair() -> Result<(), DecodeError> {
        let input = [b'a', 0xE2, 0xEF, 0xF9];
        assert_eq!(palmdoc_decompress(&input)?, b"a b o y".to_vec());
        Ok(())
    }

    #[test]
    fn palmdoc_back_reference() -> Result<(), DecodeError> {
        // distance 4, length 4
        let input = [b'a', b'b', b'c', b'd', 0x80, 0x21];
        assert_eq!(palmdoc_decompress(&input)?, b"abcdabcd".to_vec());
        Ok(())
    }

    #[test]
    fn palmdoc_overlapping_back_reference() -> Result<(), DecodeError> {
        // distance 1, length 10
        let input = [b'-', 0x80, 0x0F];
        assert_eq!(palmdoc_decompress(&input)?, b"-----------".to_vec());

        // distance 2, length 5
        let input = [b'a', b'b', 0x80, 0x12];
        assert_eq!(palmdoc_decompress(&input)?, b"abababa".to_vec());
        Ok(())
    }

    #[test]
    fn palmdoc_golden_sentence() -> Result<(), DecodeError> {
        #[rustfmt::skip]
        let input = [
            0x3C, 0x70, 0x3E, 0x54, 0x68, 0x65, 0xE3, 0x61, 0x74, 0xE1,
            0x74, 0xF4, 0x80, 0x58, 0x6D, 0x61, 0x74, 0x2C, 0x80, 0x4A,
            0x80, 0xA1, 0x73, 0x61, 0x74, 0x21, 0x3C, 0x2F, 0x70, 0x3E,
        ];
        assert_eq!(
            palmdoc_decompress(&input)?,
            b"<p>The cat at the mat, the cat sat!</p>".to_vec()
        );
        Ok(())
    }

    #[test]
    fn palmdoc_truncated_literal_run() {
        let input = [b'a', 0x04, b'b', b'c'];
        assert_eq!(
            palmdoc_decompress(&input),
            Err(DecodeError::TruncatedStream {
                offset: 1,
                needed: 2
            })
        );
    }

    #[test]
    fn palmdoc_truncated_back_reference() {
        let input = [b'a', b'b', 0x80];
        assert_eq!(
            palmdoc_decompress(&input),
            Err(DecodeError::TruncatedStream {
                offset: 2,
                needed: 1
            })
        );
    }

    #[test]
    fn palmdoc_back_reference_before_start() {
        let input = [b'a', 0x80, 0x10];
        assert_eq!(
            palmdoc_decompress(&input),
            Err(DecodeError::InvalidDistance {
                offset: 1,
                distance: 2,
                available: 1
            })
        );
    }
}
