//! Locating the book sections of a file
//!
//! A section is a header record followed by its text records. Plain MOBI
//! files hold a single section starting at record 0, combo files append a
//! second (KF8) book after a `BOUNDARY` record.

use binrw::BinRead;
use byteorder::{BigEndian, ByteOrder};
use std::{
    io::{Cursor, Read, Seek, SeekFrom},
    ops::Range,
};
use tracing::{debug, instrument};

use crate::{
    compression::CompressionMethod,
    container::ContainerHeader,
    error::{ContainerError, Error, Result},
    trailing::TrailingEntries,
    types::{PalmDocHeader, PALMDOC_HEADER_SIZE},
};

/// Marker record separating the two books of a combo file
pub const BOUNDARY_MARKER: &[u8; 8] = b"BOUNDARY";

/// Compression and extent of the text of a book section
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct TextStreamHeader {
    /// How the text records are compressed
    pub compression: CompressionMethod,

    /// Length of the uncompressed text
    pub text_length: u32,

    /// Number of text records following the header record
    pub text_record_count: u16,

    /// Maximum uncompressed size of a text record
    pub text_record_size: u16,

    /// Encryption type, always zero once parsed
    pub encryption: u16,
}

impl TextStreamHeader {
    /// Parse the PalmDOC header at the start of header record `record`
    pub fn parse(record: usize, data: &[u8]) -> Result<TextStreamHeader> {
        if data.len() < PALMDOC_HEADER_SIZE {
            return Err(ContainerError::TruncatedHeader {
                record,
                len: data.len(),
            }
            .into());
        }

        let raw = PalmDocHeader::read(&mut Cursor::new(data))?;

        let compression = CompressionMethod::try_from(raw.compression)
            .map_err(|code| Error::UnsupportedCompression { record, code })?;

        if raw.encryption != 0 {
            return Err(Error::Encrypted {
                record,
                encryption: raw.encryption,
            });
        }

        Ok(TextStreamHeader {
            compression,
            text_length: raw.text_length,
            text_record_count: raw.text_records,
            text_record_size: raw.text_record_size,
            encryption: raw.encryption,
        })
    }
}

/// The MOBI header following the PalmDOC header
///
/// Only the fields needed to locate and decode the text and metadata are kept.
/// Fields past the declared header length read as zero.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FormatHeader {
    /// Length of the MOBI header, starting at its magic
    pub header_length: u32,

    /// Kind of book, 2 for a MOBI book
    pub mobi_type: u32,

    /// Code page of the text, 1252 or 65001
    pub text_encoding: u32,

    /// Unique id of the book
    pub unique_id: u32,

    /// Version of the MOBI format
    pub file_version: u32,

    /// Offset of the full title within the header record
    pub full_name_offset: u32,

    /// Length of the full title
    pub full_name_length: u32,

    /// Language code of the book
    pub locale: u32,

    /// Minimum reader version required
    pub min_version: u32,

    /// First image record, relative to the header record
    pub first_image_record: u32,

    /// First HUFF record, relative to the header record
    pub huffman_record_offset: u32,

    /// Number of HUFF and CDIC records
    pub huffman_record_count: u32,

    /// Bit 0x40 marks an EXTH block after the header
    pub exth_flags: u32,

    /// Trailing data flags for the text records
    pub extra_data_flags: u16,
}

impl FormatHeader {
    /// Magic identifying the MOBI header
    pub const MAGIC: &'static [u8; 4] = b"MOBI";

    /// Parse the MOBI header of a header record, `None` for plain PalmDOC books
    pub fn parse(data: &[u8]) -> Option<FormatHeader> {
        let start = PALMDOC_HEADER_SIZE;
        if data.get(start..start + 4)? != Self::MAGIC {
            return None;
        }

        let header_length = data.get(start + 4..start + 8).map(BigEndian::read_u32)?;
        let end = data.len().min(start + header_length as usize);
        let field = |offset: usize| {
            data.get(offset..offset + 4)
                .filter(|_| offset + 4 <= end)
                .map_or(0, BigEndian::read_u32)
        };

        let mut header = FormatHeader {
            header_length,
            mobi_type: field(0x18),
            text_encoding: field(0x1C),
            unique_id: field(0x20),
            file_version: field(0x24),
            full_name_offset: field(0x54),
            full_name_length: field(0x58),
            locale: field(0x5C),
            min_version: field(0x68),
            first_image_record: field(0x6C),
            huffman_record_offset: field(0x70),
            huffman_record_count: field(0x74),
            exth_flags: field(0x80),
            extra_data_flags: 0,
        };

        if header_length >= 0xE4 && header.min_version >= 5 && 0xF4 <= end {
            header.extra_data_flags = BigEndian::read_u16(&data[0xF2..0xF4]);
        }

        Some(header)
    }

    /// Trailing data declared for every text record
    pub fn trailing_entries(&self) -> TrailingEntries {
        TrailingEntries::from_flags(self.extra_data_flags)
    }

    /// Whether an EXTH block follows the header
    pub fn has_exth(&self) -> bool {
        self.exth_flags & 0x40 != 0
    }

    /// Offset of the EXTH block within the header record
    pub fn exth_offset(&self) -> usize {
        PALMDOC_HEADER_SIZE + self.header_length as usize
    }
}

/// A header record and the text records it describes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookSection {
    /// Record holding the PalmDOC and MOBI headers
    pub header_record: usize,

    /// First text record
    pub start_record: usize,

    /// The text layout of the section
    pub text: TextStreamHeader,

    /// The MOBI header, `None` for plain PalmDOC books
    pub format: Option<FormatHeader>,
}

impl BookSection {
    /// Read the section whose headers are stored in `header_record`
    #[instrument(skip(container, reader), err)]
    pub fn read<R: Read + Seek>(
        container: &ContainerHeader,
        reader: &mut R,
        header_record: usize,
    ) -> Result<BookSection> {
        let data = container.read_record(reader, header_record)?;
        Self::parse(container, header_record, &data)
    }

    /// Parse the section from the contents of its header record
    pub fn parse(
        container: &ContainerHeader,
        header_record: usize,
        data: &[u8],
    ) -> Result<BookSection> {
        let text = TextStreamHeader::parse(header_record, data)?;
        let format = FormatHeader::parse(data);

        let section = BookSection {
            header_record,
            start_record: header_record + 1,
            text,
            format,
        };

        if section.text_records().end > container.len() {
            return Err(ContainerError::TextRecordsOutOfRange {
                header: header_record,
                count: text.text_record_count as usize,
                available: container.len(),
            }
            .into());
        }

        debug!(
            header_record,
            compression = ?text.compression,
            records = text.text_record_count,
            "read book section"
        );

        Ok(section)
    }

    /// The text records of this section
    pub fn text_records(&self) -> Range<usize> {
        self.start_record..self.start_record + self.text.text_record_count as usize
    }

    /// Trailing data declared for every text record
    pub fn trailing_entries(&self) -> TrailingEntries {
        self.format
            .as_ref()
            .map(FormatHeader::trailing_entries)
            .unwrap_or_default()
    }

    /// The HUFF record followed by the CDIC records, as absolute record indices
    pub fn huffman_records(&self) -> Option<Range<usize>> {
        let format = self.format.as_ref()?;
        let start = self.header_record + format.huffman_record_offset as usize;
        Some(start..start + format.huffman_record_count as usize)
    }
}

/// Find every book section of the file
///
/// The first section always starts at record 0. Records from the first
/// section's text record count onwards are scanned for a [`BOUNDARY_MARKER`],
/// a match starts a second section at the record after it.
#[instrument(skip_all, err)]
pub fn locate_sections<R: Read + Seek>(
    container: &ContainerHeader,
    reader: &mut R,
) -> Result<Vec<BookSection>> {
    let first = BookSection::read(container, reader, 0)?;

    let scan = first.text.text_record_count as usize..container.len().saturating_sub(1);
    for index in scan {
        if container.record_len(index)? < BOUNDARY_MARKER.len() as u64 {
            continue;
        }

        let mut marker = [0u8; 8];
        reader.seek(SeekFrom::Start(container.record_range(index)?.start))?;
        reader.read_exact(&mut marker)?;

        if &marker == BOUNDARY_MARKER {
            debug!(record = index, "found combo boundary");
            let second = BookSection::read(container, reader, index + 1)?;
            return Ok(vec![first, second]);
        }
    }

    Ok(vec![first])
}
