//! Book metadata from the database header, MOBI header and EXTH block

use binrw::BinRead;
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use std::io::{Cursor, Seek, SeekFrom};

use crate::{
    error::Result,
    section::BookSection,
    types::{ExthHeader, ExthRecord, PdbHeader},
};

/// EXTH record holding an author, may repeat
pub const EXTH_AUTHOR: u32 = 100;
/// EXTH record holding the publisher
pub const EXTH_PUBLISHER: u32 = 101;
/// EXTH record holding the description
pub const EXTH_DESCRIPTION: u32 = 103;
/// EXTH record holding the ASIN
pub const EXTH_ASIN: u32 = 113;
/// EXTH record holding a title that replaces the full name
pub const EXTH_UPDATED_TITLE: u32 = 503;
/// EXTH record holding the ASIN when 113 is missing
pub const EXTH_ALT_ASIN: u32 = 504;

/// Character encoding of the text and metadata strings
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum TextEncoding {
    #[default]
    Windows1252,
    Utf8,
}

impl TextEncoding {
    /// Map a MOBI header code page, anything but 65001 is treated as CP1252
    pub fn from_code_page(code_page: u32) -> Self {
        match code_page {
            65001 => TextEncoding::Utf8,
            _ => TextEncoding::Windows1252,
        }
    }

    fn encoding(&self) -> &'static Encoding {
        match self {
            TextEncoding::Windows1252 => WINDOWS_1252,
            TextEncoding::Utf8 => UTF_8,
        }
    }

    /// Decode bytes, replacing anything malformed
    pub fn decode(&self, bytes: &[u8]) -> String {
        self.encoding()
            .decode_without_bom_handling(bytes)
            .0
            .into_owned()
    }
}

/// Descriptive information about a book
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Metadata {
    /// Name of the PDB database
    pub database_name: String,
    /// Title of the book
    pub title: String,
    /// Every author listed
    pub authors: Vec<String>,
    pub publisher: Option<String>,
    pub description: Option<String>,
    /// Amazon product id
    pub asin: Option<String>,
    /// Unique id from the MOBI header
    pub unique_id: u32,
    pub text_encoding: TextEncoding,
    /// Language code from the MOBI header
    pub locale: u32,
    /// All EXTH records, in file order
    pub records: Vec<ExthRecord>,
}

impl Metadata {
    /// Collect the metadata of a section from the contents of its header record
    pub fn parse(pdb: &PdbHeader, section: &BookSection, header_record: &[u8]) -> Result<Metadata> {
        let Some(format) = &section.format else {
            let database_name = TextEncoding::Windows1252.decode(pdb.name());
            return Ok(Metadata {
                title: database_name.clone(),
                database_name,
                ..Default::default()
            });
        };

        let encoding = TextEncoding::from_code_page(format.text_encoding);
        let database_name = encoding.decode(pdb.name());

        let records = if format.has_exth() {
            let mut cursor = Cursor::new(header_record);
            cursor.seek(SeekFrom::Start(format.exth_offset() as u64))?;
            ExthHeader::read(&mut cursor)?.records
        } else {
            Vec::new()
        };

        let find = |kind: u32| {
            records
                .iter()
                .find(|r| r.kind == kind)
                .map(|r| encoding.decode(&r.data))
        };

        let full_name_start = format.full_name_offset as usize;
        let full_name = header_record
            .get(full_name_start..full_name_start + format.full_name_length as usize)
            .filter(|name| !name.is_empty())
            .map(|name| encoding.decode(name));

        let title = find(EXTH_UPDATED_TITLE)
            .or(full_name)
            .unwrap_or_else(|| database_name.clone());

        let authors = records
            .iter()
            .filter(|r| r.kind == EXTH_AUTHOR)
            .map(|r| encoding.decode(&r.data))
            .collect();

        Ok(Metadata {
            database_name,
            title,
            authors,
            publisher: find(EXTH_PUBLISHER),
            description: find(EXTH_DESCRIPTION),
            asin: find(EXTH_ASIN).or_else(|| find(EXTH_ALT_ASIN)),
            unique_id: format.unique_id,
            text_encoding: encoding,
            locale: format.locale,
            records,
        })
    }
}
