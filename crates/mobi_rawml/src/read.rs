//! Types for reading MOBI books
//!

use bon::Builder;
use std::{
    fmt::{self, Debug},
    io::{Read, Seek},
    sync::Arc,
};
use tracing::{debug, instrument, trace};

use crate::{
    compression::{CompressionMethod, Decompressor},
    container::ContainerHeader,
    error::{Error, Result, TableError},
    huffcdic::{HuffmanTable, DEFAULT_MAX_DEPTH},
    metadata::Metadata,
    section::{locate_sections, BookSection},
};

/// Which book of a combo file to read
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum SectionChoice {
    /// The legacy MOBI book stored first
    First,

    /// The book stored last, the KF8 book of a combo file
    #[default]
    Last,
}

/// Options for how a book should be read
#[derive(Debug, Clone, Copy, Builder)]
pub struct ReaderOptions {
    /// The section to extract when the file holds two books
    #[builder(default)]
    pub section: SectionChoice,

    /// How deep dictionary phrases may expand into other phrases
    #[builder(default = DEFAULT_MAX_DEPTH)]
    pub max_dictionary_depth: usize,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        ReaderOptions::builder().build()
    }
}

/// MOBI book reader
///
/// ```no_run
/// use std::io::prelude::*;
///
/// fn dump_markup(reader: impl Read + Seek) -> mobi_rawml::error::Result<()> {
///     let mut book = mobi_rawml::MobiBook::new(reader)?;
///
///     println!("Title: {}", book.metadata()?.title);
///     std::io::stdout().write_all(&book.raw_ml()?)?;
///
///     Ok(())
/// }
/// ```
pub struct MobiBook<R> {
    reader: R,
    container: ContainerHeader,
    sections: Vec<BookSection>,
    active: usize,
    options: ReaderOptions,
}

impl<R> Debug for MobiBook<R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("MobiBook")
            .field("records", &self.container.len())
            .field("sections", &self.sections)
            .field("active", &self.active)
            .finish()
    }
}

impl<R> MobiBook<R> {
    /// The record index of the file
    pub fn container(&self) -> &ContainerHeader {
        &self.container
    }

    /// Every book section found, two for combo files
    pub fn sections(&self) -> &[BookSection] {
        &self.sections
    }

    /// The section the raw markup is read from
    pub fn active_section(&self) -> &BookSection {
        &self.sections[self.active]
    }

    /// Whether the file holds a legacy and a KF8 book
    pub fn is_combo(&self) -> bool {
        self.sections.len() > 1
    }

    /// Returns how the text of the active section is compressed.
    pub fn compression(&self) -> CompressionMethod {
        self.active_section().text.compression
    }

    /// Unwrap and return the inner reader object
    ///
    /// The position of the reader is undefined.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read + Seek> MobiBook<R> {
    /// Read a MOBI book, locating its sections.
    pub fn new(reader: R) -> Result<MobiBook<R>> {
        Self::with_options(reader, ReaderOptions::default())
    }

    /// Read a MOBI book with the given options.
    #[instrument(skip(reader), err)]
    pub fn with_options(mut reader: R, options: ReaderOptions) -> Result<MobiBook<R>> {
        let container = ContainerHeader::read(&mut reader)?;
        let sections = locate_sections(&container, &mut reader)?;

        let active = match options.section {
            SectionChoice::First => 0,
            SectionChoice::Last => sections.len() - 1,
        };

        debug!(sections = sections.len(), active, "opened book");

        Ok(MobiBook {
            reader,
            container,
            sections,
            active,
            options,
        })
    }

    /// Read the raw contents of any record
    pub fn record(&mut self, index: usize) -> Result<Vec<u8>> {
        self.container.read_record(&mut self.reader, index)
    }

    /// Read the metadata of the active section
    #[instrument(skip(self), err)]
    pub fn metadata(&mut self) -> Result<Metadata> {
        let section = self.active_section().clone();
        let data = self.record(section.header_record)?;
        Metadata::parse(self.container.header(), &section, &data)
    }

    /// Build the decompressor for the active section, loading its Huffman tables when needed
    #[instrument(skip(self), err)]
    pub fn decompressor(&mut self) -> Result<Decompressor> {
        let section = self.active_section().clone();

        match section.text.compression {
            CompressionMethod::None => Ok(Decompressor::Uncompressed),
            CompressionMethod::PalmDoc => Ok(Decompressor::PalmDoc),
            CompressionMethod::HuffCdic => {
                let table = self.load_huffman_table(&section)?;
                Ok(Decompressor::HuffCdic(Arc::new(table)))
            }
        }
    }

    fn load_huffman_table(&mut self, section: &BookSection) -> Result<HuffmanTable> {
        let records = section
            .huffman_records()
            .ok_or(Error::MalformedHuffmanTable {
                record: section.header_record,
                source: TableError::NoFormatHeader,
            })?;

        if records.is_empty() || records.end > self.container.len() {
            return Err(Error::MalformedHuffmanTable {
                record: section.header_record,
                source: TableError::MissingRecords {
                    offset: records.start,
                    count: records.len(),
                    available: self.container.len(),
                },
            });
        }

        let huff = self.record(records.start)?;
        let mut table = HuffmanTable::load_huff(&huff)
            .map_err(|source| Error::MalformedHuffmanTable {
                record: records.start,
                source,
            })?
            .with_max_depth(self.options.max_dictionary_depth);

        for index in records.start + 1..records.end {
            let cdic = self.record(index)?;
            table
                .load_cdic(&cdic)
                .map_err(|source| Error::MalformedHuffmanTable {
                    record: index,
                    source,
                })?;
        }

        debug!(phrases = table.phrases(), "loaded huffman table");
        Ok(table)
    }

    /// Decompress and join every text record of the active section
    ///
    /// Any record failing to decode fails the whole call.
    #[instrument(skip(self), err)]
    pub fn raw_ml(&mut self) -> Result<Vec<u8>> {
        let section = self.active_section().clone();
        let decompressor = self.decompressor()?;
        let trailing = section.trailing_entries();

        let mut raw_ml = Vec::with_capacity(section.text.text_length as usize);
        for index in section.text_records() {
            let record = self.record(index)?;
            let text = trailing
                .trim(&record)
                .and_then(|trimmed| decompressor.unpack(trimmed))
                .map_err(|source| Error::Decode {
                    record: index,
                    source,
                })?;

            trace!(record = index, size = record.len(), text = text.len(), "decoded record");
            raw_ml.extend_from_slice(&text);
        }

        Ok(raw_ml)
    }
}
