//! This library reads **MOBI** and **PalmDOC** e-books and reassembles their raw markup.
//!
//! # MOBI File Format Documentation
//!
//! A MOBI file is a PalmOS database (PDB): a header and record index, followed by the records
//! themselves. The first record holds the book headers, the following records hold the compressed
//! text. The raw markup (RawML) of a book is the concatenation of every decompressed text record.
//!
//! ## File Structure
//!
//! | Offset (bytes) | Field                  | Description                                                |
//! |----------------|------------------------|------------------------------------------------------------|
//! | 0x0000         | Name                   | 32 bytes: NUL padded database name                         |
//! | 0x003C         | Type                   | 4 bytes: `BOOK` for MOBI, `TEXt` for PalmDOC               |
//! | 0x0040         | Creator                | 4 bytes: `MOBI` for MOBI, `REAd` for PalmDOC               |
//! | 0x004C         | Record Count           | 2 bytes: Number of records in the database                 |
//! | 0x004E         | Record Index           | 8 bytes per record: offset, attributes and id              |
//!
//! ### Record Index
//!
//! Each entry of the record index has the following structure:
//!
//! | Offset (bytes) | Field                  | Description                                             |
//! |----------------|------------------------|---------------------------------------------------------|
//! | 0x0000         | Data Offset            | 4 bytes: Offset from the start of the file to the data  |
//! | 0x0004         | Attributes             | 1 byte: Record attribute flags                          |
//! | 0x0005         | Unique Id              | 3 bytes: Id of the record                               |
//!
//! Records are stored back to back, a record ends where the next one starts and the last record
//! ends at the end of the file.
//!
//! ### Header Record
//!
//! The header record of a book starts with the PalmDOC header:
//!
//! | Offset (bytes) | Field                  | Description                                             |
//! |----------------|------------------------|---------------------------------------------------------|
//! | 0x0000         | Compression            | 2 bytes: 1 none, 2 PalmDOC, 17480 Huffman/CDIC          |
//! | 0x0004         | Text Length            | 4 bytes: Size of the uncompressed text                  |
//! | 0x0008         | Record Count           | 2 bytes: Number of text records                         |
//! | 0x000A         | Record Size            | 2 bytes: Maximum uncompressed size of a text record     |
//! | 0x000C         | Encryption             | 2 bytes: 0 when not encrypted                           |
//!
//! MOBI books continue with the MOBI header, identified by the magic `MOBI` at 0x10. Among
//! others it holds the text encoding, the location of the Huffman tables (0x70), the EXTH flags
//! (0x80) and the extra data flags (0xF2) describing data trailing every text record.
//!
//! ### Text Records
//!
//! The text records directly follow the header record. Each one holds up to 4096 bytes of text
//! compressed with the scheme named in the PalmDOC header, see [`compression`] and [`huffcdic`],
//! followed by the trailing entries declared in the MOBI header, see [`trailing`].
//!
//! ### Combo Books
//!
//! Files produced for both old and new readers hold two books. The legacy book comes first, a
//! record starting with `BOUNDARY` follows its records, then the header record and text records
//! of the KF8 book. [`MobiBook`] reads the KF8 book unless told otherwise via [`ReaderOptions`].
//!
//! ## Additional Information
//!
//! - **File Extension**: `.mobi`, `.azw`, `.azw3`, `.prc`, `.pdb`
//! - **Endianness**: Big-endian for all multi-byte integers
//!

pub mod compression;
pub mod container;
pub mod error;
pub mod huffcdic;
pub mod metadata;
pub mod read;
pub mod section;
pub mod trailing;
pub mod types;

pub use compression::{CompressionMethod, Decompressor};
pub use metadata::Metadata;
pub use read::{MobiBook, ReaderOptions, SectionChoice};

/// Reassemble the raw markup of a book held in memory
///
/// ```no_run
/// let data = std::fs::read("book.azw3")?;
/// let markup = mobi_rawml::raw_ml(&data)?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn raw_ml(data: &[u8]) -> error::Result<Vec<u8>> {
    MobiBook::new(std::io::Cursor::new(data))?.raw_ml()
}
