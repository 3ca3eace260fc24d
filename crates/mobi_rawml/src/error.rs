//! Error types that can be emitted from this library

use miette::Diagnostic;
use thiserror::Error;

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent warpper for [`std::io::Error`]
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// Transparent warpper for [`binrw::Error`]
    #[error(transparent)]
    BinRWError(#[from] binrw::Error),

    /// the record index is missing, empty or not monotonic
    #[error("file is an invalid mobi container: {0}")]
    #[diagnostic(code(mobi::malformed_container))]
    MalformedContainer(#[from] ContainerError),

    /// the text stream uses a compression scheme this library can not read
    #[error("record {record} declares unsupported compression type {code}")]
    #[diagnostic(code(mobi::unsupported_compression))]
    UnsupportedCompression { record: usize, code: u16 },

    /// the text stream is encrypted
    #[error("record {record} declares encryption type {encryption}, encrypted books are not supported")]
    #[diagnostic(code(mobi::encrypted))]
    Encrypted { record: usize, encryption: u16 },

    /// a HUFF or CDIC record could not be loaded
    #[error("invalid huffman table in record {record}")]
    #[diagnostic(code(mobi::malformed_huffman_table))]
    MalformedHuffmanTable {
        record: usize,
        #[source]
        source: TableError,
    },

    /// a text record could not be trimmed or decompressed
    #[error("unable to decode text record {record}")]
    #[diagnostic(code(mobi::decode))]
    Decode {
        record: usize,
        #[source]
        source: DecodeError,
    },
}

/// Error type to provide further information when the record index is unusable
#[derive(Error, Diagnostic, Debug, PartialEq, Eq)]
pub enum ContainerError {
    /// the file ends before the database header
    #[error("file ends before the database header")]
    MissingHeader,

    /// the file ends inside of the record index
    #[error("file ends inside of the index for {records} records")]
    TruncatedIndex { records: usize },

    /// the database declares no records
    #[error("no records present")]
    Empty,

    /// the offset of record {record} does not follow the one before it
    #[error("record {record} starts at {offset:#x}, before the end of the previous record at {previous:#x}")]
    NotMonotonic {
        record: usize,
        offset: u32,
        previous: u32,
    },

    /// the first record starts inside of the header or record index
    #[error("record 0 starts at {offset:#x}, inside of the record index ending at {index_end:#x}")]
    OverlapsIndex { offset: u32, index_end: u64 },

    /// the last record starts past the end of the file
    #[error("record {record} starts at {offset:#x}, past the end of the file at {len:#x}")]
    PastEnd { record: usize, offset: u32, len: u64 },

    /// a section header record is too short to hold the text stream header
    #[error("header record {record} holds {len} bytes, too short for a text stream header")]
    TruncatedHeader { record: usize, len: usize },

    /// a record was requested that the index does not contain
    #[error("record {0} is outside of the record index")]
    MissingRecord(usize),

    /// a section header declares more text records than the file holds
    #[error("section at record {header} declares {count} text records but the file holds {available}")]
    TextRecordsOutOfRange {
        header: usize,
        count: usize,
        available: usize,
    },
}

/// Error type to provide further information when a HUFF or CDIC record is invalid
#[derive(Error, Diagnostic, Debug, PartialEq, Eq)]
pub enum TableError {
    /// record does not start with the expected tag
    #[error("expected magic {expected:?}")]
    BadMagic { expected: &'static [u8] },

    /// a table lies outside of the record
    #[error("table at {offset:#x} with {len} bytes lies outside of the {available} byte record")]
    OutOfBounds {
        offset: usize,
        len: usize,
        available: usize,
    },

    /// a dispatch table entry is not usable
    #[error("dispatch entry {index} declares code length {length} (terminal: {terminal})")]
    InvalidCodeLength {
        index: usize,
        length: u8,
        terminal: bool,
    },

    /// a dictionary declares an index width that can not be addressed
    #[error("dictionary declares {bits} index bits")]
    InvalidIndexBits { bits: u32 },

    /// the section declares no HUFF record, or more records than exist
    #[error("section declares {count} huffman records at {offset}, the file holds {available}")]
    MissingRecords {
        offset: usize,
        count: usize,
        available: usize,
    },

    /// the text stream header has no format header to locate the tables with
    #[error("no format header present to locate the huffman records")]
    NoFormatHeader,
}

/// Error type to provide further information when a single text record can not be decoded
#[derive(Error, Diagnostic, Debug, PartialEq, Eq)]
pub enum DecodeError {
    /// the record ends inside of a control sequence
    #[error("stream truncated at byte {offset}, {needed} more byte(s) required")]
    TruncatedStream { offset: usize, needed: usize },

    /// a back reference points before the start of the output
    #[error("back reference at byte {offset} reaches {distance} bytes back, only {available} decoded")]
    InvalidDistance {
        offset: usize,
        distance: usize,
        available: usize,
    },

    /// a dictionary phrase expands into itself, directly or through others
    #[error("dictionary phrase {symbol} exceeds the expansion depth of {depth}")]
    CorruptDictionary { symbol: usize, depth: usize },

    /// a code maps to a phrase the loaded dictionaries do not contain
    #[error("dictionary phrase {symbol} does not exist")]
    UnknownSymbol { symbol: usize },

    /// no code length in the table matches the bits at this position
    #[error("no code matches the bits at bit offset {offset}")]
    InvalidCode { offset: usize },
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
