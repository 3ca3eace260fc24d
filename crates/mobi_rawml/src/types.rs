//! Base types for the fixed structures of a MOBI file.

use binrw::BinRead;

/// Size in bytes of [`PdbHeader`] on disk
pub const PDB_HEADER_SIZE: u64 = 78;

/// Size in bytes of a single [`RecordInfo`] on disk
pub const RECORD_INFO_SIZE: u64 = 8;

/// Size in bytes of [`PalmDocHeader`] on disk
pub const PALMDOC_HEADER_SIZE: usize = 16;

/// PDB database header
///
/// Every MOBI file starts with this header, the record count at the end is followed
/// directly by the record index. All data is stored in big endian format
#[derive(BinRead, Debug, Default, Copy, Clone, PartialEq)]
#[br(big)]
pub struct PdbHeader {
    /// The database name, padded with NUL bytes
    pub name: [u8; 32],

    /// Database attribute flags
    pub attributes: u16,

    /// The version of the database layout
    pub version: u16,

    /// Creation date, seconds since the PalmOS or unix epoch
    pub created: u32,

    /// Modification date
    pub modified: u32,

    /// Date of the last backup
    pub backed_up: u32,

    /// Modification number
    pub modification_number: u32,

    /// Offset to the application info block, unused by books
    pub app_info: u32,

    /// Offset to the sort info block, unused by books
    pub sort_info: u32,

    /// Database type, `BOOK` for MOBI and `TEXt` for PalmDOC
    pub kind: [u8; 4],

    /// Database creator, `MOBI` for MOBI and `REAd` for PalmDOC
    pub creator: [u8; 4],

    /// Seed used to generate record ids
    pub unique_id_seed: u32,

    /// Offset to the next record list, always zero
    pub next_record_list: u32,

    /// The number of records stored in the file
    pub records: u16,
}

impl PdbHeader {
    /// The database name up to the first NUL byte
    pub fn name(&self) -> &[u8] {
        let end = self
            .name
            .iter()
            .position(|b| *b == 0)
            .unwrap_or(self.name.len());
        &self.name[..end]
    }
}

/// PDB record index entry
///
/// Describes where a record starts, records are stored back to back so the
/// end of one record is the start of the next.
#[derive(BinRead, Debug, Default, Copy, Clone, PartialEq)]
#[br(big)]
pub struct RecordInfo {
    /// The offset from the start of the file to the data of this record
    pub offset: u32,

    /// Record attribute flags
    pub attributes: u8,

    /// The 24 bit id of this record
    #[br(map = |id: [u8; 3]| u32::from_be_bytes([0, id[0], id[1], id[2]]))]
    pub unique_id: u32,
}

/// PalmDOC header found at the start of a section's header record
#[derive(BinRead, Debug, Default, Copy, Clone, PartialEq)]
#[br(big)]
pub struct PalmDocHeader {
    /// Raw compression code, see [`crate::compression::CompressionMethod`]
    pub compression: u16,

    /// Length of the uncompressed text
    #[br(pad_before = 2)]
    pub text_length: u32,

    /// The number of text records following the header record
    pub text_records: u16,

    /// Maximum uncompressed size of a text record, usually 4096
    pub text_record_size: u16,

    /// Encryption type, anything other than zero is encrypted
    #[br(pad_after = 2)]
    pub encryption: u16,
}

/// EXTH metadata block following the MOBI header
#[derive(BinRead, Debug, Default, Clone, PartialEq, Eq)]
#[br(big, magic = b"EXTH")]
pub struct ExthHeader {
    /// Length of the block, including the magic
    pub length: u32,

    /// The number of records in the block
    pub count: u32,

    /// The metadata records
    #[br(count = count as usize)]
    pub records: Vec<ExthRecord>,
}

/// A single EXTH metadata entry
#[derive(BinRead, Debug, Default, Clone, PartialEq, Eq)]
#[br(big)]
pub struct ExthRecord {
    /// Identifies what the data describes, e.g. 100 for an author
    pub kind: u32,

    /// Length of the record, including the kind and length fields
    pub length: u32,

    /// The record payload
    #[br(count = length.saturating_sub(8) as usize)]
    pub data: Vec<u8>,
}
