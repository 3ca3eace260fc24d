//! Reading the PDB database header and record index

use binrw::BinRead;
use std::{
    io::{Read, Seek, SeekFrom},
    ops::Range,
};
use tracing::{debug, instrument};

use crate::{
    error::{ContainerError, Error, Result},
    types::{PdbHeader, RecordInfo, PDB_HEADER_SIZE, RECORD_INFO_SIZE},
};

/// The record index of a PDB database
///
/// Owns the location of every record in the file. Offsets are validated to be
/// strictly increasing when the index is read, so every record has a
/// non-negative length and the last record ends at the end of the file.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerHeader {
    header: PdbHeader,
    records: Vec<RecordInfo>,
    file_len: u64,
}

impl ContainerHeader {
    /// Read the database header and record index from the start of `reader`
    #[instrument(skip(reader), err)]
    pub fn read<R: Read + Seek>(reader: &mut R) -> Result<ContainerHeader> {
        let file_len = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;

        let header = PdbHeader::read(reader)
            .map_err(|error| truncation_or(error, ContainerError::MissingHeader))?;
        if header.records == 0 {
            return Err(ContainerError::Empty.into());
        }

        let records = (0..header.records)
            .map(|_| RecordInfo::read(reader))
            .collect::<core::result::Result<Vec<_>, _>>()
            .map_err(|error| {
                truncation_or(
                    error,
                    ContainerError::TruncatedIndex {
                        records: header.records as usize,
                    },
                )
            })?;

        Self::from_parts(header, records, file_len)
    }

    /// Build a record index from already parsed parts, validating the offsets
    pub fn from_parts(
        header: PdbHeader,
        records: Vec<RecordInfo>,
        file_len: u64,
    ) -> Result<ContainerHeader> {
        let Some(first) = records.first() else {
            return Err(ContainerError::Empty.into());
        };

        let index_end = PDB_HEADER_SIZE + RECORD_INFO_SIZE * records.len() as u64;
        if (first.offset as u64) < index_end {
            return Err(ContainerError::OverlapsIndex {
                offset: first.offset,
                index_end,
            }
            .into());
        }

        for (index, pair) in records.windows(2).enumerate() {
            if pair[1].offset <= pair[0].offset {
                return Err(ContainerError::NotMonotonic {
                    record: index + 1,
                    offset: pair[1].offset,
                    previous: pair[0].offset,
                }
                .into());
            }
        }

        let last = records.len() - 1;
        if records[last].offset as u64 > file_len {
            return Err(ContainerError::PastEnd {
                record: last,
                offset: records[last].offset,
                len: file_len,
            }
            .into());
        }

        debug!(records = records.len(), file_len, "read record index");

        Ok(ContainerHeader {
            header,
            records,
            file_len,
        })
    }

    /// The database header
    pub fn header(&self) -> &PdbHeader {
        &self.header
    }

    /// The index entries, in file order
    pub fn records(&self) -> &[RecordInfo] {
        &self.records
    }

    /// Number of records in the database
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the database holds no records, never true for a validated index
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Size of the file the index was read from
    pub fn file_len(&self) -> u64 {
        self.file_len
    }

    /// Size of the first header record
    pub fn format_header_size(&self) -> u64 {
        self.record_range(0).map(|r| r.end - r.start).unwrap_or(0)
    }

    /// Byte range of a record within the file
    pub fn record_range(&self, index: usize) -> core::result::Result<Range<u64>, ContainerError> {
        let start = self
            .records
            .get(index)
            .ok_or(ContainerError::MissingRecord(index))?
            .offset as u64;
        let end = self
            .records
            .get(index + 1)
            .map_or(self.file_len, |next| next.offset as u64);
        Ok(start..end)
    }

    /// Size of a record in bytes
    pub fn record_len(&self, index: usize) -> core::result::Result<u64, ContainerError> {
        self.record_range(index).map(|r| r.end - r.start)
    }

    /// Read the full contents of a record
    #[instrument(skip(self, reader), err)]
    pub fn read_record<R: Read + Seek>(&self, reader: &mut R, index: usize) -> Result<Vec<u8>> {
        let range = self.record_range(index)?;
        reader.seek(SeekFrom::Start(range.start))?;

        let mut buffer = vec![0u8; (range.end - range.start) as usize];
        reader.read_exact(&mut buffer)?;
        Ok(buffer)
    }
}

/// A read that ran out of data becomes `truncated`, any other failure is passed on
fn truncation_or(error: binrw::Error, truncated: ContainerError) -> Error {
    match error {
        error if error.is_eof() => truncated.into(),
        binrw::Error::Io(io) => Error::IOError(io),
        binrw::Error::Backtrace(backtrace) if matches!(*backtrace.error, binrw::Error::Io(_)) => {
            truncation_or(*backtrace.error, truncated)
        }
        other => other.into(),
    }
}
