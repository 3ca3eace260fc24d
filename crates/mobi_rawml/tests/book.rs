use std::io::Cursor;
use std::path::Path;

use mobi_rawml::{
    error::{ContainerError, DecodeError, Error, Result},
    metadata::TextEncoding,
    CompressionMethod, MobiBook, ReaderOptions, SectionChoice,
};
use pretty_assertions::assert_eq;
use tracing_test::traced_test;

fn open(name: &str) -> Result<MobiBook<Cursor<Vec<u8>>>> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("resources")
        .join(name);
    MobiBook::new(Cursor::new(std::fs::read(path)?))
}

fn database(records: &[Vec<u8>]) -> Vec<u8> {
    let mut data = vec![0u8; 78];
    data[..8].copy_from_slice(b"Scenario");
    data[0x3C..0x44].copy_from_slice(b"BOOKMOBI");
    data[0x4C..0x4E].copy_from_slice(&(records.len() as u16).to_be_bytes());

    let mut offset = 78 + 8 * records.len() + 2;
    for (i, record) in records.iter().enumerate() {
        data.extend_from_slice(&(offset as u32).to_be_bytes());
        data.extend_from_slice(&[0, 0, 0, i as u8]);
        offset += record.len();
    }
    data.extend_from_slice(&[0, 0]);
    for record in records {
        data.extend_from_slice(record);
    }
    data
}

/// A header record with a MOBI header declaring `extra_flags`
fn header(compression: u16, count: u16, extra_flags: u16, huffman: (u32, u32)) -> Vec<u8> {
    let mut data = vec![0u8; 0xF8];
    data[0..2].copy_from_slice(&compression.to_be_bytes());
    data[8..10].copy_from_slice(&count.to_be_bytes());
    data[10..12].copy_from_slice(&4096u16.to_be_bytes());
    data[0x10..0x14].copy_from_slice(b"MOBI");
    data[0x14..0x18].copy_from_slice(&0xE8u32.to_be_bytes());
    data[0x1C..0x20].copy_from_slice(&1252u32.to_be_bytes());
    data[0x68..0x6C].copy_from_slice(&6u32.to_be_bytes());
    data[0x70..0x74].copy_from_slice(&huffman.0.to_be_bytes());
    data[0x74..0x78].copy_from_slice(&huffman.1.to_be_bytes());
    data[0xF2..0xF4].copy_from_slice(&extra_flags.to_be_bytes());
    data
}

/// A HUFF record of 8 bit codes, code `c` selecting phrase `255 - c`
fn huff() -> Vec<u8> {
    let mut huff = b"HUFF\x00\x00\x00\x18".to_vec();
    huff.extend_from_slice(&24u32.to_be_bytes());
    huff.extend_from_slice(&1048u32.to_be_bytes());
    huff.extend_from_slice(&[0u8; 8]);
    for _ in 0..256 {
        huff.extend_from_slice(&0xFF88u32.to_be_bytes());
    }
    huff.extend_from_slice(&[0u8; 256]);
    huff
}

fn cdic(phrases: &[(&[u8], bool)]) -> Vec<u8> {
    let mut cdic = b"CDIC\x00\x00\x00\x10".to_vec();
    cdic.extend_from_slice(&(phrases.len() as u32).to_be_bytes());
    cdic.extend_from_slice(&8u32.to_be_bytes());

    let mut body = Vec::new();
    for (data, terminal) in phrases {
        cdic.extend_from_slice(&((phrases.len() * 2 + body.len()) as u16).to_be_bytes());
        let length = data.len() as u16 | if *terminal { 0x8000 } else { 0 };
        body.extend_from_slice(&length.to_be_bytes());
        body.extend_from_slice(data);
    }
    cdic.extend_from_slice(&body);
    cdic
}

#[traced_test]
#[test]
fn uncompressed_records_are_concatenated() -> Result<()> {
    let text = [b"<html><body>".to_vec(), b"<p>one</p>".to_vec(), b"</body></html>".to_vec()];
    let input = database(&[
        header(1, 3, 0, (0, 0)),
        text[0].clone(),
        text[1].clone(),
        text[2].clone(),
    ]);

    let mut book = MobiBook::new(Cursor::new(input))?;
    assert_eq!(book.raw_ml()?, text.concat());
    Ok(())
}

#[test]
fn palmdoc_literal_run_then_space() -> Result<()> {
    let input = database(&[
        header(2, 1, 0, (0, 0)),
        vec![0x05, b'H', b'e', b'l', b'l', b'o', 0x20],
    ]);

    assert_eq!(mobi_rawml::raw_ml(&input)?, b"Hello ".to_vec());
    Ok(())
}

#[test]
fn single_byte_trailing_entry_is_removed() -> Result<()> {
    let input = database(&[
        header(2, 1, 0b10, (0, 0)),
        vec![0x05, b'H', b'e', b'l', b'l', b'o', 0x20, 0x7F, 0x7F, 0x83],
    ]);

    assert_eq!(mobi_rawml::raw_ml(&input)?, b"Hello ".to_vec());
    Ok(())
}

#[traced_test]
#[test]
fn boundary_starts_second_book() -> Result<()> {
    let input = database(&[
        header(1, 2, 0, (0, 0)),
        b"<legacy>".to_vec(),
        b"</legacy>".to_vec(),
        b"images".to_vec(),
        b"more image data".to_vec(),
        b"BOUNDARY".to_vec(),
        header(1, 1, 0, (0, 0)),
        b"<kf8/>".to_vec(),
        b"\xe9\x8e\r\n".to_vec(),
    ]);

    let mut book = MobiBook::new(Cursor::new(input))?;
    assert!(book.is_combo());
    assert_eq!(book.active_section().header_record, 6);
    assert_eq!(book.active_section().text_records(), 7..8);
    assert_eq!(book.raw_ml()?, b"<kf8/>".to_vec());
    Ok(())
}

#[test]
fn truncated_second_header_names_its_record() {
    let input = database(&[
        header(1, 1, 0, (0, 0)),
        b"a".to_vec(),
        b"BOUNDARY".to_vec(),
        b"zz".to_vec(),
    ]);

    assert!(matches!(
        MobiBook::new(Cursor::new(input)),
        Err(Error::MalformedContainer(ContainerError::TruncatedHeader {
            record: 3,
            len: 2
        }))
    ));
}

#[test]
fn boundary_before_text_count_is_ignored() -> Result<()> {
    // The scan starts at the first book's text record count
    let input = database(&[
        header(1, 3, 0, (0, 0)),
        b"BOUNDARY".to_vec(),
        b"text".to_vec(),
        b"more".to_vec(),
    ]);

    let mut book = MobiBook::new(Cursor::new(input))?;
    assert!(!book.is_combo());
    assert_eq!(book.raw_ml()?, b"BOUNDARYtextmore".to_vec());
    Ok(())
}

#[test]
fn self_referencing_phrase_is_rejected() -> Result<()> {
    let input = database(&[
        header(17480, 1, 0, (2, 2)),
        vec![0xFE, 0xFF],
        huff(),
        cdic(&[(&[0xFF], false), (b"ok", true)]),
    ]);

    let mut book = MobiBook::new(Cursor::new(input))?;
    assert!(matches!(
        book.raw_ml(),
        Err(Error::Decode {
            record: 1,
            source: DecodeError::CorruptDictionary { symbol: 0, depth: 16 }
        })
    ));
    Ok(())
}

#[test]
fn dictionary_depth_is_configurable() -> Result<()> {
    // phrase 0 expands to phrase 1, which expands to "deep"
    let input = database(&[
        header(17480, 1, 0, (2, 2)),
        vec![0xFF],
        huff(),
        cdic(&[(&[0xFE], false), (&[0xFD], false), (b"deep", true)]),
    ]);

    let mut book = MobiBook::new(Cursor::new(input.clone()))?;
    assert_eq!(book.raw_ml()?, b"deep".to_vec());

    let options = ReaderOptions::builder().max_dictionary_depth(1).build();
    let mut shallow = MobiBook::with_options(Cursor::new(input), options)?;
    assert!(matches!(
        shallow.raw_ml(),
        Err(Error::Decode {
            record: 1,
            source: DecodeError::CorruptDictionary { symbol: 1, depth: 1 }
        })
    ));
    Ok(())
}

#[test]
fn non_monotonic_offsets_are_malformed() {
    let mut input = database(&[header(1, 2, 0, (0, 0)), b"ab".to_vec(), b"cd".to_vec()]);
    // point record 2 at the start of record 1
    let first = input[86..90].to_vec();
    input[94..98].copy_from_slice(&first);

    assert!(matches!(
        MobiBook::new(Cursor::new(input)),
        Err(Error::MalformedContainer(ContainerError::NotMonotonic {
            record: 2,
            ..
        }))
    ));
}

#[test]
fn truncated_file_is_malformed() {
    let input = database(&[header(1, 1, 0, (0, 0)), b"text".to_vec()]);

    assert!(matches!(
        MobiBook::new(Cursor::new(&input[..100])),
        Err(Error::MalformedContainer(ContainerError::PastEnd { record: 1, .. }))
    ));
}

#[traced_test]
#[test]
fn mobi_metadata() -> Result<()> {
    let mut book = open("palmdoc.mobi")?;
    assert_eq!(book.compression(), CompressionMethod::PalmDoc);

    let metadata = book.metadata()?;
    assert_eq!(metadata.database_name, "The_Test_Book");
    assert_eq!(metadata.title, "The Test Book");
    assert_eq!(metadata.authors, vec!["Jane Doe", "John Roe"]);
    assert_eq!(metadata.publisher.as_deref(), Some("Test Press"));
    assert_eq!(metadata.description.as_deref(), Some("A book about cafés"));
    assert_eq!(metadata.asin.as_deref(), Some("B00TEST123"));
    assert_eq!(metadata.unique_id, 0x1234);
    assert_eq!(metadata.locale, 9);
    assert_eq!(metadata.text_encoding, TextEncoding::Utf8);
    assert_eq!(metadata.records.len(), 5);
    Ok(())
}

#[test]
fn combo_metadata_per_section() -> Result<()> {
    let mut book = open("combo.azw3")?;
    assert_eq!(book.sections().len(), 2);
    assert_eq!(book.compression(), CompressionMethod::HuffCdic);

    let metadata = book.metadata()?;
    assert_eq!(metadata.title, "Combo Book (KF8)");
    assert_eq!(metadata.asin.as_deref(), Some("B00COMBO01"));
    assert_eq!(metadata.authors, vec!["Jane Doe"]);

    let data = book.into_inner().into_inner();
    let options = ReaderOptions::builder()
        .section(SectionChoice::First)
        .build();
    let mut legacy = MobiBook::with_options(Cursor::new(data), options)?;
    assert_eq!(legacy.compression(), CompressionMethod::PalmDoc);

    let metadata = legacy.metadata()?;
    assert_eq!(metadata.title, "Combo Book");
    assert_eq!(metadata.asin, None);
    Ok(())
}

#[test]
fn plain_palmdoc_metadata() -> Result<()> {
    let mut book = open("plain.pdb")?;
    assert_eq!(book.active_section().format, None);

    let metadata = book.metadata()?;
    assert_eq!(metadata.title, "Plain Text");
    assert!(metadata.authors.is_empty());
    assert_eq!(metadata.text_encoding, TextEncoding::Windows1252);
    Ok(())
}
