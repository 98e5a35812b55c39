#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
//! Integration tests for containers assembled page by page
//!
//! These build files through the low-level writer so the stream table can
//! hold entries the container API never produces.

use msf_container::directory::NIL_STREAM_SIZE;
use msf_container::header::HEADER_SIZE;
use msf_container::{
    InvalidContainer, MsfConfig, MsfError, MsfFile, PAGE_SIZE, PageWriter, StreamTable,
    WriteSummary, commit,
};
use pretty_assertions::assert_eq;
use std::io::Cursor;

/// Write a container whose stream table is exactly `table`
fn assemble(data_pages: &[&[u8]], table: &StreamTable) -> Vec<u8> {
    let mut writer = PageWriter::new(Cursor::new(Vec::new()));
    writer.write_preamble().unwrap();
    for data in data_pages {
        writer.write_page(data).unwrap();
    }

    let table = table.build();
    let stream_table_size = table.len() as u32;
    let stream_table_pages = writer.write_bytes(table).unwrap();
    let list: Vec<u8> = stream_table_pages
        .iter()
        .flat_map(|p| p.to_le_bytes())
        .collect();
    let root_pages = writer.write_bytes(list).unwrap();

    let summary = WriteSummary {
        page_size: writer.page_size(),
        page_count: writer.page_count(),
        stream_table_size,
        stream_table_pages,
        root_pages,
    };
    commit(writer.get_mut(), &summary, &MsfConfig::default()).unwrap();
    writer.into_inner().into_inner()
}

fn open_err(data: Vec<u8>) -> InvalidContainer {
    match MsfFile::open(Cursor::new(data)) {
        Err(MsfError::InvalidContainer(kind)) => kind,
        Err(other) => panic!("Expected a container error, got {other}"),
        Ok(_) => panic!("Expected the container to be rejected"),
    }
}

#[test]
fn nil_stream_reads_as_hole() {
    let table = StreamTable::new(vec![3, NIL_STREAM_SIZE, 2], vec![vec![4], vec![], vec![5]]);
    let data = assemble(&[b"abc", b"yz"], &table);

    let mut msf = MsfFile::open(Cursor::new(data)).unwrap();
    assert_eq!(msf.stream_count(), 3);
    assert!(msf.stream(1).is_none());
    assert_eq!(msf.read_stream(0).unwrap(), Some(b"abc".to_vec()));
    assert_eq!(msf.read_stream(1).unwrap(), None);
    assert_eq!(msf.read_stream(2).unwrap(), Some(b"yz".to_vec()));
}

#[test]
fn streams_may_share_and_reorder_pages() {
    // Second stream reads the same page as the first, third runs backwards
    let table = StreamTable::new(
        vec![4, 2, PAGE_SIZE + 1],
        vec![vec![5], vec![5], vec![6, 4]],
    );
    let data = assemble(&[b"Z", b"shared", &[7u8; 16]], &table);

    let mut msf = MsfFile::open(Cursor::new(data)).unwrap();
    assert_eq!(msf.read_stream(0).unwrap().unwrap(), b"shar");
    assert_eq!(msf.read_stream(1).unwrap().unwrap(), b"sh");

    let third = msf.read_stream(2).unwrap().unwrap();
    assert_eq!(third.len(), PAGE_SIZE as usize + 1);
    assert_eq!(&third[..16], &[7u8; 16]);
    assert_eq!(third[PAGE_SIZE as usize], b'Z');
}

#[test]
fn stream_page_out_of_range_is_rejected() {
    let table = StreamTable::new(vec![10], vec![vec![900]]);
    let data = assemble(&[], &table);

    match open_err(data.clone()) {
        InvalidContainer::PageOutOfRange { page, page_count } => {
            assert_eq!(page, 900);
            assert!(page_count < 900);
        }
        other => panic!("Unexpected error {other}"),
    }

    // Without bound checks the stream opens and fails on read
    let config = MsfConfig::new().with_page_bounds_check(false);
    let mut msf = MsfFile::open_with_config(Cursor::new(data), &config).unwrap();
    assert!(matches!(msf.read_stream(0), Err(MsfError::Io(_))));
}

#[test]
fn trailing_table_words_are_rejected() {
    // One page entry more than the size calls for
    let table = StreamTable::new(vec![1], vec![vec![4, 4]]);
    let data = assemble(&[b"q"], &table);

    assert_eq!(
        open_err(data),
        InvalidContainer::InvalidStreamCount { count: 1, words: 4 }
    );
}

#[test]
fn stream_table_page_past_end_of_file() {
    let table = StreamTable::new(vec![1], vec![vec![4]]);
    let mut data = assemble(&[b"q"], &table);

    // The root entry names the page holding the stream table's page list
    let list_page = u32::from_le_bytes(data[HEADER_SIZE..HEADER_SIZE + 4].try_into().unwrap());
    let at = (list_page * PAGE_SIZE) as usize;
    data[at..at + 4].copy_from_slice(&900u32.to_le_bytes());

    assert!(matches!(
        open_err(data.clone()),
        InvalidContainer::PageOutOfRange { page: 900, .. }
    ));

    let config = MsfConfig::new().with_page_bounds_check(false);
    let err = MsfFile::open_with_config(Cursor::new(data), &config).unwrap_err();
    assert_eq!(
        err.invalid_container(),
        Some(&InvalidContainer::TruncatedStreamTable)
    );
}

#[test]
fn missing_root_page_list() {
    // Header claims a stream table needing more root entries than page 0 has
    let mut data = vec![0u8; PAGE_SIZE as usize];
    data[..32].copy_from_slice(&msf_container::MSF_MAGIC);
    data[32..36].copy_from_slice(&PAGE_SIZE.to_le_bytes());
    data[36..40].copy_from_slice(&1u32.to_le_bytes());
    data[40..44].copy_from_slice(&1u32.to_le_bytes());
    data[44..48].copy_from_slice(&(2000 * PAGE_SIZE).to_le_bytes());

    assert_eq!(open_err(data), InvalidContainer::MissingRootPageList);
}

#[test]
fn stream_table_longer_than_file() {
    // Root entries fit in page 0, but the declared table is far larger than the file
    let pages = 18u32;
    let table_size: u32 = 64 * 1024 * 1024;
    let mut data = vec![0u8; (pages * PAGE_SIZE) as usize];
    data[..32].copy_from_slice(&msf_container::MSF_MAGIC);
    data[32..36].copy_from_slice(&PAGE_SIZE.to_le_bytes());
    data[36..40].copy_from_slice(&1u32.to_le_bytes());
    data[40..44].copy_from_slice(&pages.to_le_bytes());
    data[44..48].copy_from_slice(&table_size.to_le_bytes());

    assert_eq!(
        open_err(data.clone()),
        InvalidContainer::StreamTableTooLarge {
            size: table_size,
            file_size: u64::from(pages * PAGE_SIZE),
        }
    );

    // Rejected before any page is followed, with or without bound checks
    let config = MsfConfig::new().with_page_bounds_check(false);
    let err = MsfFile::open_with_config(Cursor::new(data), &config).unwrap_err();
    assert!(matches!(
        err.invalid_container(),
        Some(InvalidContainer::StreamTableTooLarge { .. })
    ));
}

#[test]
fn odd_stream_table_length() {
    let table = StreamTable::new(vec![1], vec![vec![4]]);
    let mut data = assemble(&[b"q"], &table);
    let size = u32::from_le_bytes(data[44..48].try_into().unwrap());
    data[44..48].copy_from_slice(&(size - 1).to_le_bytes());

    assert_eq!(open_err(data), InvalidContainer::InvalidStreamTableLength(11));
}
