//! MSF 7.00 header (superblock) parsing and building

use crate::error::{InvalidContainer, Result};
use crate::page::{is_valid_page_size, page_offset};
use binrw::io::Cursor;
use binrw::{BinRead, BinWrite};

/// Signature at the start of every MSF 7.00 container
pub const MSF_MAGIC: [u8; 32] = *b"Microsoft C/C++ MSF 7.00\r\n\x1aDS\0\0\0";

/// Size of the fixed header in bytes
///
/// The root page list (pages holding the stream table's page list) follows
/// immediately after.
pub const HEADER_SIZE: usize = 52;

/// Location of the stream table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, BinRead, BinWrite)]
#[brw(little)]
pub struct StreamTableInfo {
    /// Stream table length in bytes
    pub size: u32,

    /// Unused, written as zero
    pub reserved: u32,
}

/// MSF container header
///
/// Layout (little-endian):
/// ```text
/// offset 0x00: [u8; 32] magic
/// offset 0x20: u32      page_size
/// offset 0x24: u32      free_page_map   (active FPM copy, 1 or 2)
/// offset 0x28: u32      page_count
/// offset 0x2C: u32      stream_table.size
/// offset 0x30: u32      stream_table.reserved
/// offset 0x34: [u32]    root page list
/// ```
#[derive(Debug, Clone, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little)]
pub struct MsfHeader {
    /// Signature, always [`MSF_MAGIC`]
    pub magic: [u8; 32],

    /// Page size in bytes
    pub page_size: u32,

    /// Page number of the active free page map copy
    pub free_page_map: u32,

    /// Total number of pages in the file
    pub page_count: u32,

    /// Stream table location
    pub stream_table: StreamTableInfo,
}

impl MsfHeader {
    /// Create a header for a freshly written container
    pub fn new(page_size: u32, free_page_map: u32, page_count: u32, stream_table_size: u32) -> Self {
        Self {
            magic: MSF_MAGIC,
            page_size,
            free_page_map,
            page_count,
            stream_table: StreamTableInfo {
                size: stream_table_size,
                reserved: 0,
            },
        }
    }

    /// Parse a header from the first [`HEADER_SIZE`] bytes of `data`
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(InvalidContainer::MissingHeader.into());
        }
        let mut cursor = Cursor::new(&data[..HEADER_SIZE]);
        Ok(Self::read(&mut cursor)?)
    }

    /// Serialize the header to exactly [`HEADER_SIZE`] bytes
    pub fn build(&self) -> Result<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::with_capacity(HEADER_SIZE));
        self.write(&mut cursor)?;
        Ok(cursor.into_inner())
    }

    /// Check the signature and the page size
    pub fn validate(&self) -> Result<()> {
        if self.magic != MSF_MAGIC {
            return Err(InvalidContainer::BadMagic.into());
        }
        if !is_valid_page_size(self.page_size) {
            return Err(InvalidContainer::InvalidPageSize(self.page_size).into());
        }
        Ok(())
    }

    /// File length implied by the page size and page count
    pub fn expected_file_size(&self) -> u64 {
        page_offset(self.page_count, self.page_size)
    }

    /// Number of root page list entries that fit in the header page
    pub fn root_capacity(page_size: u32) -> usize {
        (page_size as usize).saturating_sub(HEADER_SIZE) / 4
    }
}
