//! Container writer
//!
//! Writing happens in two passes:
//!
//! 1. [`PageWriter::write_streams`] lays down four blank preamble pages,
//!    then every stream's pages in index order, then the stream table and
//!    finally the page list of the stream table. Pages are only ever
//!    appended and free page map slots are filled with blank pages.
//! 2. [`commit`] overwrites the preamble with the real header, the root
//!    page list and the free page map bitmap once the final page count is
//!    known.
//!
//! Until the commit pass completes the output is not a valid container.

use crate::allocator::PageAllocator;
use crate::config::MsfConfig;
use crate::directory::StreamTable;
use crate::error::{MsfError, Result};
use crate::fpm::FreePageMap;
use crate::header::{HEADER_SIZE, MsfHeader};
use crate::page::{HEADER_PAGE, PAGE_SIZE, PREAMBLE_PAGES, page_offset};
use crate::stream::{FlatStream, PageStream};
use std::io::{self, ErrorKind, Read, Seek, SeekFrom, Write};
use tracing::debug;

/// Layout produced by the write pass, consumed by [`commit`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSummary {
    /// Page size of the written file
    pub page_size: u32,

    /// Total pages written, including the preamble and FPM pages
    pub page_count: u32,

    /// Stream table length in bytes
    pub stream_table_size: u32,

    /// Pages holding the stream table
    pub stream_table_pages: Vec<u32>,

    /// Pages holding the list of `stream_table_pages`
    pub root_pages: Vec<u32>,
}

/// Emits whole pages to a seekable output
#[derive(Debug)]
pub struct PageWriter<W> {
    out: W,
    allocator: PageAllocator,
    position: Option<u64>,
}

impl<W: Write + Seek> PageWriter<W> {
    /// Writer using the standard page size, allocating after the preamble
    pub fn new(out: W) -> Self {
        Self::with_allocator(out, PageAllocator::new(PAGE_SIZE))
    }

    /// Writer that takes page numbers from `allocator`
    pub fn with_allocator(out: W, allocator: PageAllocator) -> Self {
        Self {
            out,
            allocator,
            position: None,
        }
    }

    /// Page size in bytes
    pub fn page_size(&self) -> u32 {
        self.allocator.page_size()
    }

    /// Number of pages emitted so far (the next page ordinal)
    pub fn page_count(&self) -> u32 {
        self.allocator.next_page()
    }

    /// Access the output
    pub fn get_mut(&mut self) -> &mut W {
        // Callers may move the cursor
        self.position = None;
        &mut self.out
    }

    /// Give back the output
    pub fn into_inner(self) -> W {
        self.out
    }

    /// Write the blank header, FPM and spare pages
    pub fn write_preamble(&mut self) -> Result<()> {
        for page in 0..PREAMBLE_PAGES {
            self.emit(page, &[])?;
        }
        Ok(())
    }

    /// Write one page of data, zero-padded to the page size
    ///
    /// Returns the page ordinal the data landed on. If the cursor sits on
    /// a free page map slot, the reserved pair is written blank first.
    pub fn write_page(&mut self, data: &[u8]) -> Result<u32> {
        if data.len() > self.page_size() as usize {
            return Err(io::Error::new(
                ErrorKind::InvalidInput,
                format!("{} bytes do not fit a {} byte page", data.len(), self.page_size()),
            )
            .into());
        }

        let slot = self.allocator.allocate();
        for reserved in slot.reserved {
            self.emit(reserved, &[])?;
        }
        self.emit(slot.page, data)?;
        Ok(slot.page)
    }

    /// Write a whole stream from its start, returning its page list
    ///
    /// Empty streams write nothing. A stream that yields fewer bytes than
    /// its declared length fails with `UnexpectedEof`.
    pub fn write_stream<S: PageStream + ?Sized>(&mut self, stream: &mut S) -> Result<Vec<u32>> {
        let len = stream.len();
        if len == 0 {
            return Ok(Vec::new());
        }

        let page_size = self.page_size() as usize;
        let mut buf = vec![0u8; page_size];
        let mut pages = Vec::new();
        let mut remaining = len;

        stream.set_pos(0);
        while remaining > 0 {
            let want = remaining.min(page_size as u64) as usize;
            let got = fill(stream, &mut buf[..want])?;
            if got < want {
                return Err(io::Error::new(
                    ErrorKind::UnexpectedEof,
                    format!(
                        "stream ended after {} of {} declared bytes",
                        len - remaining + got as u64,
                        len
                    ),
                )
                .into());
            }
            pages.push(self.write_page(&buf[..want])?);
            remaining -= want as u64;
        }
        Ok(pages)
    }

    /// Write an in-memory buffer as a stream, returning its page list
    pub fn write_bytes(&mut self, data: Vec<u8>) -> Result<Vec<u32>> {
        self.write_stream(&mut FlatStream::new(data))
    }

    /// Run the write pass for a container's streams
    ///
    /// `None` entries are holes: they keep their index and are recorded
    /// with size 0, like empty streams.
    pub fn write_streams<S: PageStream>(
        &mut self,
        streams: &mut [Option<S>],
    ) -> Result<WriteSummary> {
        self.write_preamble()?;

        let mut sizes = Vec::with_capacity(streams.len());
        for (index, stream) in streams.iter().enumerate() {
            let len = stream.as_ref().map_or(0, PageStream::len);
            let size = u32::try_from(len).map_err(|_| MsfError::StreamTooLarge { index, len })?;
            sizes.push(size);
        }

        let mut page_lists = Vec::with_capacity(streams.len());
        for stream in streams.iter_mut() {
            let pages = match stream {
                Some(s) => self.write_stream(s)?,
                None => Vec::new(),
            };
            page_lists.push(pages);
        }

        let table = StreamTable::new(sizes, page_lists).build();
        let stream_table_size =
            u32::try_from(table.len()).map_err(|_| MsfError::StreamTooLarge {
                index: streams.len(),
                len: table.len() as u64,
            })?;
        let stream_table_pages = self.write_bytes(table)?;

        let page_list: Vec<u8> = stream_table_pages
            .iter()
            .flat_map(|p| p.to_le_bytes())
            .collect();
        let root_pages = self.write_bytes(page_list)?;

        self.out.flush()?;

        let summary = WriteSummary {
            page_size: self.page_size(),
            page_count: self.page_count(),
            stream_table_size,
            stream_table_pages,
            root_pages,
        };
        debug!(
            "Wrote {} streams in {} pages, stream table {} bytes",
            streams.len(),
            summary.page_count,
            summary.stream_table_size
        );
        Ok(summary)
    }

    fn emit(&mut self, page: u32, data: &[u8]) -> Result<()> {
        let page_size = self.page_size();
        let offset = page_offset(page, page_size);
        if self.position != Some(offset) {
            self.out.seek(SeekFrom::Start(offset))?;
        }

        self.out.write_all(data)?;
        let padding = u64::from(page_size) - data.len() as u64;
        io::copy(&mut io::repeat(0).take(padding), &mut self.out)?;

        self.position = Some(offset + u64::from(page_size));
        Ok(())
    }
}

/// Read into `buf` until it is full or the stream ends
fn fill<S: PageStream + ?Sized>(stream: &mut S, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = stream.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

/// Finalize a container after the write pass
///
/// Writes the header and root page list into page 0 and the free page map
/// bitmap into the FPM pages of every interval.
pub fn commit<W: Write + Seek>(
    out: &mut W,
    summary: &WriteSummary,
    config: &MsfConfig,
) -> Result<()> {
    config.validate()?;

    let page_size = summary.page_size;
    let capacity = MsfHeader::root_capacity(page_size);
    if summary.root_pages.len() > capacity {
        return Err(MsfError::DirectoryTooLarge {
            pages: summary.root_pages.len(),
            capacity,
        });
    }

    let header = MsfHeader::new(
        page_size,
        config.active_fpm_block,
        summary.page_count,
        summary.stream_table_size,
    );
    let mut first_page = header.build()?;
    debug_assert_eq!(first_page.len(), HEADER_SIZE);
    for page in &summary.root_pages {
        first_page.extend_from_slice(&page.to_le_bytes());
    }
    first_page.resize(page_size as usize, 0);

    out.seek(SeekFrom::Start(page_offset(HEADER_PAGE, page_size)))?;
    out.write_all(&first_page)?;

    let map = FreePageMap::for_written_container(summary.page_count);
    let mut blocks = vec![config.active_fpm_block];
    if config.mirror_free_page_map {
        blocks.push(config.inactive_fpm_block());
    }
    for block in blocks {
        let pages = FreePageMap::fpm_pages(summary.page_count, page_size, block);
        for (interval, page) in pages.enumerate() {
            out.seek(SeekFrom::Start(page_offset(page, page_size)))?;
            out.write_all(&map.interval_page(interval as u32, page_size))?;
        }
    }
    out.flush()?;

    debug!(
        "Committed header: {} pages, {} root pages, FPM block {}",
        summary.page_count,
        summary.root_pages.len(),
        config.active_fpm_block
    );
    Ok(())
}
