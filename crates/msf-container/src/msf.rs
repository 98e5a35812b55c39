//! The MSF container: an ordered collection of streams

use crate::config::MsfConfig;
use crate::directory::{NIL_STREAM_SIZE, StreamTable};
use crate::error::{InvalidContainer, MsfError, Result};
use crate::fpm::FreePageMap;
use crate::header::{HEADER_SIZE, MsfHeader};
use crate::page::page_count;
use crate::stream::{IndirectStream, MsfStream, PageStream, SharedFile};
use crate::writer::{PageWriter, WriteSummary, commit};
use std::cell::RefCell;
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::rc::Rc;
use tracing::{debug, warn};

/// A multi-stream file
///
/// Streams are addressed by index. A `None` entry is a hole: the index
/// stays reserved but holds no stream, so later indices never shift.
///
/// Containers opened from a file keep the handle and read stream bytes
/// from it on demand. The container and its streams are single-threaded.
#[derive(Debug)]
pub struct MsfFile<R> {
    file: Option<SharedFile<R>>,
    header: Option<MsfHeader>,
    streams: Vec<Option<MsfStream<R>>>,
}

impl<R> MsfFile<R> {
    /// Create an empty container with no backing file
    pub fn new() -> Self {
        Self {
            file: None,
            header: None,
            streams: Vec::new(),
        }
    }

    /// Header the container was opened with, if any
    pub fn header(&self) -> Option<&MsfHeader> {
        self.header.as_ref()
    }

    /// Number of stream indices, holes included
    pub fn stream_count(&self) -> usize {
        self.streams.len()
    }

    /// Stream at `index`, or `None` for holes and out-of-range indices
    pub fn stream(&self, index: usize) -> Option<&MsfStream<R>> {
        self.streams.get(index).and_then(Option::as_ref)
    }

    /// Mutable stream at `index`, or `None` for holes and out-of-range indices
    pub fn stream_mut(&mut self, index: usize) -> Option<&mut MsfStream<R>> {
        self.streams.get_mut(index).and_then(Option::as_mut)
    }

    /// Iterate over all indices, holes included
    pub fn streams(&self) -> impl Iterator<Item = Option<&MsfStream<R>>> {
        self.streams.iter().map(Option::as_ref)
    }

    /// Append a stream and return its index
    pub fn add_stream(&mut self, stream: impl Into<MsfStream<R>>) -> usize {
        self.streams.push(Some(stream.into()));
        self.streams.len() - 1
    }

    /// Append a hole and return its index
    pub fn add_hole(&mut self) -> usize {
        self.streams.push(None);
        self.streams.len() - 1
    }

    /// Put `stream` at an existing index, returning what was there
    pub fn replace_stream(
        &mut self,
        index: usize,
        stream: impl Into<MsfStream<R>>,
    ) -> Result<Option<MsfStream<R>>> {
        let slot = self.slot_mut(index)?;
        Ok(slot.replace(stream.into()))
    }

    /// Turn an existing index into a hole, returning the stream
    pub fn remove_stream(&mut self, index: usize) -> Result<Option<MsfStream<R>>> {
        let slot = self.slot_mut(index)?;
        Ok(slot.take())
    }

    fn slot_mut(&mut self, index: usize) -> Result<&mut Option<MsfStream<R>>> {
        let count = self.streams.len();
        self.streams
            .get_mut(index)
            .ok_or(MsfError::StreamIndexOutOfRange { index, count })
    }
}

impl<R> Default for MsfFile<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Read + Seek> MsfFile<R> {
    /// Parse a container with the default configuration
    pub fn open(file: R) -> Result<Self> {
        Self::open_with_config(file, &MsfConfig::default())
    }

    /// Parse a container
    ///
    /// Validation runs header first, then the stream table, then the
    /// per-stream page lists, and stops at the first problem.
    pub fn open_with_config(mut file: R, config: &MsfConfig) -> Result<Self> {
        file.seek(SeekFrom::Start(0))?;
        let mut raw = [0u8; HEADER_SIZE];
        read_or(&mut file, &mut raw, InvalidContainer::MissingHeader)?;

        let header = MsfHeader::parse(&raw)?;
        header.validate()?;

        let actual = file.seek(SeekFrom::End(0))?;
        let expected = header.expected_file_size();
        if actual != expected {
            return Err(InvalidContainer::SizeMismatch { expected, actual }.into());
        }

        if !matches!(header.free_page_map, 1 | 2) {
            warn!(
                "Header names free page map block {}, expected 1 or 2",
                header.free_page_map
            );
        }

        let page_size = header.page_size;
        let checker = PageBounds {
            page_count: header.page_count,
            enabled: config.check_page_bounds,
        };

        // Page list of the pages that hold the stream table's page list
        let table_size = header.stream_table.size;
        let table_pages_count = page_count(page_size, table_size);
        let root_len = table_pages_count as usize * 4;
        if (HEADER_SIZE + root_len) as u64 > actual {
            return Err(InvalidContainer::MissingRootPageList.into());
        }
        if u64::from(table_size) > expected {
            return Err(InvalidContainer::StreamTableTooLarge {
                size: table_size,
                file_size: expected,
            }
            .into());
        }
        let mut root = vec![0u8; root_len];
        file.seek(SeekFrom::Start(HEADER_SIZE as u64))?;
        read_or(&mut file, &mut root, InvalidContainer::MissingRootPageList)?;
        let root = to_words(&root);

        let file = Rc::new(RefCell::new(file));

        let list_len = table_pages_count * 4;
        let list_pages = take_pages(&root, page_count(page_size, list_len));
        checker.check(&list_pages)?;
        let list = read_stream_or(
            IndirectStream::new(Rc::clone(&file), page_size, list_len, list_pages),
            InvalidContainer::TruncatedPageList,
        )?;
        let table_pages = to_words(&list);

        checker.check(&table_pages)?;
        let table = read_stream_or(
            IndirectStream::new(Rc::clone(&file), page_size, table_size, table_pages),
            InvalidContainer::TruncatedStreamTable,
        )?;
        let table = StreamTable::parse(&table, page_size)?;

        let mut streams = Vec::with_capacity(table.stream_count());
        for (size, pages) in table.sizes.into_iter().zip(table.page_lists) {
            if size == NIL_STREAM_SIZE {
                streams.push(None);
                continue;
            }
            checker.check(&pages)?;
            let stream = IndirectStream::new(Rc::clone(&file), page_size, size, pages);
            streams.push(Some(MsfStream::Indirect(stream)));
        }

        debug!(
            "Opened MSF container: page size {}, {} pages, {} streams",
            page_size,
            header.page_count,
            streams.len()
        );

        Ok(Self {
            file: Some(file),
            header: Some(header),
            streams,
        })
    }

    /// Read a whole stream, or `None` for a hole
    pub fn read_stream(&mut self, index: usize) -> Result<Option<Vec<u8>>> {
        match self.slot_mut(index)? {
            Some(stream) => Ok(Some(stream.read_all()?)),
            None => Ok(None),
        }
    }

    /// Read the free page map of the backing file
    ///
    /// Returns `None` for containers that were not opened from a file, and
    /// fails if the header names a copy other than 1 or 2.
    pub fn read_free_page_map(&self) -> Result<Option<FreePageMap>> {
        let (Some(file), Some(header)) = (&self.file, &self.header) else {
            return Ok(None);
        };
        if !matches!(header.free_page_map, 1 | 2) {
            return Err(InvalidContainer::InvalidFreePageMapBlock(header.free_page_map).into());
        }
        let mut file = file.borrow_mut();
        let map = FreePageMap::read_from(
            &mut *file,
            header.page_size,
            header.page_count,
            header.free_page_map,
        )?;
        Ok(Some(map))
    }

    /// Write the container to `out` with the default configuration
    pub fn write<W: Write + Seek>(&mut self, out: W) -> Result<WriteSummary> {
        self.write_with_config(out, &MsfConfig::default())
    }

    /// Write every stream to `out` and commit the header
    ///
    /// `out` must be a different handle from the one the container was
    /// opened from. On failure its contents are undefined.
    pub fn write_with_config<W: Write + Seek>(
        &mut self,
        out: W,
        config: &MsfConfig,
    ) -> Result<WriteSummary> {
        config.validate()?;
        let mut writer = PageWriter::new(out);
        let summary = writer.write_streams(&mut self.streams)?;
        commit(writer.get_mut(), &summary, config)?;
        Ok(summary)
    }
}

struct PageBounds {
    page_count: u32,
    enabled: bool,
}

impl PageBounds {
    fn check(&self, pages: &[u32]) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        match pages.iter().find(|&&page| page >= self.page_count) {
            Some(&page) => Err(InvalidContainer::PageOutOfRange {
                page,
                page_count: self.page_count,
            }
            .into()),
            None => Ok(()),
        }
    }
}

/// `read_exact`, reporting a short read as `cause`
fn read_or<R: Read>(file: &mut R, buf: &mut [u8], cause: InvalidContainer) -> Result<()> {
    match file.read_exact(buf) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => Err(cause.into()),
        Err(e) => Err(e.into()),
    }
}

/// Read a whole helper stream, reporting a short read as `cause`
fn read_stream_or<R: Read + Seek>(
    mut stream: IndirectStream<R>,
    cause: InvalidContainer,
) -> Result<Vec<u8>> {
    let data = match stream.read_all() {
        Ok(data) => data,
        Err(MsfError::Io(e)) if e.kind() == ErrorKind::UnexpectedEof => {
            return Err(cause.into());
        }
        Err(e) => return Err(e),
    };
    if data.len() as u64 != stream.len() {
        return Err(cause.into());
    }
    Ok(data)
}

fn to_words(data: &[u8]) -> Vec<u32> {
    data.chunks_exact(4)
        .map(|w| u32::from_le_bytes([w[0], w[1], w[2], w[3]]))
        .collect()
}

fn take_pages(list: &[u32], count: u32) -> Vec<u32> {
    list.iter().copied().take(count as usize).collect()
}
