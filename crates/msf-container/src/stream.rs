//! Page streams: the byte sequences multiplexed inside a container
//!
//! Every stream exposes the same small capability set through
//! [`PageStream`]: a declared length, a repositionable cursor and a bounded
//! read. Two variants exist:
//!
//! - [`IndirectStream`] fetches each page-sized chunk from the backing file
//!   through a list of page ordinals. Streams produced by
//!   [`MsfFile::open`](crate::MsfFile::open) are of this kind.
//! - [`FlatStream`] serves bytes from a contiguous in-memory buffer. New
//!   content added to a container and freshly assembled tables use it.
//!
//! [`MsfStream`] is the tagged union the container stores.

use crate::error::Result;
use crate::page::page_offset;
use std::cell::RefCell;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::rc::Rc;

/// Backing file shared between a container and the streams it produced
///
/// Streams reposition the handle before every read, so a handle must not
/// be used from more than one pass at a time.
pub type SharedFile<R> = Rc<RefCell<R>>;

/// Capability set shared by all stream variants
pub trait PageStream {
    /// Declared length in bytes, independent of page padding
    fn len(&self) -> u64;

    /// Returns true if the stream holds no bytes
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current cursor position
    fn pos(&self) -> u64;

    /// Move the cursor
    ///
    /// Positions past the end are allowed; reads there return 0.
    fn set_pos(&mut self, pos: u64);

    /// Read up to `buf.len()` bytes from the cursor
    ///
    /// Returns 0 exactly at end of stream and never more than `buf.len()`.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Read everything from the start of the stream
    fn read_all(&mut self) -> Result<Vec<u8>> {
        self.set_pos(0);
        let mut data = vec![0u8; self.len() as usize];
        let mut filled = 0;
        while filled < data.len() {
            let n = self.read(&mut data[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        data.truncate(filled);
        Ok(data)
    }
}

/// Stream whose bytes live on non-contiguous pages of the backing file
#[derive(Debug)]
pub struct IndirectStream<R> {
    file: SharedFile<R>,
    page_size: u32,
    len: u32,
    pages: Vec<u32>,
    pos: u64,
}

impl<R> IndirectStream<R> {
    /// Create a stream of `len` bytes over `pages`
    ///
    /// `pages` should hold `page_count(page_size, len)` entries; a shorter
    /// list surfaces as an `UnexpectedEof` I/O error when the missing page
    /// is read.
    pub fn new(file: SharedFile<R>, page_size: u32, len: u32, pages: Vec<u32>) -> Self {
        Self {
            file,
            page_size,
            len,
            pages,
            pos: 0,
        }
    }

    /// Page ordinals backing this stream, in stream order
    pub fn pages(&self) -> &[u32] {
        &self.pages
    }

    /// Page size of the backing file
    pub fn page_size(&self) -> u32 {
        self.page_size
    }
}

impl<R: Read + Seek> PageStream for IndirectStream<R> {
    fn len(&self) -> u64 {
        u64::from(self.len)
    }

    fn pos(&self) -> u64 {
        self.pos
    }

    fn set_pos(&mut self, pos: u64) {
        self.pos = pos;
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let len = u64::from(self.len);
        if self.pos >= len {
            return Ok(0);
        }
        let want = (len - self.pos).min(buf.len() as u64) as usize;
        let page_size = u64::from(self.page_size);

        let mut file = self.file.borrow_mut();
        let mut done = 0;
        while done < want {
            let index = (self.pos / page_size) as usize;
            let offset = self.pos % page_size;
            let chunk = ((page_size - offset) as usize).min(want - done);

            let page = *self.pages.get(index).ok_or_else(|| {
                std::io::Error::new(
                    ErrorKind::UnexpectedEof,
                    format!("stream page list ends before page {index}"),
                )
            })?;

            file.seek(SeekFrom::Start(page_offset(page, self.page_size) + offset))?;
            file.read_exact(&mut buf[done..done + chunk])?;

            done += chunk;
            self.pos += chunk as u64;
        }
        Ok(done)
    }
}

/// Stream backed by a contiguous in-memory buffer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlatStream {
    data: Vec<u8>,
    pos: u64,
}

impl FlatStream {
    /// Wrap `data` with the cursor at 0
    pub fn new(data: Vec<u8>) -> Self {
        Self { data, pos: 0 }
    }

    /// The whole buffer
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Give back the buffer
    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}

impl From<Vec<u8>> for FlatStream {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl From<&[u8]> for FlatStream {
    fn from(data: &[u8]) -> Self {
        Self::new(data.to_vec())
    }
}

impl PageStream for FlatStream {
    fn len(&self) -> u64 {
        self.data.len() as u64
    }

    fn pos(&self) -> u64 {
        self.pos
    }

    fn set_pos(&mut self, pos: u64) {
        self.pos = pos;
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let len = self.data.len() as u64;
        if self.pos >= len {
            return Ok(0);
        }
        let start = self.pos as usize;
        let n = (self.data.len() - start).min(buf.len());
        buf[..n].copy_from_slice(&self.data[start..start + n]);
        self.pos += n as u64;
        Ok(n)
    }
}

/// A stream held by a container
#[derive(Debug)]
pub enum MsfStream<R> {
    /// Pages of the file the container was opened from
    Indirect(IndirectStream<R>),
    /// In-memory content
    Flat(FlatStream),
}

impl<R> MsfStream<R> {
    /// Wrap an in-memory buffer
    pub fn flat(data: impl Into<Vec<u8>>) -> Self {
        Self::Flat(FlatStream::new(data.into()))
    }

    /// Page ordinals on disk, if this stream came from a file
    pub fn pages(&self) -> Option<&[u32]> {
        match self {
            Self::Indirect(s) => Some(s.pages()),
            Self::Flat(_) => None,
        }
    }
}

impl<R> From<FlatStream> for MsfStream<R> {
    fn from(stream: FlatStream) -> Self {
        Self::Flat(stream)
    }
}

impl<R> From<IndirectStream<R>> for MsfStream<R> {
    fn from(stream: IndirectStream<R>) -> Self {
        Self::Indirect(stream)
    }
}

impl<R> From<Vec<u8>> for MsfStream<R> {
    fn from(data: Vec<u8>) -> Self {
        Self::flat(data)
    }
}

impl<R: Read + Seek> PageStream for MsfStream<R> {
    fn len(&self) -> u64 {
        match self {
            Self::Indirect(s) => s.len(),
            Self::Flat(s) => s.len(),
        }
    }

    fn pos(&self) -> u64 {
        match self {
            Self::Indirect(s) => s.pos(),
            Self::Flat(s) => s.pos(),
        }
    }

    fn set_pos(&mut self, pos: u64) {
        match self {
            Self::Indirect(s) => s.set_pos(pos),
            Self::Flat(s) => s.set_pos(pos),
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        match self {
            Self::Indirect(s) => s.read(buf),
            Self::Flat(s) => s.read(buf),
        }
    }
}
