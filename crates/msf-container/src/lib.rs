//! Reader and writer for MSF multi-stream container files
//!
#![allow(clippy::cast_possible_truncation)] // Page ordinals and sizes are u32 on disk
#![allow(clippy::cast_lossless)] // Sometimes clearer than From
#![allow(clippy::uninlined_format_args)] // Backwards compatibility
#![allow(clippy::doc_markdown)] // MSF terms don't need backticks
#![allow(clippy::module_name_repetitions)] // Clear naming is preferred
#![allow(clippy::return_self_not_must_use)] // Builder patterns
#![allow(clippy::use_self)] // Type clarity
//! An MSF file is a paged container that multiplexes an ordered set of
//! independent byte streams into a single file. It is the layout used by
//! program database files.
//!
//! # Layout
//!
//! - The file is an array of fixed-size pages (4096 bytes when written here)
//! - Page 0 holds the header and the root page list
//! - Pages 1 and 2 of every `page_size` interval hold the free page map
//! - The stream table lists every stream's size and page ordinals
//! - Stream data pages are not necessarily contiguous
//!
//! # Example
//!
//! ```
//! use msf_container::{MsfFile, PageStream};
//! use std::io::Cursor;
//!
//! let mut msf: MsfFile<Cursor<Vec<u8>>> = MsfFile::new();
//! msf.add_stream(b"hello".to_vec());
//!
//! let mut out = Cursor::new(Vec::new());
//! msf.write(&mut out)?;
//!
//! let mut reopened = MsfFile::open(Cursor::new(out.into_inner()))?;
//! assert_eq!(reopened.read_stream(0)?, Some(b"hello".to_vec()));
//! assert_eq!(reopened.stream(0).map(|s| s.len()), Some(5));
//! # Ok::<(), msf_container::MsfError>(())
//! ```

#![warn(missing_docs)]

pub mod allocator;
pub mod config;
pub mod directory;
pub mod error;
pub mod fpm;
pub mod header;
pub mod msf;
pub mod page;
pub mod stream;
pub mod writer;

pub use config::MsfConfig;
pub use directory::StreamTable;
pub use error::{InvalidContainer, MsfError, Result};
pub use fpm::FreePageMap;
pub use header::{MSF_MAGIC, MsfHeader};
pub use msf::MsfFile;
pub use page::PAGE_SIZE;
pub use stream::{FlatStream, IndirectStream, MsfStream, PageStream, SharedFile};
pub use writer::{PageWriter, WriteSummary, commit};
