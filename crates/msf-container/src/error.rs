//! Error types for reading and writing MSF containers

use thiserror::Error;

/// Structural problems found while parsing a container
///
/// Each variant names one distinct cause so callers can tell a truncated
/// file from a corrupt directory.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidContainer {
    /// The file is shorter than the fixed header
    #[error("missing header")]
    MissingHeader,

    /// The header does not start with the MSF 7.00 signature
    #[error("bad magic")]
    BadMagic,

    /// The header declares a page size that is not a supported power of two
    #[error("invalid page size {0}")]
    InvalidPageSize(u32),

    /// `page_size * page_count` does not equal the file length
    #[error("size mismatch: header implies {expected} bytes, file has {actual} bytes")]
    SizeMismatch {
        /// File length computed from the header
        expected: u64,
        /// Actual file length
        actual: u64,
    },

    /// The page list following the header could not be read
    #[error("missing root stream table page list")]
    MissingRootPageList,

    /// The pages holding the stream table's page list could not be read
    #[error("truncated stream table page list")]
    TruncatedPageList,

    /// The stream table itself could not be read
    #[error("truncated stream table")]
    TruncatedStreamTable,

    /// The header declares a stream table longer than the whole file
    #[error("stream table of {size} bytes exceeds file of {file_size} bytes")]
    StreamTableTooLarge {
        /// Stream table length from the header
        size: u32,
        /// File length implied by the header
        file_size: u64,
    },

    /// The stream table length is not a whole number of 32-bit words
    #[error("invalid stream table length {0}")]
    InvalidStreamTableLength(usize),

    /// The stream count or sizes do not agree with the stream table length
    #[error("invalid stream count {count} for a stream table of {words} words")]
    InvalidStreamCount {
        /// Stream count read from the table (0 if the table is empty)
        count: u32,
        /// Number of 32-bit words in the table
        words: usize,
    },

    /// A page list refers to a page past the end of the file
    #[error("page out of range: page {page} in a file of {page_count} pages")]
    PageOutOfRange {
        /// Offending page ordinal
        page: u32,
        /// Page count from the header
        page_count: u32,
    },

    /// The header names a free page map copy other than 1 or 2
    #[error("invalid free page map block {0}")]
    InvalidFreePageMapBlock(u32),
}

/// Errors that can occur when reading, editing or writing a container
#[derive(Debug, Error)]
pub enum MsfError {
    /// The input is not a valid MSF container
    #[error("invalid MSF container: {0}")]
    InvalidContainer(#[from] InvalidContainer),

    /// The underlying file handle failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stream index does not exist in the container
    #[error("stream index {index} out of range (stream count {count})")]
    StreamIndexOutOfRange {
        /// Requested index
        index: usize,
        /// Number of streams in the container
        count: usize,
    },

    /// A stream is too long to be described by a 32-bit size
    #[error("stream {index} is {len} bytes, larger than the format allows")]
    StreamTooLarge {
        /// Stream index
        index: usize,
        /// Declared stream length
        len: u64,
    },

    /// The stream table needs more root pages than fit in the header page
    #[error("stream table needs {pages} root pages, header page holds {capacity}")]
    DirectoryTooLarge {
        /// Root pages required
        pages: usize,
        /// Root pages that fit after the header
        capacity: usize,
    },

    /// A configuration value was rejected
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl MsfError {
    /// Returns the structural cause if this is a parse failure
    pub fn invalid_container(&self) -> Option<&InvalidContainer> {
        match self {
            Self::InvalidContainer(cause) => Some(cause),
            _ => None,
        }
    }
}

impl From<binrw::Error> for MsfError {
    fn from(e: binrw::Error) -> Self {
        match e {
            binrw::Error::Io(io) => Self::Io(io),
            _ => Self::InvalidContainer(InvalidContainer::MissingHeader),
        }
    }
}

/// Result type alias for MSF operations
pub type Result<T> = std::result::Result<T, MsfError>;
