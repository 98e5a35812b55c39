//! Stream table (directory) codec
//!
//! The stream table is a flat run of little-endian `u32` words:
//!
//! ```text
//! [stream_count]
//! [size_0] [size_1] ... [size_{n-1}]
//! [pages_0 ...] [pages_1 ...] ... [pages_{n-1} ...]
//! ```
//!
//! There are no delimiters between page lists. Stream `i` owns
//! `ceil(size_i / page_size)` consecutive entries, so the sizes alone
//! determine where each list begins.

use crate::error::{InvalidContainer, Result};
use crate::page::page_count;

/// Size entry marking a stream that does not exist
pub const NIL_STREAM_SIZE: u32 = u32::MAX;

/// Decoded stream table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamTable {
    /// Declared byte length of each stream, in index order
    pub sizes: Vec<u32>,

    /// Page ordinals of each stream, in index order
    pub page_lists: Vec<Vec<u32>>,
}

impl StreamTable {
    /// Create a table from parallel size and page list arrays
    pub fn new(sizes: Vec<u32>, page_lists: Vec<Vec<u32>>) -> Self {
        Self { sizes, page_lists }
    }

    /// Number of streams described
    pub fn stream_count(&self) -> usize {
        self.sizes.len()
    }

    /// Returns true if stream `index` is marked as not existing
    pub fn is_nil(&self, index: usize) -> bool {
        self.sizes.get(index) == Some(&NIL_STREAM_SIZE)
    }

    /// Number of page list entries owned by a stream of `size` bytes
    pub fn pages_for(page_size: u32, size: u32) -> u32 {
        if size == NIL_STREAM_SIZE {
            0
        } else {
            page_count(page_size, size)
        }
    }

    /// Decode a stream table
    ///
    /// The table must be a whole number of words and its word count must
    /// equal `1 + stream_count + sum(pages_i)` exactly. Any count or size
    /// that would run past the end is rejected before it is read.
    pub fn parse(data: &[u8], page_size: u32) -> Result<Self> {
        if data.len() % 4 != 0 {
            return Err(InvalidContainer::InvalidStreamTableLength(data.len()).into());
        }

        let words: Vec<u32> = data
            .chunks_exact(4)
            .map(|w| u32::from_le_bytes([w[0], w[1], w[2], w[3]]))
            .collect();

        let Some(&count) = words.first() else {
            return Err(InvalidContainer::InvalidStreamCount { count: 0, words: 0 }.into());
        };
        let bad_count = || InvalidContainer::InvalidStreamCount {
            count,
            words: words.len(),
        };

        let sizes_end = (count as usize).checked_add(1).ok_or_else(bad_count)?;
        if sizes_end > words.len() {
            return Err(bad_count().into());
        }
        let sizes = words[1..sizes_end].to_vec();

        let mut page_lists = Vec::with_capacity(sizes.len());
        let mut cursor = sizes_end;
        for &size in &sizes {
            let pages = Self::pages_for(page_size, size) as usize;
            let end = cursor.checked_add(pages).ok_or_else(bad_count)?;
            if end > words.len() {
                return Err(bad_count().into());
            }
            page_lists.push(words[cursor..end].to_vec());
            cursor = end;
        }

        if cursor != words.len() {
            return Err(bad_count().into());
        }

        Ok(Self { sizes, page_lists })
    }

    /// Encode the table: count, then all sizes, then all page lists
    pub fn build(&self) -> Vec<u8> {
        let page_words: usize = self.page_lists.iter().map(Vec::len).sum();
        let mut data = Vec::with_capacity((1 + self.sizes.len() + page_words) * 4);

        data.extend_from_slice(&(self.sizes.len() as u32).to_le_bytes());
        for size in &self.sizes {
            data.extend_from_slice(&size.to_le_bytes());
        }
        for page in self.page_lists.iter().flatten() {
            data.extend_from_slice(&page.to_le_bytes());
        }
        data
    }
}
