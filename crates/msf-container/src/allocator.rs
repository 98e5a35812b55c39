//! Sequential page allocation that steps over free page map slots

use crate::page::{PAGE_SIZE, PREAMBLE_PAGES, is_fpm_page};
use std::ops::Range;
use tracing::trace;

/// Result of allocating one data page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSlot {
    /// Reserved free page map pages that precede the data page
    ///
    /// The writer must fill these with blank pages. Empty unless the cursor
    /// reached an FPM slot, in which case it covers the whole pair.
    pub reserved: Range<u32>,

    /// Page that receives the data
    pub page: u32,
}

/// Hands out page ordinals in file order
///
/// The allocator never reuses pages. It only moves forward, and whenever
/// the next ordinal is a free page map slot it reserves the slot before
/// returning a data page.
#[derive(Debug, Clone)]
pub struct PageAllocator {
    page_size: u32,
    next: u32,
}

impl PageAllocator {
    /// Allocator positioned after the preamble
    pub fn new(page_size: u32) -> Self {
        Self::starting_at(page_size, PREAMBLE_PAGES)
    }

    /// Allocator whose first candidate page is `next`
    pub fn starting_at(page_size: u32, next: u32) -> Self {
        Self { page_size, next }
    }

    /// Next page ordinal to be considered
    ///
    /// Equal to the number of pages emitted so far when the allocator
    /// started at page 0 or after the preamble.
    pub fn next_page(&self) -> u32 {
        self.next
    }

    /// Page size used by the FPM predicate
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Allocate the next data page
    pub fn allocate(&mut self) -> PageSlot {
        let start = self.next;
        while is_fpm_page(self.next, self.page_size) {
            self.next += 1;
        }
        if self.next != start {
            trace!("Reserved free page map pages {}..{}", start, self.next);
        }

        let page = self.next;
        self.next += 1;
        PageSlot {
            reserved: start..page,
            page,
        }
    }
}

impl Default for PageAllocator {
    fn default() -> Self {
        Self::new(PAGE_SIZE)
    }
}
