//! Free page map bitmap
//!
//! One bit per page, least significant bit first within each byte. A set
//! bit marks the page as free. The bitmap is stored as a logical stream
//! spread over the FPM page of every interval: interval `k` keeps bytes
//! `k * page_size .. (k + 1) * page_size` of the bitmap in page
//! `k * page_size + block`, where `block` is 1 or 2.

use crate::error::Result;
use crate::page::{SPARE_PAGE, page_offset};
use std::io::{Read, Seek, SeekFrom};

/// Bitmap of free pages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreePageMap {
    bits: Vec<u8>,
    page_count: u32,
}

impl FreePageMap {
    /// Map of `page_count` pages, all marked used
    pub fn all_used(page_count: u32) -> Self {
        let mut map = Self {
            bits: vec![0u8; (page_count as usize).div_ceil(8)],
            page_count,
        };
        // Bits past the last page describe pages that do not exist yet
        for page in page_count..(map.bits.len() as u32 * 8) {
            map.set(page, true);
        }
        map
    }

    /// Map for a container produced by the writer
    ///
    /// Every page is in use except the spare preamble page.
    pub fn for_written_container(page_count: u32) -> Self {
        let mut map = Self::all_used(page_count);
        if SPARE_PAGE < page_count {
            map.mark_free(SPARE_PAGE);
        }
        map
    }

    /// Number of pages covered
    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// Returns true if `page` is free
    ///
    /// Pages beyond the end of the file are always free.
    pub fn is_free(&self, page: u32) -> bool {
        if page >= self.page_count {
            return true;
        }
        self.bits[(page / 8) as usize] & (1 << (page % 8)) != 0
    }

    /// Mark `page` as free
    pub fn mark_free(&mut self, page: u32) {
        self.set(page, true);
    }

    /// Mark `page` as in use
    pub fn mark_used(&mut self, page: u32) {
        self.set(page, false);
    }

    /// Number of free pages within the file
    pub fn free_count(&self) -> u32 {
        (0..self.page_count).filter(|&p| self.is_free(p)).count() as u32
    }

    /// Raw bitmap bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bits
    }

    /// Contents of the FPM page for `interval`
    ///
    /// Bytes past the end of the bitmap read as all-free.
    pub fn interval_page(&self, interval: u32, page_size: u32) -> Vec<u8> {
        let mut page = vec![0xFFu8; page_size as usize];
        let start = interval as usize * page_size as usize;
        if start < self.bits.len() {
            let end = (start + page_size as usize).min(self.bits.len());
            page[..end - start].copy_from_slice(&self.bits[start..end]);
        }
        page
    }

    /// FPM page ordinals for `block` (1 or 2), one per interval
    pub fn fpm_pages(page_count: u32, page_size: u32, block: u32) -> impl Iterator<Item = u32> {
        (0..)
            .map(move |interval: u32| interval * page_size + block)
            .take_while(move |&page| page < page_count)
    }

    /// Read the map stored in FPM copy `block` of a container
    pub fn read_from<R: Read + Seek>(
        file: &mut R,
        page_size: u32,
        page_count: u32,
        block: u32,
    ) -> Result<Self> {
        let mut bits = Vec::new();
        let mut buf = vec![0u8; page_size as usize];
        for page in Self::fpm_pages(page_count, page_size, block) {
            file.seek(SeekFrom::Start(page_offset(page, page_size)))?;
            file.read_exact(&mut buf)?;
            bits.extend_from_slice(&buf);
        }
        bits.resize((page_count as usize).div_ceil(8), 0xFF);
        Ok(Self { bits, page_count })
    }

    fn set(&mut self, page: u32, free: bool) {
        let Some(byte) = self.bits.get_mut((page / 8) as usize) else {
            return;
        };
        let mask = 1u8 << (page % 8);
        if free {
            *byte |= mask;
        } else {
            *byte &= !mask;
        }
    }
}
