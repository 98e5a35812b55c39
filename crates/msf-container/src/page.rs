//! Page arithmetic and the free page map slot predicate
//!
//! An MSF file is a flat array of fixed-size pages addressed by their
//! zero-based ordinal. Every page whose ordinal modulo the page size is 1 or
//! 2 belongs to the free page map and never holds stream data.
//!
//! The free page map is duplicated so that commits can flip between the two
//! copies atomically. With a 4096-byte page one map page tracks 32768 pages,
//! yet a pair is reserved every 4096 pages. That over-reservation is part of
//! the on-disk format and other tools depend on it.

/// Page size used when writing containers
pub const PAGE_SIZE: u32 = 4096;

/// Smallest page size accepted when reading a container
pub const MIN_PAGE_SIZE: u32 = 512;

/// Largest page size accepted when reading a container
pub const MAX_PAGE_SIZE: u32 = 32768;

/// Number of leading pages reserved before any stream data
///
/// Page 0 holds the header, pages 1 and 2 are the two free page map copies
/// and page 3 is an unused spare.
pub const PREAMBLE_PAGES: u32 = 4;

/// Ordinal of the header page
pub const HEADER_PAGE: u32 = 0;

/// Ordinal of the spare page at the end of the preamble
pub const SPARE_PAGE: u32 = 3;

/// Number of pages needed to hold `byte_len` bytes
///
/// Streams are never partially addressed, so any remainder occupies a
/// whole page.
pub fn page_count(page_size: u32, byte_len: u32) -> u32 {
    byte_len.div_ceil(page_size)
}

/// Returns true if `page` is a reserved free page map slot
///
/// `page_size` must be a non-zero power of two.
pub fn is_fpm_page(page: u32, page_size: u32) -> bool {
    matches!(page & (page_size - 1), 1 | 2)
}

/// Returns true if `page_size` is usable for an MSF container
pub fn is_valid_page_size(page_size: u32) -> bool {
    page_size.is_power_of_two() && (MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&page_size)
}

/// Byte offset of `page` within the file
pub fn page_offset(page: u32, page_size: u32) -> u64 {
    u64::from(page) * u64::from(page_size)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_page_count_rounding() {
        assert_eq!(page_count(PAGE_SIZE, 0), 0);
        assert_eq!(page_count(PAGE_SIZE, 1), 1);
        assert_eq!(page_count(PAGE_SIZE, 4095), 1);
        assert_eq!(page_count(PAGE_SIZE, 4096), 1);
        assert_eq!(page_count(PAGE_SIZE, 4097), 2);
        assert_eq!(page_count(PAGE_SIZE, 10 * 4096), 10);
        assert_eq!(page_count(512, 513), 2);
    }

    #[test]
    fn test_fpm_slots_in_first_intervals() {
        let reserved: Vec<u32> = (0..8200).filter(|&p| is_fpm_page(p, PAGE_SIZE)).collect();
        assert_eq!(reserved, vec![1, 2, 4097, 4098, 8193, 8194]);
    }

    #[test]
    fn test_fpm_predicate_follows_page_size() {
        assert!(is_fpm_page(513, 512));
        assert!(is_fpm_page(514, 512));
        assert!(!is_fpm_page(515, 512));
        assert!(!is_fpm_page(512, 512));
        assert!(!is_fpm_page(513, PAGE_SIZE));
    }

    #[test]
    fn test_page_size_validation() {
        assert!(is_valid_page_size(512));
        assert!(is_valid_page_size(4096));
        assert!(is_valid_page_size(32768));
        assert!(!is_valid_page_size(0));
        assert!(!is_valid_page_size(256));
        assert!(!is_valid_page_size(4000));
        assert!(!is_valid_page_size(65536));
    }

    #[test]
    fn test_page_offset_does_not_overflow() {
        assert_eq!(page_offset(3, PAGE_SIZE), 12288);
        assert_eq!(
            page_offset(u32::MAX, PAGE_SIZE),
            u64::from(u32::MAX) * 4096
        );
    }
}
