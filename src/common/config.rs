//! Configuration for relstore.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Default size of a page in bytes (4KB).
///
/// This value is chosen to match:
/// - OS page size on most systems (4096 bytes)
/// - Common database page sizes (PostgreSQL uses 8KB, but 4KB is also standard)
pub const DEFAULT_PAGE_SIZE: usize = 4096;

/// Default number of pages a buffer pool caches when no capacity is given.
pub const DEFAULT_POOL_PAGES: usize = 50;

/// Process-wide page size shared by every heap page and heap file.
///
/// Mutable only so tests can exercise small pages; production code treats
/// this as a constant fixed at startup.
static PAGE_SIZE: AtomicUsize = AtomicUsize::new(DEFAULT_PAGE_SIZE);

/// Get the current page size in bytes.
#[inline]
pub fn page_size() -> usize {
    PAGE_SIZE.load(Ordering::Relaxed)
}

/// Override the process-wide page size.
///
/// THIS FUNCTION SHOULD ONLY BE USED FOR TESTING. Changing the page size
/// while heap files exist invalidates every offset computed so far.
pub fn set_page_size(size: usize) {
    assert!(size > 0, "page size must be > 0");
    PAGE_SIZE.store(size, Ordering::Relaxed);
}

/// Restore the default page size. Test-only, like [`set_page_size`].
pub fn reset_page_size() {
    PAGE_SIZE.store(DEFAULT_PAGE_SIZE, Ordering::Relaxed);
}
