//! Database context: one catalog plus one buffer pool.
//!
//! Everything that needs to resolve a table or fetch a page takes a
//! `&Database` explicitly, so tests can run any number of independent
//! database instances side by side.

use crate::buffer::BufferPool;
use crate::common::config::DEFAULT_POOL_PAGES;
use crate::storage::Catalog;

/// A single-node database instance.
pub struct Database {
    catalog: Catalog,
    buffer_pool: BufferPool,
}

impl Database {
    /// Instance with a buffer pool of `pool_pages` pages.
    pub fn new(pool_pages: usize) -> Self {
        Self {
            catalog: Catalog::new(),
            buffer_pool: BufferPool::new(pool_pages),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn buffer_pool(&self) -> &BufferPool {
        &self.buffer_pool
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_PAGES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instances_are_independent() {
        let a = Database::new(4);
        let b = Database::new(8);
        assert_eq!(a.buffer_pool().capacity(), 4);
        assert_eq!(b.buffer_pool().capacity(), 8);
        assert!(a.catalog().table_ids().is_empty());
    }

    #[test]
    fn test_default_capacity() {
        let db = Database::default();
        assert_eq!(db.buffer_pool().capacity(), DEFAULT_POOL_PAGES);
    }
}
