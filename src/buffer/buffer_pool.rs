//! Buffer pool - the fixed-capacity page cache every page access goes
//! through.
//!
//! The pool enforces the transactional contract end to end:
//! - every `get_page` takes the page lock (via the [`LockManager`]) before
//!   touching the cache, so data access and locking cannot be reordered;
//! - dirty pages are never evicted and never flushed mid-transaction
//!   (no-steal), so an abort can always recover by re-reading disk;
//! - commit flushes exactly the committing transaction's dirty pages
//!   before its locks drop (force).
//!
//! Eviction is recency-based: pages are tracked oldest-first, and the
//! oldest clean page goes. When every cached page is dirty the pool refuses
//! the request with [`Error::BufferFull`] instead of breaking no-steal.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::buffer::lock_manager::LockManager;
use crate::buffer::stats::BufferPoolStats;
use crate::common::config::DEFAULT_POOL_PAGES;
use crate::common::{Error, PageId, Permissions, Result, TableId, TransactionId};
use crate::database::Database;
use crate::storage::heap_page::HeapPage;
use crate::storage::tuple::Tuple;

use std::sync::atomic::Ordering;

struct PageCache {
    pages: HashMap<PageId, Arc<RwLock<HeapPage>>>,
    /// Access order, oldest at the front. Touched on every hit.
    recency: VecDeque<PageId>,
}

impl PageCache {
    fn touch(&mut self, pid: PageId) {
        if let Some(pos) = self.recency.iter().position(|p| *p == pid) {
            self.recency.remove(pos);
        }
        self.recency.push_back(pid);
    }

    fn remove(&mut self, pid: PageId) -> Option<Arc<RwLock<HeapPage>>> {
        if let Some(pos) = self.recency.iter().position(|p| *p == pid) {
            self.recency.remove(pos);
        }
        self.pages.remove(&pid)
    }
}

/// Fixed-capacity cache of heap pages shared by all transactions.
pub struct BufferPool {
    capacity: usize,
    cache: Mutex<PageCache>,
    lock_manager: LockManager,
    stats: BufferPoolStats,
}

impl BufferPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            cache: Mutex::new(PageCache {
                pages: HashMap::with_capacity(capacity),
                recency: VecDeque::with_capacity(capacity),
            }),
            lock_manager: LockManager::new(),
            stats: BufferPoolStats::new(),
        }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_POOL_PAGES)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn lock_manager(&self) -> &LockManager {
        &self.lock_manager
    }

    pub fn stats(&self) -> &BufferPoolStats {
        &self.stats
    }

    /// Fetch a page on behalf of `txn`, locking it per `perm` first.
    ///
    /// Blocks until the page lock is granted. On a cache miss the page is
    /// read from its heap file; if the pool is at capacity, the oldest
    /// clean page is evicted to make room.
    ///
    /// # Errors
    /// [`Error::TransactionAborted`] if locking would deadlock;
    /// [`Error::BufferFull`] if the pool is at capacity and every cached
    /// page is dirty.
    pub fn get_page(
        &self,
        db: &Database,
        txn: TransactionId,
        pid: PageId,
        perm: Permissions,
    ) -> Result<Arc<RwLock<HeapPage>>> {
        // The page lock comes first; the cache mutex is never held while
        // waiting on it.
        self.lock_manager.acquire(txn, pid, perm.lock_mode())?;

        let mut cache = self.cache.lock();
        if let Some(page) = cache.pages.get(&pid) {
            let page = Arc::clone(page);
            cache.touch(pid);
            self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(page);
        }

        self.stats.cache_misses.fetch_add(1, Ordering::Relaxed);
        if cache.pages.len() >= self.capacity {
            self.evict_one(&mut cache)?;
        }

        let file = db.catalog().file(pid.table())?;
        let page = Arc::new(RwLock::new(file.read_page(pid)?));
        cache.pages.insert(pid, Arc::clone(&page));
        cache.recency.push_back(pid);
        Ok(page)
    }

    /// Drop the oldest clean page. Dirty pages are pinned by no-steal.
    fn evict_one(&self, cache: &mut PageCache) -> Result<()> {
        let victim = cache
            .recency
            .iter()
            .copied()
            .find(|pid| {
                cache
                    .pages
                    .get(pid)
                    .is_some_and(|page| page.read().dirtied_by().is_none())
            })
            .ok_or(Error::BufferFull)?;
        cache.remove(victim);
        self.stats.evictions.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Insert `tuple` into `table` on behalf of `txn`, marking every page
    /// the insert touched as dirtied by `txn`.
    pub fn insert_tuple(
        &self,
        db: &Database,
        txn: TransactionId,
        table: TableId,
        tuple: Tuple,
    ) -> Result<()> {
        let file = db.catalog().file(table)?;
        let dirtied = file.insert_tuple(db, txn, tuple)?;
        self.mark_dirtied(txn, &dirtied);
        Ok(())
    }

    /// Delete `tuple` from the page its record id names, marking that page
    /// as dirtied by `txn`.
    pub fn delete_tuple(&self, db: &Database, txn: TransactionId, tuple: &Tuple) -> Result<()> {
        let rid = tuple.record_id().ok_or(Error::MissingRecordId)?;
        let file = db.catalog().file(rid.page_id.table())?;
        let page = file.delete_tuple(db, txn, tuple)?;
        self.mark_dirtied(txn, std::slice::from_ref(&page));
        Ok(())
    }

    fn mark_dirtied(&self, txn: TransactionId, pages: &[Arc<RwLock<HeapPage>>]) {
        let mut cache = self.cache.lock();
        for page in pages {
            let pid = {
                let mut guard = page.write();
                guard.mark_dirty(Some(txn));
                guard.id()
            };
            // Re-cache the mutated page unconditionally, replacing any
            // stale copy that slipped in if eviction raced with the
            // mutation while no cache lock was held.
            cache.pages.insert(pid, Arc::clone(page));
            cache.touch(pid);
        }
    }

    /// Finish `txn`: commit makes its writes durable, abort erases them.
    ///
    /// On commit, every page `txn` dirtied is flushed and marked clean. On
    /// abort, every such page is re-read from disk, replacing the cached
    /// copy. Either way `txn`'s locks are released last, so no other
    /// transaction sees a page mid-rollback.
    pub fn transaction_complete(
        &self,
        db: &Database,
        txn: TransactionId,
        commit: bool,
    ) -> Result<()> {
        let outcome = self.finish_pages(db, txn, commit);
        // Locks drop even if a flush or reload failed.
        self.lock_manager.release_all(txn);
        let counter = if commit {
            &self.stats.commits
        } else {
            &self.stats.aborts
        };
        counter.fetch_add(1, Ordering::Relaxed);
        outcome
    }

    fn finish_pages(&self, db: &Database, txn: TransactionId, commit: bool) -> Result<()> {
        let mut cache = self.cache.lock();
        let dirtied: Vec<(PageId, Arc<RwLock<HeapPage>>)> = cache
            .pages
            .iter()
            .filter(|(_, page)| page.read().dirtied_by() == Some(txn))
            .map(|(pid, page)| (*pid, Arc::clone(page)))
            .collect();

        for (pid, page) in dirtied {
            if commit {
                let file = db.catalog().file(pid.table())?;
                {
                    let guard = page.read();
                    file.write_page(&guard)?;
                }
                self.stats.flushes.fetch_add(1, Ordering::Relaxed);
                let mut guard = page.write();
                guard.mark_dirty(None);
                guard.set_before_image();
            } else {
                let file = db.catalog().file(pid.table())?;
                let fresh = Arc::new(RwLock::new(file.read_page(pid)?));
                cache.pages.insert(pid, fresh);
            }
        }
        Ok(())
    }

    /// Write every dirty page back to disk, marking each clean.
    ///
    /// Breaks no-steal on purpose; only for shutdown and tests, never
    /// during normal operation.
    pub fn flush_all_pages(&self, db: &Database) -> Result<()> {
        let cache = self.cache.lock();
        for (pid, page) in &cache.pages {
            self.flush_one(db, *pid, page)?;
        }
        Ok(())
    }

    /// Write `txn`'s dirty pages back to disk, marking each clean.
    pub fn flush_pages(&self, db: &Database, txn: TransactionId) -> Result<()> {
        let cache = self.cache.lock();
        for (pid, page) in &cache.pages {
            if page.read().dirtied_by() == Some(txn) {
                self.flush_one(db, *pid, page)?;
            }
        }
        Ok(())
    }

    fn flush_one(&self, db: &Database, pid: PageId, page: &Arc<RwLock<HeapPage>>) -> Result<()> {
        if page.read().dirtied_by().is_none() {
            return Ok(());
        }
        let file = db.catalog().file(pid.table())?;
        file.write_page(&page.read())?;
        self.stats.flushes.fetch_add(1, Ordering::Relaxed);
        page.write().mark_dirty(None);
        Ok(())
    }

    /// Drop a page from the cache without flushing it, dirty or not.
    /// Whatever it held that was not on disk is gone.
    pub fn discard_page(&self, pid: PageId) {
        self.cache.lock().remove(pid);
    }

    /// Release `txn`'s lock on one page before the transaction ends.
    ///
    /// This breaks two-phase locking, which is why it carries the name it
    /// does. Safe only when the caller knows `txn` never read or wrote the
    /// page's contents.
    pub fn unsafe_release_page(&self, txn: TransactionId, pid: PageId) {
        self.lock_manager.release(txn, pid);
    }

    /// Whether `txn` currently holds a lock of either mode on `pid`.
    pub fn holds_lock(&self, txn: TransactionId, pid: PageId) -> bool {
        self.lock_manager.holds(txn, pid)
    }

    /// Number of pages currently cached.
    pub fn cached_pages(&self) -> usize {
        self.cache.lock().pages.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use crate::storage::heap_file::HeapFile;
    use crate::storage::heap_page::int_tuple;
    use crate::storage::tuple::{FieldType, TupleDesc};
    use tempfile::{tempdir, TempDir};

    fn two_int_desc() -> TupleDesc {
        TupleDesc::new(&[FieldType::Int, FieldType::Int])
    }

    /// Register a table backed by a fresh file with `pages` zeroed pages.
    fn make_table(db: &Database, dir: &TempDir, name: &str, pages: u32) -> TableId {
        let desc = two_int_desc();
        let file = HeapFile::open(dir.path().join(format!("{name}.dat")), desc.clone()).unwrap();
        for page_no in 0..pages {
            let pid = PageId::new(file.id(), page_no);
            let page = HeapPage::parse(pid, &HeapPage::empty_page_data(), desc.clone()).unwrap();
            file.write_page(&page).unwrap();
        }
        let id = file.id();
        db.catalog().add_table(Arc::new(file), name);
        id
    }

    #[test]
    fn test_get_page_hits_cache() {
        let dir = tempdir().unwrap();
        let db = Database::new(4);
        let table = make_table(&db, &dir, "t", 1);
        let txn = TransactionId::new();
        let pid = PageId::new(table, 0);

        let first = db
            .buffer_pool()
            .get_page(&db, txn, pid, Permissions::ReadOnly)
            .unwrap();
        let second = db
            .buffer_pool()
            .get_page(&db, txn, pid, Permissions::ReadOnly)
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let snap = db.buffer_pool().stats().snapshot();
        assert_eq!(snap.cache_misses, 1);
        assert_eq!(snap.cache_hits, 1);
    }

    #[test]
    fn test_eviction_drops_oldest_clean_page() {
        let dir = tempdir().unwrap();
        let db = Database::new(2);
        let table = make_table(&db, &dir, "t", 3);
        let txn = TransactionId::new();

        for page_no in 0..3 {
            let pid = PageId::new(table, page_no);
            db.buffer_pool()
                .get_page(&db, txn, pid, Permissions::ReadOnly)
                .unwrap();
        }
        assert_eq!(db.buffer_pool().cached_pages(), 2);
        assert_eq!(db.buffer_pool().stats().snapshot().evictions, 1);

        // Page 0 was the oldest; refetching it is a miss.
        let before = db.buffer_pool().stats().snapshot().cache_misses;
        db.buffer_pool()
            .get_page(&db, txn, PageId::new(table, 0), Permissions::ReadOnly)
            .unwrap();
        assert_eq!(db.buffer_pool().stats().snapshot().cache_misses, before + 1);
    }

    #[test]
    fn test_all_dirty_pool_refuses_eviction() {
        let dir = tempdir().unwrap();
        let db = Database::new(2);
        let a = make_table(&db, &dir, "a", 1);
        let b = make_table(&db, &dir, "b", 1);
        let c = make_table(&db, &dir, "c", 1);
        let txn = TransactionId::new();

        db.buffer_pool()
            .insert_tuple(&db, txn, a, int_tuple(&two_int_desc(), &[1, 1]))
            .unwrap();
        db.buffer_pool()
            .insert_tuple(&db, txn, b, int_tuple(&two_int_desc(), &[2, 2]))
            .unwrap();

        // Both frames are dirty; a third page has nowhere to go.
        assert!(matches!(
            db.buffer_pool()
                .get_page(&db, txn, PageId::new(c, 0), Permissions::ReadOnly),
            Err(Error::BufferFull)
        ));
    }

    #[test]
    fn test_insert_marks_page_dirty() {
        let dir = tempdir().unwrap();
        let db = Database::new(4);
        let table = make_table(&db, &dir, "t", 1);
        let txn = TransactionId::new();

        db.buffer_pool()
            .insert_tuple(&db, txn, table, int_tuple(&two_int_desc(), &[5, 6]))
            .unwrap();

        let page = db
            .buffer_pool()
            .get_page(&db, txn, PageId::new(table, 0), Permissions::ReadOnly)
            .unwrap();
        assert_eq!(page.read().dirtied_by(), Some(txn));
    }

    #[test]
    fn test_flush_pages_cleans_only_that_transaction() {
        let dir = tempdir().unwrap();
        let db = Database::new(4);
        let a = make_table(&db, &dir, "a", 1);
        let b = make_table(&db, &dir, "b", 1);
        let (t1, t2) = (TransactionId::new(), TransactionId::new());

        db.buffer_pool()
            .insert_tuple(&db, t1, a, int_tuple(&two_int_desc(), &[1, 1]))
            .unwrap();
        db.buffer_pool()
            .insert_tuple(&db, t2, b, int_tuple(&two_int_desc(), &[2, 2]))
            .unwrap();

        db.buffer_pool().flush_pages(&db, t1).unwrap();

        let page_a = db
            .buffer_pool()
            .get_page(&db, t1, PageId::new(a, 0), Permissions::ReadOnly)
            .unwrap();
        let page_b = db
            .buffer_pool()
            .get_page(&db, t2, PageId::new(b, 0), Permissions::ReadOnly)
            .unwrap();
        assert_eq!(page_a.read().dirtied_by(), None);
        assert_eq!(page_b.read().dirtied_by(), Some(t2));
    }

    #[test]
    fn test_flush_all_then_discard_survives() {
        let dir = tempdir().unwrap();
        let db = Database::new(4);
        let table = make_table(&db, &dir, "t", 1);
        let txn = TransactionId::new();
        let pid = PageId::new(table, 0);

        db.buffer_pool()
            .insert_tuple(&db, txn, table, int_tuple(&two_int_desc(), &[9, 9]))
            .unwrap();
        db.buffer_pool().flush_all_pages(&db).unwrap();
        db.buffer_pool().discard_page(pid);
        assert_eq!(db.buffer_pool().cached_pages(), 0);

        // The flushed record is still on disk.
        let page = db
            .buffer_pool()
            .get_page(&db, txn, pid, Permissions::ReadOnly)
            .unwrap();
        assert_eq!(page.read().iter().count(), 1);
    }

    #[test]
    fn test_unsafe_release_drops_lock() {
        let dir = tempdir().unwrap();
        let db = Database::new(4);
        let table = make_table(&db, &dir, "t", 1);
        let txn = TransactionId::new();
        let pid = PageId::new(table, 0);

        db.buffer_pool()
            .get_page(&db, txn, pid, Permissions::ReadOnly)
            .unwrap();
        assert!(db.buffer_pool().holds_lock(txn, pid));
        db.buffer_pool().unsafe_release_page(txn, pid);
        assert!(!db.buffer_pool().holds_lock(txn, pid));
    }
}
