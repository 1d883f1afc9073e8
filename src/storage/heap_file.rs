//! Heap file - the on-disk backing store of one table.
//!
//! A heap file is an unordered sequence of fixed-size [`HeapPage`]s stored
//! back to back in a single OS file. Page `n` lives at byte offset
//! `n * page_size()`. The file grows one page at a time when an insert
//! finds no free slot on any existing page.
//!
//! Raw page I/O (`read_page`, `write_page`) bypasses the buffer pool and
//! is intended for the pool itself; record-level operations (`insert_tuple`,
//! `delete_tuple`, `scan`) go through the pool so that pages are locked,
//! cached, and dirty-tracked correctly.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::common::config::page_size;
use crate::common::{Error, PageId, Permissions, Result, TableId, TransactionId};
use crate::database::Database;
use crate::storage::heap_page::HeapPage;
use crate::storage::tuple::{Tuple, TupleDesc};

/// One table's pages on disk.
///
/// The file handle is shared behind a mutex: each page read or write seeks
/// and transfers under the lock, so concurrent transactions never interleave
/// partial transfers.
pub struct HeapFile {
    id: TableId,
    path: PathBuf,
    desc: TupleDesc,
    file: Mutex<File>,
}

impl HeapFile {
    /// Open (or create) the heap file at `path`.
    ///
    /// Each open gets a fresh table id; re-opening the same path in a new
    /// process yields the same data under a new id.
    pub fn open(path: impl AsRef<Path>, desc: TupleDesc) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;
        Ok(Self {
            id: TableId::fresh(),
            path,
            desc,
            file: Mutex::new(file),
        })
    }

    #[inline]
    pub fn id(&self) -> TableId {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn desc(&self) -> &TupleDesc {
        &self.desc
    }

    /// Number of whole pages currently in the file.
    pub fn page_count(&self) -> Result<u64> {
        let file = self.file.lock();
        Ok(file.metadata()?.len() / page_size() as u64)
    }

    /// Read page `pid` straight from disk.
    ///
    /// # Errors
    /// [`Error::PageOutOfRange`] if the page starts at or beyond the end of
    /// the file.
    pub fn read_page(&self, pid: PageId) -> Result<HeapPage> {
        let offset = u64::from(pid.page_no()) * page_size() as u64;
        let mut file = self.file.lock();
        if offset >= file.metadata()?.len() {
            return Err(Error::PageOutOfRange(pid));
        }
        let mut buf = vec![0u8; page_size()];
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(&mut buf)?;
        drop(file);
        HeapPage::parse(pid, &buf, self.desc.clone())
    }

    /// Write `page` to its slot in the file, extending the file if the page
    /// lies at the current end.
    pub fn write_page(&self, page: &HeapPage) -> Result<()> {
        let offset = u64::from(page.id().page_no()) * page_size() as u64;
        let data = page.serialize();
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(&data)?;
        Ok(())
    }

    /// Append one zeroed page and return its page number.
    fn append_empty_page(&self) -> Result<u32> {
        let data = HeapPage::empty_page_data();
        let mut file = self.file.lock();
        let page_no = (file.metadata()?.len() / page_size() as u64) as u32;
        file.seek(SeekFrom::End(0))?;
        file.write_all(&data)?;
        Ok(page_no)
    }

    /// Insert `tuple` into the first page with a free slot, appending a new
    /// page when every existing page is full. Returns the pages dirtied by
    /// the insert (always exactly one) so the buffer pool can mark them.
    ///
    /// New pages become visible in the file immediately: the append happens
    /// before the insert, so `page_count` reflects the growth even while the
    /// inserting transaction is still running.
    pub fn insert_tuple(
        &self,
        db: &Database,
        txn: TransactionId,
        tuple: Tuple,
    ) -> Result<Vec<Arc<RwLock<HeapPage>>>> {
        let mut page_no = 0u32;
        loop {
            // Page numbers are u32; a larger file cannot be addressed, so
            // the count saturates instead of wrapping.
            let count = u32::try_from(self.page_count()?).unwrap_or(u32::MAX);
            while page_no < count {
                let pid = PageId::new(self.id, page_no);
                let page = db
                    .buffer_pool()
                    .get_page(db, txn, pid, Permissions::ReadWrite)?;
                let mut guard = page.write();
                if guard.empty_slot_count() > 0 {
                    guard.insert_tuple(tuple)?;
                    drop(guard);
                    return Ok(vec![page]);
                }
                drop(guard);
                page_no += 1;
            }
            // All known pages are full. Grow the file by one page and try
            // that page on the next pass. Another transaction may win the
            // race for its slots, in which case the loop grows again.
            self.append_empty_page()?;
        }
    }

    /// Delete `tuple` from the page its record id names. Returns the page
    /// dirtied by the delete.
    ///
    /// # Errors
    /// [`Error::MissingRecordId`] if the tuple was never inserted;
    /// [`Error::InvalidSlot`] if the record id does not match a live slot.
    pub fn delete_tuple(
        &self,
        db: &Database,
        txn: TransactionId,
        tuple: &Tuple,
    ) -> Result<Arc<RwLock<HeapPage>>> {
        let rid = tuple.record_id().ok_or(Error::MissingRecordId)?;
        let page = db
            .buffer_pool()
            .get_page(db, txn, rid.page_id, Permissions::ReadWrite)?;
        page.write().delete_tuple(tuple)?;
        Ok(page)
    }

    /// Scan every live record in page order, slot order within a page.
    ///
    /// The scan is lazy: each page is fetched through the buffer pool (with
    /// a shared lock) only when the iterator reaches it, so a scan never
    /// needs more than one page's records in memory at a time.
    pub fn scan<'a>(&'a self, db: &'a Database, txn: TransactionId) -> HeapFileScan<'a> {
        HeapFileScan {
            file: self,
            db,
            txn,
            next_page: 0,
            buffered: Vec::new().into_iter(),
        }
    }
}

/// Lazy per-page iterator over a heap file's records.
pub struct HeapFileScan<'a> {
    file: &'a HeapFile,
    db: &'a Database,
    txn: TransactionId,
    next_page: u32,
    buffered: std::vec::IntoIter<Tuple>,
}

impl HeapFileScan<'_> {
    /// Restart the scan from the first page.
    pub fn rewind(&mut self) {
        self.next_page = 0;
        self.buffered = Vec::new().into_iter();
    }
}

impl Iterator for HeapFileScan<'_> {
    type Item = Result<Tuple>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(tuple) = self.buffered.next() {
                return Some(Ok(tuple));
            }
            let count = match self.file.page_count() {
                Ok(count) => count,
                Err(e) => return Some(Err(e)),
            };
            if u64::from(self.next_page) >= count {
                return None;
            }
            let pid = PageId::new(self.file.id, self.next_page);
            self.next_page += 1;
            let page = match self
                .db
                .buffer_pool()
                .get_page(self.db, self.txn, pid, Permissions::ReadOnly)
            {
                Ok(page) => page,
                Err(e) => return Some(Err(e)),
            };
            let tuples: Vec<Tuple> = page.read().iter().cloned().collect();
            self.buffered = tuples.into_iter();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::heap_page::int_tuple;
    use crate::storage::tuple::FieldType;
    use tempfile::tempdir;

    fn two_int_desc() -> TupleDesc {
        TupleDesc::new(&[FieldType::Int, FieldType::Int])
    }

    #[test]
    fn test_new_file_is_empty() {
        let dir = tempdir().unwrap();
        let file = HeapFile::open(dir.path().join("t.dat"), two_int_desc()).unwrap();
        assert_eq!(file.page_count().unwrap(), 0);
    }

    #[test]
    fn test_read_past_end_rejected() {
        let dir = tempdir().unwrap();
        let file = HeapFile::open(dir.path().join("t.dat"), two_int_desc()).unwrap();
        let pid = PageId::new(file.id(), 0);
        assert!(matches!(
            file.read_page(pid),
            Err(Error::PageOutOfRange(_))
        ));
    }

    #[test]
    fn test_write_then_read_page() {
        let dir = tempdir().unwrap();
        let desc = two_int_desc();
        let file = HeapFile::open(dir.path().join("t.dat"), desc.clone()).unwrap();

        let pid = PageId::new(file.id(), 0);
        let mut page = HeapPage::parse(pid, &HeapPage::empty_page_data(), desc.clone()).unwrap();
        page.insert_tuple(int_tuple(&desc, &[42, 99])).unwrap();
        file.write_page(&page).unwrap();

        assert_eq!(file.page_count().unwrap(), 1);
        let read_back = file.read_page(pid).unwrap();
        assert_eq!(read_back.iter().count(), 1);
        assert_eq!(read_back.serialize(), page.serialize());
    }

    #[test]
    fn test_write_extends_file() {
        let dir = tempdir().unwrap();
        let desc = two_int_desc();
        let file = HeapFile::open(dir.path().join("t.dat"), desc.clone()).unwrap();

        for page_no in 0..3 {
            let pid = PageId::new(file.id(), page_no);
            let page = HeapPage::parse(pid, &HeapPage::empty_page_data(), desc.clone()).unwrap();
            file.write_page(&page).unwrap();
        }
        assert_eq!(file.page_count().unwrap(), 3);
    }

    #[test]
    fn test_append_empty_page_numbers() {
        let dir = tempdir().unwrap();
        let file = HeapFile::open(dir.path().join("t.dat"), two_int_desc()).unwrap();
        assert_eq!(file.append_empty_page().unwrap(), 0);
        assert_eq!(file.append_empty_page().unwrap(), 1);
        assert_eq!(file.page_count().unwrap(), 2);
    }

    #[test]
    fn test_reopen_preserves_data() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.dat");
        let desc = two_int_desc();

        let first_page_no;
        {
            let file = HeapFile::open(&path, desc.clone()).unwrap();
            let pid = PageId::new(file.id(), 0);
            let mut page =
                HeapPage::parse(pid, &HeapPage::empty_page_data(), desc.clone()).unwrap();
            page.insert_tuple(int_tuple(&desc, &[1, 2])).unwrap();
            file.write_page(&page).unwrap();
            first_page_no = 0;
        }

        let file = HeapFile::open(&path, desc.clone()).unwrap();
        let pid = PageId::new(file.id(), first_page_no);
        let page = file.read_page(pid).unwrap();
        assert_eq!(page.iter().count(), 1);
    }
}
