//! Page and table identifier types.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

/// Identifies one table (equivalently, one heap file).
///
/// Fresh ids are drawn from a process-wide counter so that two heap files
/// can never collide, regardless of where their backing files live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(pub u32);

static NEXT_TABLE_ID: AtomicU32 = AtomicU32::new(0);

impl TableId {
    /// Allocate a table id no other table in this process has.
    pub fn fresh() -> Self {
        TableId(NEXT_TABLE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Table({})", self.0)
    }
}

/// Identifies a page: which table's file it lives in and where.
///
/// This one value is both the buffer-pool cache key and the lock-manager
/// key, so the two maps can never disagree about page identity.
///
/// # Example
/// ```
/// use relstore::{PageId, TableId};
///
/// let pid = PageId::new(TableId(0), 42);
/// assert_eq!(pid.page_no(), 42);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId {
    table: TableId,
    page_no: u32,
}

impl PageId {
    /// Create a new PageId.
    #[inline]
    pub fn new(table: TableId, page_no: u32) -> Self {
        PageId { table, page_no }
    }

    /// The table whose heap file holds this page.
    #[inline]
    pub fn table(&self) -> TableId {
        self.table
    }

    /// Zero-based page number within the table's file.
    #[inline]
    pub fn page_no(&self) -> u32 {
        self.page_no
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Page({}.{})", self.table.0, self.page_no)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_id_accessors() {
        let pid = PageId::new(TableId(3), 42);
        assert_eq!(pid.table(), TableId(3));
        assert_eq!(pid.page_no(), 42);
    }

    #[test]
    fn test_page_id_equality() {
        assert_eq!(PageId::new(TableId(1), 2), PageId::new(TableId(1), 2));
        assert_ne!(PageId::new(TableId(1), 2), PageId::new(TableId(1), 3));
        assert_ne!(PageId::new(TableId(1), 2), PageId::new(TableId(2), 2));
    }

    #[test]
    fn test_page_id_ordering() {
        // Ordered by table first, then page number.
        assert!(PageId::new(TableId(0), 9) < PageId::new(TableId(1), 0));
        assert!(PageId::new(TableId(1), 1) < PageId::new(TableId(1), 2));
    }

    #[test]
    fn test_table_id_fresh_unique() {
        assert_ne!(TableId::fresh(), TableId::fresh());
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", PageId::new(TableId(3), 7)), "Page(3.7)");
        assert_eq!(format!("{}", TableId(3)), "Table(3)");
    }
}
