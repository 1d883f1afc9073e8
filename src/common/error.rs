//! Error types for relstore.

use crate::common::{PageId, TableId};

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in relstore.
///
/// One crate-wide enum keeps error handling consistent across the storage
/// and buffer layers. The variants fall into four groups:
/// - transaction aborts (deadlock detection),
/// - resource exhaustion (no evictable page),
/// - integrity violations (caller misuse, never retried),
/// - I/O failures (propagated, never swallowed).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The calling transaction was chosen as a deadlock victim and must
    /// release its locks and discard its in-progress work.
    #[error("transaction aborted: deadlock detected")]
    TransactionAborted,

    /// The buffer pool is at capacity and every cached page is dirty, so
    /// nothing can be evicted without losing uncommitted writes.
    #[error("buffer pool full: no clean page to evict")]
    BufferFull,

    /// A tuple's schema does not match the page it was inserted into.
    #[error("tuple schema does not match page schema")]
    SchemaMismatch,

    /// Insert attempted on a page with no free slot.
    #[error("page {0} is full")]
    PageFull(PageId),

    /// The tuple carries no stored location (never inserted, or deleted).
    #[error("tuple has no record id")]
    MissingRecordId,

    /// A slot reference names the wrong page, an out-of-range slot, or a
    /// slot that is already free.
    #[error("invalid slot {slot} on {page}")]
    InvalidSlot { page: PageId, slot: usize },

    /// Read of a page at or beyond the end of its heap file.
    #[error("{0} is out of range for its heap file")]
    PageOutOfRange(PageId),

    /// Catalog lookup for an unregistered table.
    #[error("no such table: {0}")]
    UnknownTable(TableId),

    /// I/O error from the underlying heap file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
