//! Transaction identifier type.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies one transaction.
///
/// A transaction id is pure identity: it carries no state of its own. All
/// per-transaction state (held locks, dirtied pages) lives in the lock
/// manager and buffer pool, keyed by this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId(u64);

static NEXT_TXN_ID: AtomicU64 = AtomicU64::new(0);

impl TransactionId {
    /// Start a new transaction: allocate an id no other transaction has.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        TransactionId(NEXT_TXN_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Txn({})", self.0)
    }
}
