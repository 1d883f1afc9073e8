//! Page-level lock manager: strict two-phase locking with deadlock
//! detection.
//!
//! Transactions take shared or exclusive locks on whole pages and keep them
//! until commit or abort. Conflicting requests block on a condition
//! variable. Before blocking, a requester records wait-for edges to the
//! current holders; a cycle in that graph means deadlock, and the requester
//! that completed the cycle is the victim - its request fails with
//! [`Error::TransactionAborted`] and its edges are removed so the remaining
//! transactions can proceed.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::common::{Error, PageId, Result, TransactionId};

/// How a page is locked.
///
/// Any number of transactions may hold `Shared` together; `Exclusive` is
/// held by exactly one and conflicts with everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Shared,
    Exclusive,
}

struct LockState {
    mode: LockMode,
    holders: HashSet<TransactionId>,
}

#[derive(Default)]
struct LockTables {
    /// Per-page lock state. Absent means unlocked.
    locks: HashMap<PageId, LockState>,
    /// Pages each transaction currently holds locks on.
    held: HashMap<TransactionId, HashSet<PageId>>,
    /// Wait-for edges: waiter to the holders blocking it.
    wait_for: HashMap<TransactionId, HashSet<TransactionId>>,
}

enum Attempt {
    Granted,
    Blocked(HashSet<TransactionId>),
}

/// All lock state lives behind one mutex; waiters park on the condition
/// variable and re-evaluate their request on every wakeup. The wait is
/// bounded so a missed notification degrades to a 100ms re-poll rather
/// than a hang.
pub struct LockManager {
    tables: Mutex<LockTables>,
    wakeup: Condvar,
}

const WAIT_POLL: Duration = Duration::from_millis(100);

impl Default for LockManager {
    fn default() -> Self {
        Self::new()
    }
}

impl LockManager {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(LockTables::default()),
            wakeup: Condvar::new(),
        }
    }

    /// Acquire a lock on `pid` for `txn`, blocking until it can be granted.
    ///
    /// Re-requesting a mode already held (or a shared lock while holding
    /// the exclusive one) returns immediately without changing anything.
    /// A shared lock held alone upgrades in place when exclusive is asked.
    ///
    /// # Errors
    /// [`Error::TransactionAborted`] if granting would deadlock; the caller
    /// must abort `txn`. Its other locks stay held until `release_all`.
    pub fn acquire(&self, txn: TransactionId, pid: PageId, mode: LockMode) -> Result<()> {
        let mut tables = self.tables.lock();
        loop {
            match Self::try_grant(&mut tables, txn, pid, mode) {
                Attempt::Granted => {
                    tables.wait_for.remove(&txn);
                    return Ok(());
                }
                Attempt::Blocked(holders) => {
                    let edges: HashSet<_> =
                        holders.iter().copied().filter(|h| *h != txn).collect();
                    tables.wait_for.insert(txn, edges);
                    if Self::has_cycle(&tables) {
                        tables.wait_for.remove(&txn);
                        self.wakeup.notify_all();
                        return Err(Error::TransactionAborted);
                    }
                    let _timed_out = self.wakeup.wait_for(&mut tables, WAIT_POLL);
                }
            }
        }
    }

    fn try_grant(
        tables: &mut LockTables,
        txn: TransactionId,
        pid: PageId,
        mode: LockMode,
    ) -> Attempt {
        let Some(state) = tables.locks.get_mut(&pid) else {
            tables.locks.insert(
                pid,
                LockState {
                    mode,
                    holders: HashSet::from([txn]),
                },
            );
            tables.held.entry(txn).or_default().insert(pid);
            return Attempt::Granted;
        };

        if state.holders.contains(&txn) {
            return match (state.mode, mode) {
                // Already held at this strength or stronger.
                (LockMode::Exclusive, _) | (LockMode::Shared, LockMode::Shared) => {
                    Attempt::Granted
                }
                (LockMode::Shared, LockMode::Exclusive) => {
                    if state.holders.len() == 1 {
                        state.mode = LockMode::Exclusive;
                        Attempt::Granted
                    } else {
                        // Upgrade waits for the other sharers to finish.
                        Attempt::Blocked(state.holders.clone())
                    }
                }
            };
        }

        if state.mode == LockMode::Shared && mode == LockMode::Shared {
            state.holders.insert(txn);
            tables.held.entry(txn).or_default().insert(pid);
            return Attempt::Granted;
        }
        Attempt::Blocked(state.holders.clone())
    }

    /// Whether the wait-for graph contains any cycle. Plain DFS with a
    /// recursion-stack set; the graph is small (one node per blocked
    /// transaction).
    fn has_cycle(tables: &LockTables) -> bool {
        let mut visited = HashSet::new();
        let mut in_progress = HashSet::new();
        for &start in tables.wait_for.keys() {
            if !visited.contains(&start)
                && Self::dfs(tables, start, &mut visited, &mut in_progress)
            {
                return true;
            }
        }
        false
    }

    fn dfs(
        tables: &LockTables,
        node: TransactionId,
        visited: &mut HashSet<TransactionId>,
        in_progress: &mut HashSet<TransactionId>,
    ) -> bool {
        visited.insert(node);
        in_progress.insert(node);
        if let Some(edges) = tables.wait_for.get(&node) {
            for &next in edges {
                if in_progress.contains(&next) {
                    return true;
                }
                if !visited.contains(&next) && Self::dfs(tables, next, visited, in_progress) {
                    return true;
                }
            }
        }
        in_progress.remove(&node);
        false
    }

    /// Release `txn`'s lock on `pid`, if it holds one. Waiters are woken to
    /// retry.
    pub fn release(&self, txn: TransactionId, pid: PageId) {
        let mut tables = self.tables.lock();
        Self::release_one(&mut tables, txn, pid);
        Self::drop_edges_to(&mut tables, txn);
        self.wakeup.notify_all();
    }

    /// Release every lock `txn` holds. Called once at commit or abort.
    pub fn release_all(&self, txn: TransactionId) {
        let mut tables = self.tables.lock();
        if let Some(pages) = tables.held.remove(&txn) {
            for pid in pages {
                if let Some(state) = tables.locks.get_mut(&pid) {
                    state.holders.remove(&txn);
                    if state.holders.is_empty() {
                        tables.locks.remove(&pid);
                    }
                }
            }
        }
        tables.wait_for.remove(&txn);
        Self::drop_edges_to(&mut tables, txn);
        self.wakeup.notify_all();
    }

    fn release_one(tables: &mut LockTables, txn: TransactionId, pid: PageId) {
        if let Some(state) = tables.locks.get_mut(&pid) {
            state.holders.remove(&txn);
            if state.holders.is_empty() {
                tables.locks.remove(&pid);
            }
        }
        if let Some(pages) = tables.held.get_mut(&txn) {
            pages.remove(&pid);
            if pages.is_empty() {
                tables.held.remove(&txn);
            }
        }
    }

    /// Edges pointing at a transaction that just released something are
    /// stale; waiters rebuild their own edges when they re-check.
    fn drop_edges_to(tables: &mut LockTables, txn: TransactionId) {
        for edges in tables.wait_for.values_mut() {
            edges.remove(&txn);
        }
    }

    /// Whether `txn` holds a lock (of either mode) on `pid`.
    pub fn holds(&self, txn: TransactionId, pid: PageId) -> bool {
        self.tables
            .lock()
            .held
            .get(&txn)
            .is_some_and(|pages| pages.contains(&pid))
    }
}
