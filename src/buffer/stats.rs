//! Buffer pool statistics tracking.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters maintained by the buffer pool.
///
/// All fields are atomic so concurrent transactions can bump them without
/// holding the cache lock. Everything uses `Ordering::Relaxed`: the
/// counters only need atomicity, not ordering with respect to each other.
#[derive(Debug, Default)]
pub struct BufferPoolStats {
    /// Page requests served from the cache.
    pub cache_hits: AtomicU64,

    /// Page requests that went to disk.
    pub cache_misses: AtomicU64,

    /// Clean pages evicted to make room.
    pub evictions: AtomicU64,

    /// Pages written back to their heap files.
    pub flushes: AtomicU64,

    /// Transactions completed with commit.
    pub commits: AtomicU64,

    /// Transactions completed with abort (including deadlock victims).
    pub aborts: AtomicU64,
}

impl BufferPoolStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache hit rate in `0.0..=1.0`; zero when nothing was requested yet.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.cache_hits.load(Ordering::Relaxed);
        let misses = self.cache_misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    /// Non-atomic copy for display and assertions.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
            commits: self.commits.load(Ordering::Relaxed),
            aborts: self.aborts.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.cache_hits.store(0, Ordering::Relaxed);
        self.cache_misses.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
        self.flushes.store(0, Ordering::Relaxed);
        self.commits.store(0, Ordering::Relaxed);
        self.aborts.store(0, Ordering::Relaxed);
    }
}

/// A point-in-time, non-atomic copy of [`BufferPoolStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub evictions: u64,
    pub flushes: u64,
    pub commits: u64,
    pub aborts: u64,
}

impl StatsSnapshot {
    pub fn hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stats {{ hits: {}, misses: {}, evictions: {}, flushes: {}, commits: {}, aborts: {}, hit_rate: {:.2}% }}",
            self.cache_hits,
            self.cache_misses,
            self.evictions,
            self.flushes,
            self.commits,
            self.aborts,
            self.hit_rate() * 100.0
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_start_at_zero() {
        let stats = BufferPoolStats::new();
        assert_eq!(stats.cache_hits.load(Ordering::Relaxed), 0);
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate() {
        let stats = BufferPoolStats::new();
        stats.cache_hits.fetch_add(7, Ordering::Relaxed);
        stats.cache_misses.fetch_add(3, Ordering::Relaxed);
        assert_eq!(stats.hit_rate(), 0.7);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.cache_hits, 7);
        assert_eq!(snapshot.hit_rate(), 0.7);
    }

    #[test]
    fn test_reset() {
        let stats = BufferPoolStats::new();
        stats.cache_hits.fetch_add(100, Ordering::Relaxed);
        stats.commits.fetch_add(2, Ordering::Relaxed);
        stats.reset();
        assert_eq!(stats.snapshot(), StatsSnapshot {
            cache_hits: 0,
            cache_misses: 0,
            evictions: 0,
            flushes: 0,
            commits: 0,
            aborts: 0,
        });
    }

    #[test]
    fn test_display() {
        let stats = BufferPoolStats::new();
        stats.cache_hits.fetch_add(80, Ordering::Relaxed);
        stats.cache_misses.fetch_add(20, Ordering::Relaxed);
        let display = format!("{}", stats.snapshot());
        assert!(display.contains("hits: 80"));
        assert!(display.contains("80.00%"));
    }
}
