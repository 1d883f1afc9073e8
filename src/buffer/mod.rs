//! Page caching and concurrency control: the buffer pool, the page lock
//! manager behind it, and pool statistics.

pub mod buffer_pool;
pub mod lock_manager;
pub mod stats;

pub use buffer_pool::BufferPool;
pub use lock_manager::{LockManager, LockMode};
pub use stats::{BufferPoolStats, StatsSnapshot};
