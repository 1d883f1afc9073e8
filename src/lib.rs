//! relstore - the storage and concurrency core of a single-node
//! relational engine.
//!
//! # Architecture
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                          relstore                             │
//! ├───────────────────────────────────────────────────────────────┤
//! │  ┌───────────────────────────────────────────────────────┐   │
//! │  │              Database (database.rs)                    │   │
//! │  │            Catalog + BufferPool context                │   │
//! │  └───────────────────────────────────────────────────────┘   │
//! │                             ↓                                 │
//! │  ┌───────────────────────────────────────────────────────┐   │
//! │  │            Buffer Layer (buffer/)                      │   │
//! │  │   BufferPool (no-steal cache) + LockManager (strict    │   │
//! │  │   2PL, wait-for-graph deadlock detection) + Stats      │   │
//! │  └───────────────────────────────────────────────────────┘   │
//! │                             ↓                                 │
//! │  ┌───────────────────────────────────────────────────────┐   │
//! │  │           Storage Layer (storage/)                     │   │
//! │  │   HeapFile + slotted HeapPage + Tuple/TupleDesc +      │   │
//! │  │   Catalog                                              │   │
//! │  └───────────────────────────────────────────────────────┘   │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (PageId, TransactionId, Error, config)
//! - [`storage`] - Heap files, slotted pages, tuples, and the catalog
//! - [`buffer`] - The buffer pool and page-level lock manager
//! - [`database`] - The instance context tying catalog and pool together
//!
//! # Quick Start
//! ```no_run
//! use std::sync::Arc;
//! use relstore::{Database, Field, FieldType, HeapFile};
//! use relstore::{Tuple, TupleDesc, TransactionId};
//!
//! let db = Database::default();
//! let desc = TupleDesc::new(&[FieldType::Int, FieldType::Int]);
//! let file = Arc::new(HeapFile::open("users.dat", desc.clone()).unwrap());
//! let table = file.id();
//! db.catalog().add_table(file, "users");
//!
//! let txn = TransactionId::new();
//! let row = Tuple::new(desc, vec![Field::Int(1), Field::Int(42)]).unwrap();
//! db.buffer_pool().insert_tuple(&db, txn, table, row).unwrap();
//! db.buffer_pool().transaction_complete(&db, txn, true).unwrap();
//! ```

pub mod buffer;
pub mod common;
pub mod database;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::config::{page_size, DEFAULT_PAGE_SIZE, DEFAULT_POOL_PAGES};
pub use common::{Error, PageId, Permissions, Result, TableId, TransactionId};

pub use buffer::{BufferPool, BufferPoolStats, LockManager, LockMode, StatsSnapshot};
pub use database::Database;
pub use storage::{
    Catalog, Field, FieldType, HeapFile, HeapFileScan, HeapPage, RecordId, Tuple, TupleDesc,
};
