//! Common types and utilities shared across relstore.
//!
//! This module contains fundamental primitives used throughout the codebase:
//! - Configuration (page size, pool capacity defaults)
//! - Error types
//! - Identifiers (PageId, TableId, TransactionId)
//! - Access permissions

pub mod config;
pub mod error;
mod page_id;
mod permissions;
mod transaction_id;

pub use error::{Error, Result};
pub use page_id::{PageId, TableId};
pub use permissions::Permissions;
pub use transaction_id::TransactionId;
