//! Access permissions requested on a page.

use crate::buffer::LockMode;

/// What a caller intends to do with a page it fetches.
///
/// The buffer pool maps this to a lock mode before serving the page:
/// `ReadOnly` acquires a shared lock, `ReadWrite` an exclusive one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permissions {
    ReadOnly,
    ReadWrite,
}

impl Permissions {
    /// The lock mode this permission level requires.
    pub fn lock_mode(self) -> LockMode {
        match self {
            Permissions::ReadOnly => LockMode::Shared,
            Permissions::ReadWrite => LockMode::Exclusive,
        }
    }
}
