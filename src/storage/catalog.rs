//! Catalog - the registry of tables known to a database instance.
//!
//! Maps table ids and table names to their backing [`HeapFile`]s. The
//! catalog owns nothing on disk; it is rebuilt by re-registering tables
//! when a database starts up.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::common::{Error, Result, TableId};
use crate::storage::heap_file::HeapFile;
use crate::storage::tuple::TupleDesc;

#[derive(Default)]
struct CatalogInner {
    tables: HashMap<TableId, Entry>,
    by_name: HashMap<String, TableId>,
}

struct Entry {
    name: String,
    file: Arc<HeapFile>,
}

/// Thread-safe table registry.
#[derive(Default)]
pub struct Catalog {
    inner: RwLock<CatalogInner>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `file` under `name`.
    ///
    /// Re-registering an existing name rebinds it to the new file; the old
    /// binding (and its id) is dropped. Registering a file whose id is
    /// already present replaces that entry.
    pub fn add_table(&self, file: Arc<HeapFile>, name: impl Into<String>) {
        let name = name.into();
        let id = file.id();
        let mut inner = self.inner.write();
        if let Some(old_id) = inner.by_name.insert(name.clone(), id) {
            if old_id != id {
                inner.tables.remove(&old_id);
            }
        }
        if let Some(old) = inner.tables.insert(id, Entry { name: name.clone(), file }) {
            if old.name != name {
                inner.by_name.remove(&old.name);
            }
        }
    }

    /// The heap file backing table `id`.
    ///
    /// # Errors
    /// [`Error::UnknownTable`] if no table with that id is registered.
    pub fn file(&self, id: TableId) -> Result<Arc<HeapFile>> {
        self.inner
            .read()
            .tables
            .get(&id)
            .map(|entry| Arc::clone(&entry.file))
            .ok_or(Error::UnknownTable(id))
    }

    /// The schema of table `id`.
    pub fn tuple_desc(&self, id: TableId) -> Result<TupleDesc> {
        Ok(self.file(id)?.desc().clone())
    }

    /// The registered name of table `id`.
    pub fn table_name(&self, id: TableId) -> Result<String> {
        self.inner
            .read()
            .tables
            .get(&id)
            .map(|entry| entry.name.clone())
            .ok_or(Error::UnknownTable(id))
    }

    /// Look a table up by name.
    pub fn table_id(&self, name: &str) -> Option<TableId> {
        self.inner.read().by_name.get(name).copied()
    }

    /// Ids of every registered table, in no particular order.
    pub fn table_ids(&self) -> Vec<TableId> {
        self.inner.read().tables.keys().copied().collect()
    }

    /// Drop every registration.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.tables.clear();
        inner.by_name.clear();
    }
}
