//! Table registry of the in-memory store.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use dynadoc_model::StoreError;

use crate::storage::{KeySchema, TableStorage};

/// All tables keyed by name.
#[derive(Debug, Default)]
pub struct MemoryState {
    tables: DashMap<String, Arc<MemoryTable>>,
}

impl MemoryState {
    /// Empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a table by name.
    #[must_use]
    pub fn get_table(&self, name: &str) -> Option<Arc<MemoryTable>> {
        self.tables.get(name).map(|r| Arc::clone(r.value()))
    }

    /// Get a table or fail with `ResourceNotFoundException`.
    pub fn require_table(&self, name: &str) -> Result<Arc<MemoryTable>, StoreError> {
        self.get_table(name).ok_or_else(|| {
            StoreError::resource_not_found(format!(
                "Requested resource not found: Table: {name} not found"
            ))
        })
    }

    /// Register a table; fails with `ResourceInUseException` if the name is taken.
    pub fn create_table(&self, table: MemoryTable) -> Result<Arc<MemoryTable>, StoreError> {
        match self.tables.entry(table.name.clone()) {
            Entry::Occupied(e) => Err(StoreError::resource_in_use(format!(
                "Table already exists: {}",
                e.key()
            ))),
            Entry::Vacant(e) => {
                let table = Arc::new(table);
                e.insert(Arc::clone(&table));
                Ok(table)
            }
        }
    }

    /// Remove a table.
    pub fn delete_table(&self, name: &str) -> Result<Arc<MemoryTable>, StoreError> {
        self.tables.remove(name).map(|(_, t)| t).ok_or_else(|| {
            StoreError::resource_not_found(format!(
                "Requested resource not found: Table: {name} not found"
            ))
        })
    }

    /// Sorted table names.
    #[must_use]
    pub fn list_table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.iter().map(|r| r.key().clone()).collect();
        names.sort();
        names
    }
}

/// One table: its storage and secondary index layouts.
#[derive(Debug)]
pub struct MemoryTable {
    /// Table name.
    pub name: String,
    /// Item storage.
    pub storage: TableStorage,
    /// Secondary indexes by name.
    pub indexes: HashMap<String, KeySchema>,
}

impl MemoryTable {
    /// A table with no items.
    #[must_use]
    pub fn new(name: impl Into<String>, key_schema: KeySchema) -> Self {
        Self {
            name: name.into(),
            storage: TableStorage::new(key_schema),
            indexes: HashMap::new(),
        }
    }

    /// Add a secondary index.
    #[must_use]
    pub fn with_index(mut self, name: impl Into<String>, key_schema: KeySchema) -> Self {
        self.indexes.insert(name.into(), key_schema);
        self
    }

    /// Key schema of the table.
    #[must_use]
    pub fn key_schema(&self) -> &KeySchema {
        self.storage.key_schema()
    }

    /// Look up an index or fail with a validation error.
    pub fn require_index(&self, name: &str) -> Result<&KeySchema, StoreError> {
        self.indexes.get(name).ok_or_else(|| {
            StoreError::validation(format!(
                "The table does not have the specified index: {name}"
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use dynadoc_model::StoreErrorCode;

    use super::*;

    fn schema() -> KeySchema {
        KeySchema {
            partition_key: "id".to_owned(),
            sort_key: None,
        }
    }

    #[test]
    fn test_should_reject_duplicate_table() {
        let state = MemoryState::new();
        state.create_table(MemoryTable::new("users", schema())).unwrap();
        let err = state
            .create_table(MemoryTable::new("users", schema()))
            .unwrap_err();
        assert_eq!(err.code, StoreErrorCode::ResourceInUseException);
    }

    #[test]
    fn test_should_report_missing_table() {
        let state = MemoryState::new();
        let err = state.require_table("nope").unwrap_err();
        assert_eq!(err.code, StoreErrorCode::ResourceNotFoundException);
        assert!(err.message.contains("nope"));
    }

    #[test]
    fn test_should_list_and_delete_tables() {
        let state = MemoryState::new();
        state.create_table(MemoryTable::new("b", schema())).unwrap();
        state.create_table(MemoryTable::new("a", schema())).unwrap();
        assert_eq!(state.list_table_names(), ["a", "b"]);
        state.delete_table("a").unwrap();
        assert_eq!(state.list_table_names(), ["b"]);
        assert!(state.delete_table("a").is_err());
    }
}
