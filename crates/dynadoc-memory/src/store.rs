//! [`Transport`] implementation backed by [`MemoryProvider`].

use std::sync::Arc;

use tracing::info;

use dynadoc_core::{TableSchema, Transport, TransportFuture};
use dynadoc_model::StoreError;
use dynadoc_model::input::{
    BatchGetItemInput, BatchWriteItemInput, DeleteItemInput, GetItemInput, PutItemInput,
    QueryInput, ScanInput, UpdateItemInput,
};
use dynadoc_model::output::{
    BatchGetItemOutput, BatchWriteItemOutput, DeleteItemOutput, GetItemOutput, PutItemOutput,
    QueryOutput, ScanOutput, UpdateItemOutput,
};

use crate::provider::MemoryProvider;
use crate::state::MemoryTable;
use crate::storage::KeySchema;

/// An in-process store. Clones share the same tables.
///
/// ```
/// use dynadoc_core::TableSchema;
/// use dynadoc_memory::MemoryStore;
///
/// let store = MemoryStore::new();
/// store.create_table("users", &TableSchema::new("id")).unwrap();
/// assert!(store.create_table("users", &TableSchema::new("id")).is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    provider: Arc<MemoryProvider>,
}

impl MemoryStore {
    /// A store with no tables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table and its secondary indexes.
    pub fn create_table(&self, name: &str, schema: &TableSchema) -> Result<(), StoreError> {
        let mut table = MemoryTable::new(
            name,
            KeySchema {
                partition_key: schema.partition_key.clone(),
                sort_key: schema.sort_key.clone(),
            },
        );
        for index in &schema.indexes {
            table = table.with_index(
                index.name.clone(),
                KeySchema {
                    partition_key: index.partition_key.clone(),
                    sort_key: index.sort_key.clone(),
                },
            );
        }
        self.provider.state().create_table(table)?;
        info!(table = name, indexes = schema.indexes.len(), "created table");
        Ok(())
    }

    /// Drop a table and its items.
    pub fn delete_table(&self, name: &str) -> Result<(), StoreError> {
        self.provider.state().delete_table(name).map(drop)
    }

    /// Number of items in a table.
    pub fn item_count(&self, name: &str) -> Result<u64, StoreError> {
        Ok(self.provider.state().require_table(name)?.storage.item_count())
    }

    /// Hand back the next `n` batch entries as unprocessed.
    #[must_use]
    pub fn with_unprocessed_budget(self, n: usize) -> Self {
        self.set_unprocessed_budget(n);
        self
    }

    /// Hand back the next `n` batch entries as unprocessed.
    pub fn set_unprocessed_budget(&self, n: usize) {
        self.provider.set_unprocessed_budget(n);
    }

    /// The provider serving this store's requests.
    #[must_use]
    pub fn provider(&self) -> &MemoryProvider {
        &self.provider
    }
}

impl Transport for MemoryStore {
    fn get_item(&self, input: GetItemInput) -> TransportFuture<GetItemOutput> {
        let provider = Arc::clone(&self.provider);
        Box::pin(async move { provider.handle_get_item(input) })
    }

    fn put_item(&self, input: PutItemInput) -> TransportFuture<PutItemOutput> {
        let provider = Arc::clone(&self.provider);
        Box::pin(async move { provider.handle_put_item(input) })
    }

    fn update_item(&self, input: UpdateItemInput) -> TransportFuture<UpdateItemOutput> {
        let provider = Arc::clone(&self.provider);
        Box::pin(async move { provider.handle_update_item(input) })
    }

    fn delete_item(&self, input: DeleteItemInput) -> TransportFuture<DeleteItemOutput> {
        let provider = Arc::clone(&self.provider);
        Box::pin(async move { provider.handle_delete_item(input) })
    }

    fn query(&self, input: QueryInput) -> TransportFuture<QueryOutput> {
        let provider = Arc::clone(&self.provider);
        Box::pin(async move { provider.handle_query(input) })
    }

    fn scan(&self, input: ScanInput) -> TransportFuture<ScanOutput> {
        let provider = Arc::clone(&self.provider);
        Box::pin(async move { provider.handle_scan(input) })
    }

    fn batch_get_item(&self, input: BatchGetItemInput) -> TransportFuture<BatchGetItemOutput> {
        let provider = Arc::clone(&self.provider);
        Box::pin(async move { provider.handle_batch_get_item(input) })
    }

    fn batch_write_item(
        &self,
        input: BatchWriteItemInput,
    ) -> TransportFuture<BatchWriteItemOutput> {
        let provider = Arc::clone(&self.provider);
        Box::pin(async move { provider.handle_batch_write_item(input) })
    }
}
