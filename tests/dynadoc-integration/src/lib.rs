//! End-to-end tests for dynadoc.
//!
//! Every test drives a [`Table`] over a fresh [`MemoryStore`], so the whole
//! path is exercised: codec, expression builder, request assembly and the
//! store's own expression evaluation.
//!
//! ```text
//! RUST_LOG=dynadoc_core=debug cargo test -p dynadoc-integration
//! ```

use std::collections::BTreeMap;
use std::sync::Once;

use dynadoc_core::{DynadocConfig, Item, Table, TableSchema, Value};
use dynadoc_memory::MemoryStore;

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Generate a unique table name for a test.
#[must_use]
pub fn test_table_name(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().to_string()[..8].to_owned();
    format!("test-{prefix}-{id}")
}

/// Create a table on `store` and return a client for it.
#[must_use]
pub fn create_table(store: &MemoryStore, prefix: &str, schema: TableSchema) -> Table<MemoryStore> {
    create_table_with_config(store, prefix, schema, DynadocConfig::default())
}

/// Create a table on `store` and return a client using `config`.
#[must_use]
pub fn create_table_with_config(
    store: &MemoryStore,
    prefix: &str,
    schema: TableSchema,
    config: DynadocConfig,
) -> Table<MemoryStore> {
    init_tracing();

    let name = test_table_name(prefix);
    store
        .create_table(&name, &schema)
        .unwrap_or_else(|e| panic!("failed to create table {name}: {e}"));
    Table::with_config(store.clone(), name, schema, config)
}

/// Build an item from field/value pairs.
#[must_use]
pub fn item<const N: usize>(fields: [(&str, Value); N]) -> Item {
    fields
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v))
        .collect::<BTreeMap<_, _>>()
}

/// Convert a JSON literal into criteria for conditions, ranges and filters.
#[must_use]
pub fn criteria(json: &serde_json::Value) -> Value {
    Value::from_json(json).unwrap_or_else(|e| panic!("bad criteria {json}: {e}"))
}

mod test_batch;
mod test_concurrency;
mod test_conditional;
mod test_config;
mod test_crud;
mod test_query;
mod test_records;
mod test_update;
