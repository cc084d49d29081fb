//! Batch reads and writes, chunking and unprocessed entries.

#[cfg(test)]
mod tests {
    use dynadoc_core::{DynadocConfig, Error, Item, TableSchema, Value, WriteOp};
    use dynadoc_model::StoreErrorCode;
    use dynadoc_memory::MemoryStore;

    use crate::{create_table, create_table_with_config, item};

    fn products(n: usize) -> Vec<Item> {
        (0..n)
            .map(|i| {
                item([
                    ("sku", Value::from(format!("sku-{i}"))),
                    ("stock", Value::from(i)),
                ])
            })
            .collect()
    }

    fn keys(items: &[Item]) -> Vec<Item> {
        items
            .iter()
            .map(|i| item([("sku", i["sku"].clone())]))
            .collect()
    }

    #[tokio::test]
    async fn test_should_chunk_large_batch_writes() {
        let store = MemoryStore::new();
        let table = create_table(&store, "batch", TableSchema::new("sku"));
        let items = products(60);

        let report = table.batch_write(&items, &[]).await.unwrap();
        assert!(report.is_complete());
        assert_eq!(report.written, 60);
        assert_eq!(store.item_count(table.name()).unwrap(), 60);

        let report = table.batch_write(&[], &items[..30]).await.unwrap();
        assert!(report.is_complete());
        assert_eq!(report.written, 30);
        assert_eq!(store.item_count(table.name()).unwrap(), 30);
    }

    #[tokio::test]
    async fn test_should_chunk_large_batch_gets() {
        let store = MemoryStore::new();
        let table = create_table(&store, "batch", TableSchema::new("sku"));
        let items = products(150);
        table.batch_write(&items[..120], &[]).await.unwrap();

        let report = table.batch_get(&keys(&items)).await.unwrap();
        assert!(report.is_complete());
        assert_eq!(report.items.len(), 120);

        let mut found: Vec<_> = report.items.clone();
        found.sort_by_key(|i| i["stock"].as_number().and_then(|n| n.as_u64()));
        assert_eq!(found, items[..120].to_vec());
    }

    #[tokio::test]
    async fn test_should_retry_unprocessed_writes_to_completion() {
        let store = MemoryStore::new().with_unprocessed_budget(5);
        let table = create_table(&store, "batch", TableSchema::new("sku"));

        let report = table.batch_write(&products(30), &[]).await.unwrap();
        assert!(report.is_complete());
        assert_eq!(report.written, 30);
        assert_eq!(store.item_count(table.name()).unwrap(), 30);
        assert_eq!(store.provider().unprocessed_budget(), 0);
    }

    #[tokio::test]
    async fn test_should_report_writes_left_after_last_attempt() {
        let store = MemoryStore::new();
        let config = DynadocConfig {
            batch_max_attempts: 1,
            ..DynadocConfig::default()
        };
        let table = create_table_with_config(&store, "batch", TableSchema::new("sku"), config);
        let items = products(10);
        store.set_unprocessed_budget(3);

        let report = table.batch_write(&items, &[]).await.unwrap();
        assert!(!report.is_complete());
        assert_eq!(report.written, 7);
        assert_eq!(report.unprocessed.len(), 3);
        for op in &report.unprocessed {
            let WriteOp::Put(put) = op else {
                panic!("expected a put, got {op:?}");
            };
            assert!(items.contains(put));
        }
        assert_eq!(store.item_count(table.name()).unwrap(), 7);
    }

    #[tokio::test]
    async fn test_should_report_unprocessed_deletes_as_keys() {
        let store = MemoryStore::new();
        let config = DynadocConfig {
            batch_max_attempts: 1,
            ..DynadocConfig::default()
        };
        let table = create_table_with_config(&store, "batch", TableSchema::new("sku"), config);
        let items = products(4);
        table.batch_write(&items, &[]).await.unwrap();
        store.set_unprocessed_budget(1);

        let report = table.batch_write(&[], &items).await.unwrap();
        assert_eq!(report.written, 3);
        assert_eq!(
            report.unprocessed,
            vec![WriteOp::Delete(keys(&items[..1]).remove(0))]
        );
    }

    #[tokio::test]
    async fn test_should_report_keys_left_after_retries() {
        let store = MemoryStore::new();
        let table = create_table(&store, "batch", TableSchema::new("sku"));
        let items = products(5);
        table.batch_write(&items, &[]).await.unwrap();
        store.set_unprocessed_budget(1_000);

        let report = table.batch_get(&keys(&items)).await.unwrap();
        assert!(report.items.is_empty());
        assert!(!report.is_complete());
        assert_eq!(report.unprocessed.len(), 5);
        for key in keys(&items) {
            assert!(report.unprocessed.contains(&key));
        }
    }

    #[tokio::test]
    async fn test_should_reject_whole_batch_on_bad_item() {
        let store = MemoryStore::new();
        let table = create_table(&store, "batch", TableSchema::new("sku"));
        let bad = item([("stock", Value::from(1))]);

        let err = table.batch_write(&[bad], &[]).await.unwrap_err();
        assert!(!err.is_conditional_failure());
        assert_eq!(store.item_count(table.name()).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_should_report_progress_when_later_chunk_fails() {
        let store = MemoryStore::new();
        let table = create_table(&store, "batch", TableSchema::new("sku"));
        let mut items = products(30);
        items[27] = item([("stock", Value::from(27))]);

        let err = table.batch_write(&items, &[]).await.unwrap_err();
        let Error::BatchWriteInterrupted { report, source, .. } = err else {
            panic!("expected an interrupted batch");
        };
        assert_eq!(report.written, 25);
        assert_eq!(report.unprocessed.len(), 5);
        assert_eq!(report.unprocessed[0], WriteOp::Put(items[25].clone()));
        assert!(
            matches!(*source, Error::Store(ref e) if e.code == StoreErrorCode::ValidationException)
        );
        assert_eq!(store.item_count(table.name()).unwrap(), 25);
    }
}
