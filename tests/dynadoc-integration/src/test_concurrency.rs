//! Atomic counters under concurrent writers.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use dynadoc_core::{Number, TableSchema, Value};
    use dynadoc_memory::MemoryStore;

    use crate::{create_table, item};

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_should_apply_concurrent_increments_exactly_once() {
        let store = MemoryStore::new();
        let table = Arc::new(create_table(&store, "counter", TableSchema::new("id")));
        let key = item([("id", Value::from("c1"))]);
        table
            .put(
                &item([("id", Value::from("c1")), ("count", Value::from(1))]),
                None,
            )
            .await
            .unwrap();

        let plus = {
            let table = Arc::clone(&table);
            let key = key.clone();
            tokio::spawn(async move { table.increment(&key, "count", 5).await })
        };
        let minus = {
            let table = Arc::clone(&table);
            let key = key.clone();
            tokio::spawn(async move { table.increment(&key, "count", -2).await })
        };
        plus.await.unwrap().unwrap();
        minus.await.unwrap().unwrap();

        let got = table.get(&key).await.unwrap().unwrap();
        assert_eq!(got.get("count"), Some(&Value::from(4)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_should_not_lose_updates_under_contention() {
        let store = MemoryStore::new();
        let table = Arc::new(create_table(&store, "counter", TableSchema::new("id")));
        let key = item([("id", Value::from("c1"))]);

        let tasks: Vec<_> = (0..50)
            .map(|_| {
                let table = Arc::clone(&table);
                let key = key.clone();
                tokio::spawn(async move { table.increment(&key, "hits", 1).await })
            })
            .collect();
        for result in futures::future::join_all(tasks).await {
            result.unwrap().unwrap();
        }

        let got = table.get(&key).await.unwrap().unwrap();
        assert_eq!(got.get("hits"), Some(&Value::from(50)));
    }

    #[tokio::test]
    async fn test_should_return_new_value_from_increment() {
        let store = MemoryStore::new();
        let table = create_table(&store, "counter", TableSchema::new("id"));
        let key = item([("id", Value::from("c1"))]);

        let first = table.increment(&key, "score", 10).await.unwrap();
        let second = table
            .increment(&key, "score", Number::parse("-2.5").unwrap())
            .await
            .unwrap();
        assert_eq!(first, Number::from(10));
        assert_eq!(second, Number::parse("7.5").unwrap());
    }
}
