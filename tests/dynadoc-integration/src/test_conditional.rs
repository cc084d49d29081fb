//! Conditional writes.

#[cfg(test)]
mod tests {
    use dynadoc_core::{TableSchema, UpdateDocument, Value};
    use dynadoc_memory::MemoryStore;
    use serde_json::json;

    use crate::{create_table, criteria, item};

    #[tokio::test]
    async fn test_should_leave_item_unchanged_when_condition_fails() {
        let store = MemoryStore::new();
        let table = create_table(&store, "cond", TableSchema::new("id"));
        let key = item([("id", Value::from("u1"))]);
        table
            .put(
                &item([("id", Value::from("u1")), ("version", Value::from(1))]),
                None,
            )
            .await
            .unwrap();

        let err = table
            .put(
                &item([("id", Value::from("u1")), ("version", Value::from(3))]),
                Some(&criteria(&json!({ "version": { "=": 2 } }))),
            )
            .await
            .unwrap_err();
        assert!(err.is_conditional_failure());

        let got = table.get(&key).await.unwrap().unwrap();
        assert_eq!(got.get("version"), Some(&Value::from(1)));
    }

    #[tokio::test]
    async fn test_should_apply_put_when_condition_holds() {
        let store = MemoryStore::new();
        let table = create_table(&store, "cond", TableSchema::new("id"));
        let key = item([("id", Value::from("u1"))]);
        table
            .put(
                &item([("id", Value::from("u1")), ("version", Value::from(1))]),
                None,
            )
            .await
            .unwrap();

        table
            .put(
                &item([("id", Value::from("u1")), ("version", Value::from(2))]),
                Some(&criteria(&json!({ "version": { "=": 1 } }))),
            )
            .await
            .unwrap();

        let got = table.get(&key).await.unwrap().unwrap();
        assert_eq!(got.get("version"), Some(&Value::from(2)));
    }

    #[tokio::test]
    async fn test_should_create_only_once_with_not_exists() {
        let store = MemoryStore::new();
        let table = create_table(&store, "cond", TableSchema::new("id"));
        let only_new = criteria(&json!({ "id": { "attribute_not_exists": null } }));

        table
            .put(
                &item([("id", Value::from("u1")), ("owner", Value::from("first"))]),
                Some(&only_new),
            )
            .await
            .unwrap();
        let err = table
            .put(
                &item([("id", Value::from("u1")), ("owner", Value::from("second"))]),
                Some(&only_new),
            )
            .await
            .unwrap_err();
        assert!(err.is_conditional_failure());

        let got = table
            .get(&item([("id", Value::from("u1"))]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got.get("owner"), Some(&Value::from("first")));
    }

    #[tokio::test]
    async fn test_should_guard_update_and_delete() {
        let store = MemoryStore::new();
        let table = create_table(&store, "cond", TableSchema::new("id"));
        let key = item([("id", Value::from("u1"))]);
        table
            .put(
                &item([("id", Value::from("u1")), ("status", Value::from("draft"))]),
                None,
            )
            .await
            .unwrap();

        let err = table
            .update(
                &key,
                UpdateDocument::new().set("status", "published"),
                Some(&criteria(&json!({ "status": { "=": "review" } }))),
            )
            .await
            .unwrap_err();
        assert!(err.is_conditional_failure());

        let err = table
            .delete(
                &key,
                Some(&criteria(&json!({ "status": { "<>": "draft" } }))),
            )
            .await
            .unwrap_err();
        assert!(err.is_conditional_failure());
        assert!(table.get(&key).await.unwrap().is_some());

        let updated = table
            .update(
                &key,
                UpdateDocument::new().set("status", "review"),
                Some(&criteria(&json!({ "status": { "=": "draft" } }))),
            )
            .await
            .unwrap();
        assert_eq!(updated.get("status"), Some(&Value::from("review")));
    }

    #[tokio::test]
    async fn test_should_combine_condition_fields_with_and() {
        let store = MemoryStore::new();
        let table = create_table(&store, "cond", TableSchema::new("id"));
        let key = item([("id", Value::from("u1"))]);
        table
            .put(
                &item([
                    ("id", Value::from("u1")),
                    ("balance", Value::from(50)),
                    ("frozen", Value::from(false)),
                ]),
                None,
            )
            .await
            .unwrap();

        let guard = criteria(&json!({
            "balance": { ">=": 30 },
            "frozen": { "=": false },
        }));
        let after = table
            .update(&key, UpdateDocument::new().increment("balance", -30), Some(&guard))
            .await
            .unwrap();
        assert_eq!(after.get("balance"), Some(&Value::from(20)));

        let err = table
            .update(&key, UpdateDocument::new().increment("balance", -30), Some(&guard))
            .await
            .unwrap_err();
        assert!(err.is_conditional_failure());
    }
}
