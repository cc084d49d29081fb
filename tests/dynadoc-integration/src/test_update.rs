//! Update documents applied by the store.

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use dynadoc_core::{Error, Item, Table, TableSchema, UpdateDocument, Value};
    use dynadoc_memory::MemoryStore;
    use dynadoc_model::StoreErrorCode;

    use crate::{create_table, item};

    fn key() -> Item {
        item([("id", Value::from("doc1"))])
    }

    async fn seeded(store: &MemoryStore) -> Table<MemoryStore> {
        let table = create_table(store, "update", TableSchema::new("id"));
        table
            .put(
                &item([
                    ("id", Value::from("doc1")),
                    ("title", Value::from("draft")),
                    ("views", Value::from(10)),
                    ("log", Value::from(vec![Value::from("created")])),
                    (
                        "tags",
                        Value::set_of([Value::from("a"), Value::from("b")]).unwrap(),
                    ),
                    ("scratch", Value::from("tmp")),
                ]),
                None,
            )
            .await
            .unwrap();
        table
    }

    fn strings(members: &[&str]) -> Value {
        Value::set_of(members.iter().map(|m| Value::from(*m))).unwrap()
    }

    #[tokio::test]
    async fn test_should_apply_mixed_actions() {
        let store = MemoryStore::new();
        let table = seeded(&store).await;

        let after = table
            .update(
                &key(),
                UpdateDocument::new()
                    .set("title", "final")
                    .increment("views", 5)
                    .append("log", vec![Value::from("edited"), Value::from("published")])
                    .add_to_set("tags", strings(&["c"]))
                    .remove("scratch"),
                None,
            )
            .await
            .unwrap();
        assert_eq!(after.get("tags"), Some(&strings(&["a", "b", "c"])));

        let after = table
            .update(
                &key(),
                UpdateDocument::new().remove_from_set("tags", strings(&["a"])),
                None,
            )
            .await
            .unwrap();

        assert_eq!(after.get("title"), Some(&Value::from("final")));
        assert_eq!(after.get("views"), Some(&Value::from(15)));
        assert_eq!(
            after.get("log"),
            Some(&Value::from(vec![
                Value::from("created"),
                Value::from("edited"),
                Value::from("published"),
            ]))
        );
        assert_eq!(after.get("tags"), Some(&strings(&["b", "c"])));
        assert!(!after.contains_key("scratch"));
        assert_eq!(table.get(&key()).await.unwrap(), Some(after));
    }

    #[tokio::test]
    async fn test_should_create_missing_item_from_update() {
        let store = MemoryStore::new();
        let table = create_table(&store, "update", TableSchema::new("id"));

        let after = table
            .update(
                &key(),
                UpdateDocument::new()
                    .increment("views", 1)
                    .append("log", vec![Value::from("first")])
                    .add_to_set("tags", strings(&["new"])),
                None,
            )
            .await
            .unwrap();

        assert_eq!(after.get("id"), Some(&Value::from("doc1")));
        assert_eq!(after.get("views"), Some(&Value::from(1)));
        assert_eq!(
            after.get("log"),
            Some(&Value::from(vec![Value::from("first")]))
        );
        assert_eq!(after.get("tags"), Some(&strings(&["new"])));
    }

    #[tokio::test]
    async fn test_should_merge_flat_map() -> anyhow::Result<()> {
        let store = MemoryStore::new();
        let table = seeded(&store).await;
        let fields = BTreeMap::from([
            ("title".to_owned(), Value::from("merged")),
            ("author".to_owned(), Value::from("kim")),
            ("skipped".to_owned(), Value::Undefined),
        ]);

        let after = table
            .update(&key(), UpdateDocument::merge(&fields), None)
            .await?;
        assert_eq!(after.get("title"), Some(&Value::from("merged")));
        assert_eq!(after.get("author"), Some(&Value::from("kim")));
        assert_eq!(after.get("views"), Some(&Value::from(10)));
        assert!(!after.contains_key("skipped"));
        Ok(())
    }

    #[tokio::test]
    async fn test_should_apply_increment_map() {
        let store = MemoryStore::new();
        let table = seeded(&store).await;
        let deltas = BTreeMap::from([
            ("views".to_owned(), Value::from(-4)),
            ("likes".to_owned(), Value::from(2)),
        ]);

        let after = table
            .update(&key(), UpdateDocument::increments(&deltas).unwrap(), None)
            .await
            .unwrap();
        assert_eq!(after.get("views"), Some(&Value::from(6)));
        assert_eq!(after.get("likes"), Some(&Value::from(2)));

        let bad = BTreeMap::from([("views".to_owned(), Value::from("many"))]);
        assert!(UpdateDocument::increments(&bad).is_err());
    }

    #[tokio::test]
    async fn test_should_update_attributes_named_like_keywords() {
        let store = MemoryStore::new();
        let table = seeded(&store).await;

        let after = table
            .update(
                &key(),
                UpdateDocument::new()
                    .set("size", 3)
                    .set("status", "open")
                    .set("order", "first"),
                None,
            )
            .await
            .unwrap();
        assert_eq!(after.get("size"), Some(&Value::from(3)));
        assert_eq!(after.get("status"), Some(&Value::from("open")));
        assert_eq!(after.get("order"), Some(&Value::from("first")));
    }

    #[tokio::test]
    async fn test_should_reject_key_attribute_update() {
        let store = MemoryStore::new();
        let table = seeded(&store).await;

        let err = table
            .update(&key(), UpdateDocument::new().set("id", "doc2"), None)
            .await
            .unwrap_err();
        assert!(matches!(
            &err,
            Error::Store(e) if e.code == StoreErrorCode::ValidationException
        ));
        assert!(table.get(&key()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_should_reject_two_actions_on_one_field() {
        let store = MemoryStore::new();
        let table = seeded(&store).await;

        let err = table
            .update(
                &key(),
                UpdateDocument::new()
                    .add_to_set("tags", strings(&["c"]))
                    .remove_from_set("tags", strings(&["a"])),
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidQueryShape(_)));
    }

    #[tokio::test]
    async fn test_should_reject_empty_update() {
        let store = MemoryStore::new();
        let table = seeded(&store).await;

        let err = table
            .update(&key(), UpdateDocument::new(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidQueryShape(_)));
    }
}
