//! Single-item reads and writes.

#[cfg(test)]
mod tests {
    use dynadoc_core::{Error, Table, TableSchema, Value};
    use dynadoc_memory::MemoryStore;
    use dynadoc_model::StoreErrorCode;

    use crate::{create_table, item};

    #[tokio::test]
    async fn test_should_put_and_get_nested_item() {
        let store = MemoryStore::new();
        let table = create_table(&store, "crud", TableSchema::new("id"));

        let profile = item([
            ("city", Value::from("Oslo")),
            ("tags", Value::from(vec![Value::from("a"), Value::from(7)])),
        ]);
        let user = item([
            ("id", Value::from("u1")),
            ("name", Value::from("Ada")),
            ("age", Value::from(36)),
            ("active", Value::from(true)),
            ("nickname", Value::Null),
            ("profile", Value::from(profile)),
            (
                "roles",
                Value::set_of([Value::from("admin"), Value::from("dev")]).unwrap(),
            ),
        ]);
        table.put(&user, None).await.unwrap();

        let got = table
            .get(&item([("id", Value::from("u1"))]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got, user);
    }

    #[tokio::test]
    async fn test_should_return_none_for_missing_item() {
        let store = MemoryStore::new();
        let table = create_table(&store, "crud", TableSchema::new("id"));

        let got = table.get(&item([("id", Value::from("nobody"))])).await.unwrap();
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn test_should_drop_undefined_fields_on_put() {
        let store = MemoryStore::new();
        let table = create_table(&store, "crud", TableSchema::new("id"));

        table
            .put(
                &item([
                    ("id", Value::from("u1")),
                    ("gone", Value::Undefined),
                    ("kept", Value::from("yes")),
                ]),
                None,
            )
            .await
            .unwrap();

        let got = table
            .get(&item([("id", Value::from("u1"))]))
            .await
            .unwrap()
            .unwrap();
        assert!(!got.contains_key("gone"));
        assert_eq!(got.get("kept"), Some(&Value::from("yes")));
    }

    #[tokio::test]
    async fn test_should_store_digit_strings_as_numbers() {
        let store = MemoryStore::new();
        let table = create_table(&store, "crud", TableSchema::new("id"));

        table
            .put(
                &item([("id", Value::from("u1")), ("zip", Value::from("0042"))]),
                None,
            )
            .await
            .unwrap();

        let got = table
            .get(&item([("id", Value::from("u1"))]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got.get("zip"), Some(&Value::from(42)));
    }

    #[tokio::test]
    async fn test_should_delete_and_return_old_item() {
        let store = MemoryStore::new();
        let table = create_table(&store, "crud", TableSchema::new("id"));
        let user = item([("id", Value::from("u1")), ("name", Value::from("Ada"))]);
        table.put(&user, None).await.unwrap();

        let key = item([("id", Value::from("u1"))]);
        let old = table.delete(&key, None).await.unwrap();
        assert_eq!(old, Some(user));
        assert!(table.get(&key).await.unwrap().is_none());

        let again = table.delete(&key, None).await.unwrap();
        assert!(again.is_none());
    }

    #[tokio::test]
    async fn test_should_address_composite_keys() {
        let store = MemoryStore::new();
        let table = create_table(
            &store,
            "crud",
            TableSchema::new("user").with_sort_key("seq"),
        );

        for seq in 1..=3 {
            table
                .put(
                    &item([
                        ("user", Value::from("u1")),
                        ("seq", Value::from(seq)),
                        ("body", Value::from(format!("message {seq}"))),
                    ]),
                    None,
                )
                .await
                .unwrap();
        }

        let got = table
            .get(&item([("user", Value::from("u1")), ("seq", Value::from(2))]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got.get("body"), Some(&Value::from("message 2")));
        assert_eq!(store.item_count(table.name()).unwrap(), 3);
    }

    #[tokio::test]
    async fn test_should_surface_store_errors_for_missing_table() {
        let store = MemoryStore::new();
        let table = Table::new(store, "absent", TableSchema::new("id"));

        let err = table
            .get(&item([("id", Value::from("u1"))]))
            .await
            .unwrap_err();
        assert!(matches!(
            &err,
            Error::Store(e) if e.code == StoreErrorCode::ResourceNotFoundException
        ));
        assert!(!err.is_conditional_failure());
    }
}
