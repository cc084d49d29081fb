//! Configuration from the environment.

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use dynadoc_core::{DynadocConfig, EmptySetPolicy, NumericStrings, TableSchema, Value};
    use dynadoc_memory::MemoryStore;

    use crate::{create_table, create_table_with_config, item};

    const VARS: [(&str, &str); 5] = [
        ("DYNADOC_NUMERIC_STRINGS", "preserve"),
        ("DYNADOC_EMPTY_SETS", "omit"),
        ("DYNADOC_BATCH_MAX_ATTEMPTS", "5"),
        ("DYNADOC_PAGE_SIZE", "50"),
        ("DYNADOC_CONSISTENT_READ", "true"),
    ];

    #[tokio::test]
    async fn test_should_load_config_from_env() {
        // SAFETY: no other test in this binary reads or writes DYNADOC_* variables.
        unsafe {
            for (key, value) in VARS {
                std::env::set_var(key, value);
            }
        }
        let config = DynadocConfig::from_env();
        unsafe {
            for (key, _) in VARS {
                std::env::remove_var(key);
            }
        }

        assert_eq!(config.numeric_strings, NumericStrings::Preserve);
        assert_eq!(config.empty_sets, EmptySetPolicy::Omit);
        assert_eq!(config.batch_max_attempts, 5);
        assert_eq!(config.page_size, Some(50));
        assert!(config.consistent_read);

        let store = MemoryStore::new();
        let table = create_table_with_config(&store, "config", TableSchema::new("id"), config);
        table
            .put(
                &item([
                    ("id", Value::from("u1")),
                    ("pin", Value::from("0007")),
                    ("tags", Value::from(BTreeSet::<String>::new())),
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
        assert_eq!(got.get("pin"), Some(&Value::from("0007")));
        assert!(!got.contains_key("tags"));
    }

    #[tokio::test]
    async fn test_should_reject_empty_set_by_default() {
        let store = MemoryStore::new();
        let table = create_table(&store, "config", TableSchema::new("id"));

        let err = table
            .put(
                &item([
                    ("id", Value::from("u1")),
                    ("tags", Value::from(BTreeSet::<String>::new())),
                ]),
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, dynadoc_core::Error::UnsupportedValueShape(_)));
    }
}
