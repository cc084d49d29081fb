//! Typed records through serde.

#[cfg(test)]
mod tests {
    use dynadoc_core::{DynadocConfig, NumericStrings, TableSchema, Value};
    use dynadoc_memory::MemoryStore;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    use crate::{create_table, create_table_with_config, criteria, item};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Account {
        id: String,
        owner: String,
        balance: f64,
        visits: u32,
        labels: Vec<String>,
        email: Option<String>,
        address: Address,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Address {
        street: String,
        zip: String,
    }

    fn account(zip: &str) -> Account {
        Account {
            id: "acct-1".to_owned(),
            owner: "Grace".to_owned(),
            balance: 12.5,
            visits: 3,
            labels: vec!["gold".to_owned(), "early".to_owned()],
            email: None,
            address: Address {
                street: "Main St".to_owned(),
                zip: zip.to_owned(),
            },
        }
    }

    #[tokio::test]
    async fn test_should_roundtrip_typed_record() -> anyhow::Result<()> {
        let store = MemoryStore::new();
        let table = create_table(&store, "records", TableSchema::new("id"));
        let record = account("N1 9GU");

        table.put_record(&record, None).await?;
        let got: Option<Account> = table
            .get_record(&item([("id", Value::from("acct-1"))]))
            .await?;
        assert_eq!(got, Some(record));
        Ok(())
    }

    #[tokio::test]
    async fn test_should_keep_digit_strings_when_preserving() {
        let store = MemoryStore::new();
        let config = DynadocConfig {
            numeric_strings: NumericStrings::Preserve,
            ..DynadocConfig::default()
        };
        let table = create_table_with_config(&store, "records", TableSchema::new("id"), config);
        let record = account("02139");

        table.put_record(&record, None).await.unwrap();
        let got: Option<Account> = table
            .get_record(&item([("id", Value::from("acct-1"))]))
            .await
            .unwrap();
        assert_eq!(got, Some(record));
    }

    #[tokio::test]
    async fn test_should_fail_decoding_coerced_digit_string() {
        let store = MemoryStore::new();
        let table = create_table(&store, "records", TableSchema::new("id"));

        table.put_record(&account("02139"), None).await.unwrap();
        let err = table
            .get_record::<Account>(&item([("id", Value::from("acct-1"))]))
            .await
            .unwrap_err();
        assert!(matches!(err, dynadoc_core::Error::Serialization(_)));
    }

    #[tokio::test]
    async fn test_should_guard_record_put_with_condition() {
        let store = MemoryStore::new();
        let table = create_table(&store, "records", TableSchema::new("id"));
        let only_new = criteria(&json!({ "id": { "attribute_not_exists": null } }));

        table.put_record(&account("N1"), Some(&only_new)).await.unwrap();
        let err = table
            .put_record(&account("N2"), Some(&only_new))
            .await
            .unwrap_err();
        assert!(err.is_conditional_failure());
    }

    #[tokio::test]
    async fn test_should_reject_record_that_is_not_a_map() {
        let store = MemoryStore::new();
        let table = create_table(&store, "records", TableSchema::new("id"));

        let err = table.put_record(&vec![1, 2, 3], None).await.unwrap_err();
        assert!(matches!(err, dynadoc_core::Error::UnsupportedValueShape(_)));
    }
}
