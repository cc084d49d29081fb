//! Queries, scans and pagination.

#[cfg(test)]
mod tests {
    use dynadoc_core::expression::Comparator;
    use dynadoc_core::{
        DynadocConfig, IndexSchema, Item, Predicate, Query, Table, TableSchema, Value,
    };
    use dynadoc_memory::MemoryStore;
    use serde_json::json;

    use crate::{create_table, create_table_with_config, criteria, item};

    async fn seed_messages(store: &MemoryStore) -> Table<MemoryStore> {
        let table = create_table(store, "msgs", TableSchema::new("user").with_sort_key("seq"));
        for seq in 1..=10 {
            let kind = if seq % 2 == 0 { "even" } else { "odd" };
            table
                .put(
                    &item([
                        ("user", Value::from("u1")),
                        ("seq", Value::from(seq)),
                        ("kind", Value::from(kind)),
                        ("body", Value::from(format!("hello {seq}"))),
                    ]),
                    None,
                )
                .await
                .unwrap();
        }
        table
            .put(
                &item([
                    ("user", Value::from("u2")),
                    ("seq", Value::from(1)),
                    ("kind", Value::from("odd")),
                ]),
                None,
            )
            .await
            .unwrap();
        table
    }

    fn seqs(items: &[Item]) -> Vec<i64> {
        items
            .iter()
            .map(|i| {
                i.get("seq")
                    .and_then(Value::as_number)
                    .and_then(|n| n.as_i64())
                    .unwrap()
            })
            .collect()
    }

    #[tokio::test]
    async fn test_should_query_partition_in_sort_order() {
        let store = MemoryStore::new();
        let table = seed_messages(&store).await;

        let items = table
            .query_all(Query::new(&criteria(&json!({ "user": "u1" }))).unwrap())
            .await
            .unwrap();
        assert_eq!(seqs(&items), (1..=10).collect::<Vec<_>>());

        let items = table
            .query_all(Query::key_equals("user", "u1").descending())
            .await
            .unwrap();
        assert_eq!(seqs(&items), (1..=10).rev().collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_should_follow_continuation_tokens() {
        let store = MemoryStore::new();
        let table = seed_messages(&store).await;

        let mut query = Query::key_equals("user", "u1").limit(3);
        let mut collected = Vec::new();
        let mut pages = 0;
        loop {
            let page = table.query(&query).await.unwrap();
            pages += 1;
            assert!(page.items.len() <= 3);
            collected.extend(page.items);
            match page.next {
                Some(token) => query = query.start_from(token),
                None => break,
            }
        }
        assert!(pages >= 4);
        assert_eq!(seqs(&collected), (1..=10).collect::<Vec<_>>());

        let all = table
            .query_all(Query::key_equals("user", "u1").limit(4))
            .await
            .unwrap();
        assert_eq!(all.len(), 10);
    }

    #[tokio::test]
    async fn test_should_carry_token_through_serialization() {
        let store = MemoryStore::new();
        let table = seed_messages(&store).await;

        let first = table
            .query(&Query::key_equals("user", "u1").limit(5))
            .await
            .unwrap();
        let token = first.next.unwrap();
        let text = serde_json::to_string(&token).unwrap();
        let token = serde_json::from_str(&text).unwrap();

        let second = table
            .query(&Query::key_equals("user", "u1").limit(5).start_from(token))
            .await
            .unwrap();
        assert_eq!(seqs(&second.items), vec![6, 7, 8, 9, 10]);
    }

    #[tokio::test]
    async fn test_should_narrow_by_sort_key_range() {
        let store = MemoryStore::new();
        let table = seed_messages(&store).await;

        let between = table
            .query_all(
                Query::key_equals("user", "u1")
                    .range(&criteria(&json!({ "seq": { "between": [3, 6] } })))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(seqs(&between), vec![3, 4, 5, 6]);

        let above = table
            .query_all(
                Query::key_equals("user", "u1")
                    .range_predicate(Predicate::binary("seq", Comparator::Gt, 7).unwrap())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(seqs(&above), vec![8, 9, 10]);
    }

    #[tokio::test]
    async fn test_should_filter_after_limit() {
        let store = MemoryStore::new();
        let table = seed_messages(&store).await;

        let query = Query::key_equals("user", "u1")
            .filter(&criteria(&json!({ "kind": { "=": "even" } })))
            .unwrap()
            .limit(4);
        let page = table.query(&query).await.unwrap();
        assert_eq!(seqs(&page.items), vec![2, 4]);
        assert_eq!(page.scanned_count, 4);
        assert!(page.has_more());

        let all = table.query_all(query).await.unwrap();
        assert_eq!(seqs(&all), vec![2, 4, 6, 8, 10]);
    }

    #[tokio::test]
    async fn test_should_project_requested_attributes() {
        let store = MemoryStore::new();
        let table = seed_messages(&store).await;

        let items = table
            .query_all(Query::key_equals("user", "u2").project(["seq", "kind"]))
            .await
            .unwrap();
        assert_eq!(
            items,
            vec![item([("seq", Value::from(1)), ("kind", Value::from("odd"))])]
        );
    }

    #[tokio::test]
    async fn test_should_query_secondary_index() {
        let store = MemoryStore::new();
        let table = create_table(
            &store,
            "users",
            TableSchema::new("id")
                .with_index(IndexSchema::new("by_team", "team").with_sort_key("joined")),
        );
        let users = [
            ("a1", Some("red"), 2021),
            ("b2", Some("blue"), 2019),
            ("c3", Some("red"), 2018),
            ("d4", None, 2020),
            ("e5", Some("red"), 2023),
        ];
        for (id, team, joined) in users {
            let mut user = item([("id", Value::from(id)), ("joined", Value::from(joined))]);
            if let Some(team) = team {
                user.insert("team".to_owned(), Value::from(team));
            }
            table.put(&user, None).await.unwrap();
        }

        let red = table
            .query_all(Query::key_equals("team", "red").index("by_team"))
            .await
            .unwrap();
        let ids: Vec<_> = red.iter().filter_map(|u| u.get("id")).cloned().collect();
        assert_eq!(
            ids,
            vec![Value::from("c3"), Value::from("a1"), Value::from("e5")]
        );

        let recent = table
            .query_all(
                Query::key_equals("team", "red")
                    .index("by_team")
                    .range(&criteria(&json!({ "joined": { ">=": 2021 } })))
                    .unwrap()
                    .descending(),
            )
            .await
            .unwrap();
        let ids: Vec<_> = recent.iter().filter_map(|u| u.get("id")).cloned().collect();
        assert_eq!(ids, vec![Value::from("e5"), Value::from("a1")]);
    }

    #[tokio::test]
    async fn test_should_match_sort_key_prefix() {
        let store = MemoryStore::new();
        let table = create_table(&store, "events", TableSchema::new("pk").with_sort_key("sk"));
        for sk in ["order#1", "order#2", "refund#1", "order#3"] {
            table
                .put(&item([("pk", Value::from("shop")), ("sk", Value::from(sk))]), None)
                .await
                .unwrap();
        }

        let orders = table
            .query_all(
                Query::key_equals("pk", "shop")
                    .range(&criteria(&json!({ "sk": { "begins_with": "order#" } })))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(orders.len(), 3);
    }

    #[tokio::test]
    async fn test_should_scan_in_pages() {
        let store = MemoryStore::new();
        let config = DynadocConfig {
            page_size: Some(2),
            ..DynadocConfig::default()
        };
        let table = create_table_with_config(&store, "scan", TableSchema::new("id"), config);
        for (id, age) in [("p1", 25), ("p2", 31), ("p3", 45), ("p4", 19), ("p5", 38)] {
            table
                .put(&item([("id", Value::from(id)), ("age", Value::from(age))]), None)
                .await
                .unwrap();
        }

        let first = table.scan(None, None).await.unwrap();
        assert_eq!(first.items.len(), 2);
        assert!(first.has_more());

        assert_eq!(table.scan_all(None).await.unwrap().len(), 5);

        let older = table
            .scan_all(Some(&criteria(&json!({ "age": { ">": 30 } }))))
            .await
            .unwrap();
        assert_eq!(older.len(), 3);
    }

    #[tokio::test]
    async fn test_should_reject_malformed_range() {
        let store = MemoryStore::new();
        let table = seed_messages(&store).await;

        let err = Query::key_equals("user", "u1")
            .range(&criteria(&json!({ "seq": { "between": [1] } })))
            .unwrap_err();
        assert!(matches!(err, dynadoc_core::Error::InvalidQueryShape(_)));

        let err = table
            .query(&Query::key_equals("user", "u1").index("missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, dynadoc_core::Error::Store(_)));
    }
}
