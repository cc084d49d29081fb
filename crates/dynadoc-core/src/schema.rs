//! Caller-supplied key schema of a table and its secondary indexes.

/// Key layout of a secondary index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSchema {
    /// Index name, as sent in `IndexName`.
    pub name: String,
    /// Index partition key attribute.
    pub partition_key: String,
    /// Index sort key attribute, if any.
    pub sort_key: Option<String>,
}

impl IndexSchema {
    /// An index keyed on `partition_key` alone.
    #[must_use]
    pub fn new(name: impl Into<String>, partition_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            partition_key: partition_key.into(),
            sort_key: None,
        }
    }

    /// Add a sort key.
    #[must_use]
    pub fn with_sort_key(mut self, sort_key: impl Into<String>) -> Self {
        self.sort_key = Some(sort_key.into());
        self
    }
}

/// Key layout of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    /// Partition key attribute.
    pub partition_key: String,
    /// Sort key attribute, if the key is composite.
    pub sort_key: Option<String>,
    /// Secondary indexes.
    pub indexes: Vec<IndexSchema>,
}

impl TableSchema {
    /// A table keyed on `partition_key` alone.
    #[must_use]
    pub fn new(partition_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            sort_key: None,
            indexes: Vec::new(),
        }
    }

    /// Add a sort key.
    #[must_use]
    pub fn with_sort_key(mut self, sort_key: impl Into<String>) -> Self {
        self.sort_key = Some(sort_key.into());
        self
    }

    /// Add a secondary index.
    #[must_use]
    pub fn with_index(mut self, index: IndexSchema) -> Self {
        self.indexes.push(index);
        self
    }

    /// Look up an index by name.
    #[must_use]
    pub fn index(&self, name: &str) -> Option<&IndexSchema> {
        self.indexes.iter().find(|i| i.name == name)
    }

    /// Table key attribute names, partition key first.
    pub fn key_attributes(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.partition_key.as_str()).chain(self.sort_key.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_list_key_attributes_in_order() {
        let schema = TableSchema::new("pk").with_sort_key("sk");
        assert_eq!(schema.key_attributes().collect::<Vec<_>>(), ["pk", "sk"]);
        assert_eq!(TableSchema::new("id").key_attributes().count(), 1);
    }

    #[test]
    fn test_should_find_index_by_name() {
        let schema = TableSchema::new("id")
            .with_index(IndexSchema::new("by_email", "email").with_sort_key("ts"));
        assert_eq!(schema.index("by_email").map(|i| i.partition_key.as_str()), Some("email"));
        assert!(schema.index("missing").is_none());
    }
}
