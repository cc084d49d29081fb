//! Store operation enum.

use std::fmt;

/// The item-level operations a transport carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    /// Get an item by primary key.
    GetItem,
    /// Put (insert or replace) an item.
    PutItem,
    /// Update an item in place.
    UpdateItem,
    /// Delete an item by primary key.
    DeleteItem,
    /// Query items by key condition.
    Query,
    /// Scan all items in a table.
    Scan,
    /// Batch get items from one or more tables.
    BatchGetItem,
    /// Batch put/delete items in one or more tables.
    BatchWriteItem,
}

impl StoreOperation {
    /// Every operation, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::GetItem,
        Self::PutItem,
        Self::UpdateItem,
        Self::DeleteItem,
        Self::Query,
        Self::Scan,
        Self::BatchGetItem,
        Self::BatchWriteItem,
    ];

    /// Returns the wire operation name (the `X-Amz-Target` suffix).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GetItem => "GetItem",
            Self::PutItem => "PutItem",
            Self::UpdateItem => "UpdateItem",
            Self::DeleteItem => "DeleteItem",
            Self::Query => "Query",
            Self::Scan => "Scan",
            Self::BatchGetItem => "BatchGetItem",
            Self::BatchWriteItem => "BatchWriteItem",
        }
    }

    /// Parse an operation name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == name)
    }

    /// Returns `true` if the operation mutates stored items.
    #[must_use]
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Self::PutItem | Self::UpdateItem | Self::DeleteItem | Self::BatchWriteItem
        )
    }
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
