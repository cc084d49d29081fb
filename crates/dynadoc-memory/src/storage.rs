//! In-memory storage engine for a single table.
//!
//! ```text
//! DashMap<SortableAttributeValue, BTreeMap<SortableAttributeValue, Item>>
//! ```
//!
//! Partitions are independent `DashMap` entries. Within a partition items
//! are ordered by sort key; tables without a sort key store their one item
//! per partition under [`SortableAttributeValue::Sentinel`].
//!
//! Read-modify-write goes through [`TableStorage::modify_item`], which holds
//! the partition's shard lock for the whole closure. That is what makes
//! conditional writes and `ADD`/`SET x = x + :n` updates atomic.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use bytes::Bytes;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use thiserror::Error;
use tracing::debug;

use dynadoc_core::Number;
use dynadoc_model::AttributeValue;

/// A stored item in wire form.
pub type Item = HashMap<String, AttributeValue>;

/// Errors raised by the storage engine.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A key attribute is absent from the item or key.
    #[error("missing required key attribute: {attr}")]
    MissingKeyAttribute {
        /// Attribute name.
        attr: String,
    },
    /// A key attribute is not `S`, `N` or `B`, or is an invalid number.
    #[error("key attribute '{attr}' has invalid type {actual}")]
    InvalidKeyType {
        /// Attribute name.
        attr: String,
        /// Wire tag that was found.
        actual: &'static str,
    },
}

/// Partition and optional sort attribute of a table or index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySchema {
    /// Partition (HASH) key attribute.
    pub partition_key: String,
    /// Sort (RANGE) key attribute.
    pub sort_key: Option<String>,
}

impl KeySchema {
    /// Key attribute names, partition key first.
    pub fn attributes(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.partition_key.as_str()).chain(self.sort_key.as_deref())
    }
}

/// A key-eligible value with the store's ordering.
///
/// Strings order by UTF-8 bytes, numbers numerically (exactly, through
/// [`Number`]), binaries byte-wise.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SortableAttributeValue {
    /// String key.
    S(String),
    /// Number key.
    N(Number),
    /// Binary key.
    B(Bytes),
    /// Placeholder sort key for tables without one.
    Sentinel,
}

impl SortableAttributeValue {
    /// Convert a wire value, rejecting anything that cannot be a key.
    pub fn from_attribute_value(attr: &str, value: &AttributeValue) -> Result<Self, StorageError> {
        let invalid = || StorageError::InvalidKeyType {
            attr: attr.to_owned(),
            actual: value.tag(),
        };
        match value {
            AttributeValue::S(s) => Ok(Self::S(s.clone())),
            AttributeValue::N(n) => Number::parse(n).map(Self::N).map_err(|_| invalid()),
            AttributeValue::B(b) => Ok(Self::B(b.clone())),
            _ => Err(invalid()),
        }
    }

    /// Back to wire form; `None` for the sentinel.
    #[must_use]
    pub fn to_attribute_value(&self) -> Option<AttributeValue> {
        match self {
            Self::S(s) => Some(AttributeValue::S(s.clone())),
            Self::N(n) => Some(AttributeValue::N(n.as_str().to_owned())),
            Self::B(b) => Some(AttributeValue::B(b.clone())),
            Self::Sentinel => None,
        }
    }
}

/// A resolved primary key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PrimaryKey {
    /// Partition key value.
    pub partition_key: SortableAttributeValue,
    /// Sort key value, [`SortableAttributeValue::Sentinel`] if the table has none.
    pub sort_key: SortableAttributeValue,
}

/// Condition on the sort key of a query.
#[derive(Debug, Clone, PartialEq)]
pub enum SortKeyCondition {
    /// `sk = v`
    Eq(SortableAttributeValue),
    /// `sk < v`
    Lt(SortableAttributeValue),
    /// `sk <= v`
    Le(SortableAttributeValue),
    /// `sk > v`
    Gt(SortableAttributeValue),
    /// `sk >= v`
    Ge(SortableAttributeValue),
    /// `sk BETWEEN lo AND hi`, inclusive.
    Between(SortableAttributeValue, SortableAttributeValue),
    /// `begins_with(sk, prefix)` on strings or binaries.
    BeginsWith(SortableAttributeValue),
}

impl SortKeyCondition {
    /// Returns `true` if `key` satisfies the condition.
    #[must_use]
    pub fn matches(&self, key: &SortableAttributeValue) -> bool {
        use SortableAttributeValue as V;

        let same_kind = |v: &V| std::mem::discriminant(v) == std::mem::discriminant(key);
        match self {
            Self::Eq(v) => key == v,
            Self::Lt(v) => same_kind(v) && key < v,
            Self::Le(v) => same_kind(v) && key <= v,
            Self::Gt(v) => same_kind(v) && key > v,
            Self::Ge(v) => same_kind(v) && key >= v,
            Self::Between(lo, hi) => same_kind(lo) && key >= lo && key <= hi,
            Self::BeginsWith(prefix) => match (key, prefix) {
                (V::S(s), V::S(p)) => s.starts_with(p.as_str()),
                (V::B(b), V::B(p)) => b.starts_with(p),
                _ => false,
            },
        }
    }
}

/// Items evaluated by one query or scan page.
#[derive(Debug, Default)]
pub struct Evaluated {
    /// Items in evaluation order, before any filter.
    pub items: Vec<Item>,
    /// `true` if the page stopped at the limit with items left over.
    pub truncated: bool,
}

/// Storage for one table.
#[derive(Debug)]
pub struct TableStorage {
    data: DashMap<SortableAttributeValue, BTreeMap<SortableAttributeValue, Item>>,
    key_schema: KeySchema,
    item_count: AtomicU64,
}

impl TableStorage {
    /// Empty storage for `key_schema`.
    #[must_use]
    pub fn new(key_schema: KeySchema) -> Self {
        Self {
            data: DashMap::new(),
            key_schema,
            item_count: AtomicU64::new(0),
        }
    }

    /// The table's key schema.
    #[must_use]
    pub fn key_schema(&self) -> &KeySchema {
        &self.key_schema
    }

    /// Number of stored items.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.item_count.load(AtomicOrdering::Relaxed)
    }

    /// Extract the primary key of an item or key map.
    pub fn primary_key(&self, item: &Item) -> Result<PrimaryKey, StorageError> {
        extract_key(&self.key_schema, item)
    }

    /// Fetch an item by key.
    #[must_use]
    pub fn get_item(&self, key: &PrimaryKey) -> Option<Item> {
        self.data
            .get(&key.partition_key)
            .and_then(|partition| partition.get(&key.sort_key).cloned())
    }

    /// Atomically read, transform and write back one item.
    ///
    /// `f` sees the current item (if any) and returns the replacement
    /// (`None` deletes) plus a result. The partition stays locked until `f`
    /// returns; if it fails, nothing is written.
    pub fn modify_item<R, E>(
        &self,
        key: &PrimaryKey,
        f: impl FnOnce(Option<&Item>) -> Result<(Option<Item>, R), E>,
    ) -> Result<R, E> {
        match self.data.entry(key.partition_key.clone()) {
            Entry::Occupied(mut entry) => {
                let (replacement, result) = f(entry.get().get(&key.sort_key))?;
                let partition = entry.get_mut();
                match replacement {
                    Some(item) => {
                        if partition.insert(key.sort_key.clone(), item).is_none() {
                            self.item_count.fetch_add(1, AtomicOrdering::Relaxed);
                            debug!(partition = ?key.partition_key, "inserted new item");
                        } else {
                            debug!(partition = ?key.partition_key, "replaced existing item");
                        }
                    }
                    None => {
                        if partition.remove(&key.sort_key).is_some() {
                            self.item_count.fetch_sub(1, AtomicOrdering::Relaxed);
                            debug!(partition = ?key.partition_key, "deleted item");
                        }
                    }
                }
                if entry.get().is_empty() {
                    entry.remove();
                }
                Ok(result)
            }
            // The vacant entry holds the shard lock while `f` runs.
            Entry::Vacant(entry) => {
                let (replacement, result) = f(None)?;
                if let Some(item) = replacement {
                    entry.insert(BTreeMap::from([(key.sort_key.clone(), item)]));
                    self.item_count.fetch_add(1, AtomicOrdering::Relaxed);
                    debug!(partition = ?key.partition_key, "inserted new item");
                }
                Ok(result)
            }
        }
    }

    /// Insert or replace an item, returning the previous one.
    pub fn put_item(&self, item: Item) -> Result<Option<Item>, StorageError> {
        let key = self.primary_key(&item)?;
        self.modify_item(&key, |old| Ok((Some(item), old.cloned())))
    }

    /// Remove an item, returning it if it existed.
    pub fn delete_item(&self, key: &PrimaryKey) -> Option<Item> {
        let removed: Result<_, StorageError> =
            self.modify_item(key, |old| Ok((None, old.cloned())));
        removed.ok().flatten()
    }

    /// Walk one partition in sort-key order.
    ///
    /// `start` is the sort key of the last item of the previous page.
    #[must_use]
    pub fn query(
        &self,
        partition_key: &SortableAttributeValue,
        condition: Option<&SortKeyCondition>,
        forward: bool,
        limit: Option<usize>,
        start: Option<&SortableAttributeValue>,
    ) -> Evaluated {
        let Some(partition) = self.data.get(partition_key) else {
            return Evaluated::default();
        };
        select(
            partition.iter(),
            |sk| condition.is_none_or(|c| c.matches(sk)),
            start,
            forward,
            limit,
        )
    }

    /// Walk every item whose `index` partition attribute equals
    /// `partition_key`, ordered by the index sort key then the table key.
    ///
    /// Items lacking an index key attribute are not in the index.
    #[must_use]
    pub fn query_index(
        &self,
        index: &KeySchema,
        partition_key: &SortableAttributeValue,
        condition: Option<&SortKeyCondition>,
        forward: bool,
        limit: Option<usize>,
        start: Option<&Item>,
    ) -> Evaluated {
        let mut entries: BTreeMap<IndexPosition, Item> = BTreeMap::new();
        for partition in &self.data {
            for (sk, item) in partition.value() {
                let Some(ipk) = index_value(item, &index.partition_key) else {
                    continue;
                };
                if &ipk != partition_key {
                    continue;
                }
                let isk = match &index.sort_key {
                    Some(attr) => match index_value(item, attr) {
                        Some(v) => v,
                        None => continue,
                    },
                    None => SortableAttributeValue::Sentinel,
                };
                entries.insert((isk, partition.key().clone(), sk.clone()), item.clone());
            }
        }

        let start = start.and_then(|key| self.index_position(index, key));
        select(
            entries.iter(),
            |(isk, _, _)| condition.is_none_or(|c| c.matches(isk)),
            start.as_ref(),
            forward,
            limit,
        )
    }

    /// Walk the whole table in key order.
    #[must_use]
    pub fn scan(&self, limit: Option<usize>, start: Option<&PrimaryKey>) -> Evaluated {
        let mut entries: BTreeMap<(SortableAttributeValue, SortableAttributeValue), Item> =
            BTreeMap::new();
        for partition in &self.data {
            for (sk, item) in partition.value() {
                entries.insert((partition.key().clone(), sk.clone()), item.clone());
            }
        }
        let start = start.map(|k| (k.partition_key.clone(), k.sort_key.clone()));
        select(entries.iter(), |_| true, start.as_ref(), true, limit)
    }

    /// Key attributes of `item` for a `LastEvaluatedKey`, including the
    /// index key attributes when paging an index.
    #[must_use]
    pub fn last_evaluated_key(&self, item: &Item, index: Option<&KeySchema>) -> Item {
        self.key_schema
            .attributes()
            .chain(index.into_iter().flat_map(KeySchema::attributes))
            .filter_map(|attr| item.get(attr).map(|v| (attr.to_owned(), v.clone())))
            .collect()
    }

    fn index_position(&self, index: &KeySchema, key: &Item) -> Option<IndexPosition> {
        let table_key = self.primary_key(key).ok()?;
        let isk = match &index.sort_key {
            Some(attr) => index_value(key, attr)?,
            None => SortableAttributeValue::Sentinel,
        };
        Some((isk, table_key.partition_key, table_key.sort_key))
    }
}

/// Index sort key, table partition key, table sort key.
type IndexPosition = (
    SortableAttributeValue,
    SortableAttributeValue,
    SortableAttributeValue,
);

fn index_value(item: &Item, attr: &str) -> Option<SortableAttributeValue> {
    item.get(attr)
        .and_then(|v| SortableAttributeValue::from_attribute_value(attr, v).ok())
}

/// Take up to `limit` matching entries strictly after `start` in the walk
/// direction.
fn select<'a, K: Ord + 'a>(
    entries: impl DoubleEndedIterator<Item = (&'a K, &'a Item)>,
    matches: impl Fn(&K) -> bool,
    start: Option<&K>,
    forward: bool,
    limit: Option<usize>,
) -> Evaluated {
    let iter: Box<dyn Iterator<Item = (&'a K, &'a Item)>> = if forward {
        Box::new(entries)
    } else {
        Box::new(entries.rev())
    };
    let after_start = |k: &K| match start {
        Some(s) if forward => k > s,
        Some(s) => k < s,
        None => true,
    };

    let limit = limit.unwrap_or(usize::MAX);
    let mut items: Vec<Item> = iter
        .filter(|(k, _)| after_start(k) && matches(k))
        .take(limit.saturating_add(1))
        .map(|(_, item)| item.clone())
        .collect();
    let truncated = items.len() > limit;
    items.truncate(limit);
    Evaluated { items, truncated }
}

/// Extract the primary key of `item` under `schema`.
pub fn extract_key(schema: &KeySchema, item: &Item) -> Result<PrimaryKey, StorageError> {
    let get = |attr: &str| {
        item.get(attr)
            .ok_or_else(|| StorageError::MissingKeyAttribute {
                attr: attr.to_owned(),
            })
            .and_then(|v| SortableAttributeValue::from_attribute_value(attr, v))
    };
    Ok(PrimaryKey {
        partition_key: get(&schema.partition_key)?,
        sort_key: match &schema.sort_key {
            Some(attr) => get(attr)?,
            None => SortableAttributeValue::Sentinel,
        },
    })
}
