//! Table client: assembles store requests from native values.
//!
//! Every payload crosses the codec on the way out and on the way back.
//! Store failures are passed through untouched except conditional-check
//! failures, which become [`Error::ConditionalWriteFailed`].

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use dynadoc_model::input::{
    DeleteItemInput, GetItemInput, PutItemInput, QueryInput, ScanInput, UpdateItemInput,
};
use dynadoc_model::types::ReturnValue;
use dynadoc_model::{Key, StoreOperation};

use crate::codec::Codec;
use crate::config::DynadocConfig;
use crate::error::{Error, Result};
use crate::expression::{BuiltExpressions, ExpressionBuilder, UpdateDocument};
use crate::query::{ContinuationToken, Page, Query};
use crate::schema::TableSchema;
use crate::transport::Transport;
use crate::value::{Item, Number, Value, from_value, to_value};

/// A table reached through a [`Transport`].
#[derive(Debug, Clone)]
pub struct Table<T> {
    pub(crate) name: String,
    pub(crate) schema: TableSchema,
    pub(crate) transport: T,
    pub(crate) codec: Codec,
    pub(crate) config: DynadocConfig,
}

impl<T: Transport> Table<T> {
    /// A client for `name` using the default configuration.
    #[must_use]
    pub fn new(transport: T, name: impl Into<String>, schema: TableSchema) -> Self {
        Self::with_config(transport, name, schema, DynadocConfig::default())
    }

    /// A client for `name` using `config`.
    #[must_use]
    pub fn with_config(
        transport: T,
        name: impl Into<String>,
        schema: TableSchema,
        config: DynadocConfig,
    ) -> Self {
        Self {
            name: name.into(),
            schema,
            transport,
            codec: Codec::new(config.codec_options()),
            config,
        }
    }

    /// Table name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Table key schema.
    #[must_use]
    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// The codec used for every payload.
    #[must_use]
    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    /// Project the key attributes out of an item.
    pub fn key_of(&self, item: &Item) -> Result<Item> {
        self.schema
            .key_attributes()
            .map(|attr| {
                item.get(attr)
                    .filter(|v| !v.is_undefined())
                    .map(|v| (attr.to_owned(), v.clone()))
                    .ok_or_else(|| {
                        Error::InvalidQueryShape(format!(
                            "key attribute '{attr}' is missing for table {}",
                            self.name
                        ))
                    })
            })
            .collect()
    }

    /// Fetch one item by key.
    pub async fn get(&self, key: &Item) -> Result<Option<Item>> {
        let input = GetItemInput {
            table_name: self.name.clone(),
            key: self.encode_key(key)?,
            consistent_read: self.config.consistent_read.then_some(true),
            ..GetItemInput::default()
        };
        self.log_request(StoreOperation::GetItem);
        let output = self
            .transport
            .get_item(input)
            .await
            .map_err(|e| Error::from_store(&self.name, e))?;
        output
            .item
            .map(|item| self.codec.decode_item(&item).map_err(Error::from))
            .transpose()
    }

    /// Insert or replace an item, optionally guarded by a one-field condition.
    pub async fn put(&self, item: &Item, condition: Option<&Value>) -> Result<()> {
        let built = self.condition_only(condition)?;
        let input = PutItemInput {
            table_name: self.name.clone(),
            item: self.codec.encode_item(item)?,
            condition_expression: built.condition,
            expression_attribute_names: built.names,
            expression_attribute_values: built.values,
            ..PutItemInput::default()
        };
        self.log_request(StoreOperation::PutItem);
        self.transport
            .put_item(input)
            .await
            .map_err(|e| Error::from_store(&self.name, e))?;
        Ok(())
    }

    /// Delete an item, returning it if it existed.
    pub async fn delete(&self, key: &Item, condition: Option<&Value>) -> Result<Option<Item>> {
        let built = self.condition_only(condition)?;
        let input = DeleteItemInput {
            table_name: self.name.clone(),
            key: self.encode_key(key)?,
            condition_expression: built.condition,
            expression_attribute_names: built.names,
            expression_attribute_values: built.values,
            return_values: Some(ReturnValue::AllOld),
        };
        self.log_request(StoreOperation::DeleteItem);
        let output = self
            .transport
            .delete_item(input)
            .await
            .map_err(|e| Error::from_store(&self.name, e))?;
        if output.attributes.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.codec.decode_item(&output.attributes)?))
    }

    /// Apply an update document and return the item as it is afterwards.
    pub async fn update(
        &self,
        key: &Item,
        update: UpdateDocument,
        condition: Option<&Value>,
    ) -> Result<Item> {
        let mut builder = ExpressionBuilder::with_codec(self.codec).update(update);
        if let Some(condition) = condition {
            builder = builder.condition(condition)?;
        }
        let built = builder.build()?;
        let input = UpdateItemInput {
            table_name: self.name.clone(),
            key: self.encode_key(key)?,
            update_expression: built.update,
            condition_expression: built.condition,
            expression_attribute_names: built.names,
            expression_attribute_values: built.values,
            return_values: Some(ReturnValue::AllNew),
            ..UpdateItemInput::default()
        };
        self.log_request(StoreOperation::UpdateItem);
        let output = self
            .transport
            .update_item(input)
            .await
            .map_err(|e| Error::from_store(&self.name, e))?;
        Ok(self.codec.decode_item(&output.attributes)?)
    }

    /// Atomically add `delta` to a numeric field and return the new value.
    pub async fn increment(
        &self,
        key: &Item,
        field: &str,
        delta: impl Into<Number>,
    ) -> Result<Number> {
        let item = self
            .update(key, UpdateDocument::new().increment(field, delta), None)
            .await?;
        match item.get(field) {
            Some(Value::Number(n)) => Ok(n.clone()),
            other => Err(Error::UnsupportedValueShape(format!(
                "'{field}' is {} after increment",
                other.map_or("absent", Value::kind)
            ))),
        }
    }

    /// Fetch one page of a query.
    pub async fn query(&self, query: &Query) -> Result<Page<Item>> {
        let built = query.expressions.clone_with_codec(self.codec).build()?;
        let input = QueryInput {
            table_name: self.name.clone(),
            index_name: query.index.clone(),
            key_condition_expression: built.key_condition,
            filter_expression: built.filter,
            projection_expression: built.projection,
            expression_attribute_names: built.names,
            expression_attribute_values: built.values,
            scan_index_forward: (!query.forward).then_some(false),
            limit: query.limit.or(self.config.page_size),
            exclusive_start_key: query
                .start
                .clone()
                .map(ContinuationToken::into_start_key)
                .unwrap_or_default(),
            consistent_read: (self.config.consistent_read && query.index.is_none())
                .then_some(true),
            ..QueryInput::default()
        };
        debug!(
            operation = %StoreOperation::Query,
            table = %self.name,
            index = ?query.index,
            resumed = query.start.is_some(),
            "sending request"
        );
        let output = self
            .transport
            .query(input)
            .await
            .map_err(|e| Error::from_store(&self.name, e))?;
        self.page(output.items, output.scanned_count, output.last_evaluated_key)
    }

    /// Run a query to completion, following continuation tokens.
    pub async fn query_all(&self, mut query: Query) -> Result<Vec<Item>> {
        let mut items = Vec::new();
        let mut pages = 0_usize;
        loop {
            let page = self.query(&query).await?;
            pages += 1;
            items.extend(page.items);
            match page.next {
                Some(token) => query.start = Some(token),
                None => break,
            }
        }
        debug!(table = %self.name, pages, items = items.len(), "query complete");
        Ok(items)
    }

    /// Fetch one page of a full-table scan.
    pub async fn scan(
        &self,
        filter: Option<&Value>,
        start: Option<ContinuationToken>,
    ) -> Result<Page<Item>> {
        let mut builder = ExpressionBuilder::with_codec(self.codec);
        if let Some(filter) = filter {
            builder = builder.filter(filter)?;
        }
        let built = builder.build()?;
        let input = ScanInput {
            table_name: self.name.clone(),
            filter_expression: built.filter,
            expression_attribute_names: built.names,
            expression_attribute_values: built.values,
            limit: self.config.page_size,
            exclusive_start_key: start
                .map(ContinuationToken::into_start_key)
                .unwrap_or_default(),
            consistent_read: self.config.consistent_read.then_some(true),
            ..ScanInput::default()
        };
        self.log_request(StoreOperation::Scan);
        let output = self
            .transport
            .scan(input)
            .await
            .map_err(|e| Error::from_store(&self.name, e))?;
        self.page(output.items, output.scanned_count, output.last_evaluated_key)
    }

    /// Scan the whole table.
    pub async fn scan_all(&self, filter: Option<&Value>) -> Result<Vec<Item>> {
        let mut items = Vec::new();
        let mut start = None;
        loop {
            let page = self.scan(filter, start).await?;
            items.extend(page.items);
            match page.next {
                Some(token) => start = Some(token),
                None => break,
            }
        }
        Ok(items)
    }

    /// Store a serializable record as an item.
    pub async fn put_record<R: Serialize>(
        &self,
        record: &R,
        condition: Option<&Value>,
    ) -> Result<()> {
        match to_value(record)? {
            Value::Map(item) => self.put(&item, condition).await,
            other => Err(Error::UnsupportedValueShape(format!(
                "a record must serialize to a map, got {}",
                other.kind()
            ))),
        }
    }

    /// Fetch an item and deserialize it into a record.
    pub async fn get_record<R: DeserializeOwned>(&self, key: &Item) -> Result<Option<R>> {
        self.get(key)
            .await?
            .map(|item| from_value(&Value::Map(item)))
            .transpose()
    }

    pub(crate) fn encode_key(&self, key: &Item) -> Result<Key> {
        Ok(self.codec.encode_item(key)?)
    }

    pub(crate) fn log_request(&self, operation: StoreOperation) {
        debug!(operation = %operation, table = %self.name, "sending request");
    }

    fn condition_only(&self, condition: Option<&Value>) -> Result<BuiltExpressions> {
        match condition {
            Some(condition) => Ok(ExpressionBuilder::with_codec(self.codec)
                .condition(condition)?
                .build()?),
            None => Ok(BuiltExpressions::default()),
        }
    }

    fn page(
        &self,
        items: Vec<dynadoc_model::Item>,
        scanned_count: i32,
        last_evaluated_key: Key,
    ) -> Result<Page<Item>> {
        let items = items
            .iter()
            .map(|item| self.codec.decode_item(item))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(table = %self.name, items = items.len(), scanned_count, "page received");
        Ok(Page {
            items,
            scanned_count: usize::try_from(scanned_count).unwrap_or_default(),
            next: ContinuationToken::from_last_evaluated(last_evaluated_key),
        })
    }
}
