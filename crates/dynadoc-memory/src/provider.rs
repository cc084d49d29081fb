//! Request handlers of the in-memory store.
//!
//! Each `handle_*` method validates its input, parses the request's
//! expressions once, and runs against [`TableStorage`]. Writes that read
//! the current item (conditions, updates) go through
//! [`TableStorage::modify_item`] so the read and the write are atomic.
//!
//! [`TableStorage`]: crate::storage::TableStorage
//! [`TableStorage::modify_item`]: crate::storage::TableStorage::modify_item

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::debug;

use dynadoc_core::Number;
use dynadoc_model::input::{
    BatchGetItemInput, BatchWriteItemInput, DeleteItemInput, GetItemInput, PutItemInput,
    QueryInput, ScanInput, UpdateItemInput,
};
use dynadoc_model::output::{
    BatchGetItemOutput, BatchWriteItemOutput, DeleteItemOutput, GetItemOutput, PutItemOutput,
    QueryOutput, ScanOutput, UpdateItemOutput,
};
use dynadoc_model::types::{KeysAndAttributes, ReturnValue, Select, WriteRequest};
use dynadoc_model::{AttributeValue, StoreError};

use crate::expression::ast::{CompareOp, Function, Operand};
use crate::expression::{
    Condition, EvalContext, ExpressionError, Path, References, parse_condition, parse_projection,
    parse_update,
};
use crate::state::{MemoryState, MemoryTable};
use crate::storage::{
    Evaluated, Item, KeySchema, PrimaryKey, SortKeyCondition, SortableAttributeValue,
    StorageError, extract_key,
};

const MAX_BATCH_GET_KEYS: usize = 100;
const MAX_BATCH_WRITE_REQUESTS: usize = 25;

/// Operation handlers over a [`MemoryState`].
#[derive(Debug, Default)]
pub struct MemoryProvider {
    state: MemoryState,
    unprocessed_budget: AtomicUsize,
}

impl MemoryProvider {
    /// A provider with no tables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The table registry.
    #[must_use]
    pub fn state(&self) -> &MemoryState {
        &self.state
    }

    /// Hand back the next `n` batch entries as unprocessed.
    pub fn set_unprocessed_budget(&self, n: usize) {
        self.unprocessed_budget.store(n, Ordering::SeqCst);
    }

    /// Batch entries still to be handed back unprocessed.
    #[must_use]
    pub fn unprocessed_budget(&self) -> usize {
        self.unprocessed_budget.load(Ordering::SeqCst)
    }

    fn withhold(&self) -> bool {
        self.unprocessed_budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    // -----------------------------------------------------------------------
    // Item CRUD
    // -----------------------------------------------------------------------

    /// Handle `GetItem`.
    pub fn handle_get_item(&self, input: GetItemInput) -> Result<GetItemOutput, StoreError> {
        let table = self.state.require_table(&input.table_name)?;
        let key = validate_key(table.key_schema(), &input.key)?;

        let projection = input
            .projection_expression
            .as_deref()
            .map(parse_projection)
            .transpose()
            .map_err(expression_error)?;
        let mut refs = References::default();
        if let Some(paths) = &projection {
            refs.projection(paths);
        }
        let no_values = HashMap::new();
        check_references(&refs, &input.expression_attribute_names, &no_values)?;

        let ctx = EvalContext::new(&input.expression_attribute_names, &no_values);
        let item = table
            .storage
            .get_item(&key)
            .map(|item| project(&ctx, item, projection.as_deref()))
            .transpose()?;
        Ok(GetItemOutput { item })
    }

    /// Handle `PutItem`.
    pub fn handle_put_item(&self, input: PutItemInput) -> Result<PutItemOutput, StoreError> {
        let table = self.state.require_table(&input.table_name)?;
        let return_values = input.return_values.unwrap_or_default();
        if return_values == ReturnValue::AllNew {
            return Err(StoreError::validation(format!(
                "Return values set to invalid value for this operation: {return_values}"
            )));
        }
        validate_item(&input.item)?;
        let key = table
            .storage
            .primary_key(&input.item)
            .map_err(storage_error)?;

        let condition = parse_optional_condition(input.condition_expression.as_deref())?;
        let mut refs = References::default();
        if let Some(c) = &condition {
            refs.condition(c);
        }
        check_references(
            &refs,
            &input.expression_attribute_names,
            &input.expression_attribute_values,
        )?;

        let ctx = EvalContext::new(
            &input.expression_attribute_names,
            &input.expression_attribute_values,
        );
        let on_failure = input.return_values_on_condition_check_failure;
        let item = input.item;
        let old = table.storage.modify_item(&key, |old| {
            check_condition(&ctx, condition.as_ref(), old, on_failure)?;
            Ok::<_, StoreError>((Some(item), old.cloned()))
        })?;

        Ok(PutItemOutput {
            attributes: match return_values {
                ReturnValue::AllOld => old.unwrap_or_default(),
                _ => Item::new(),
            },
        })
    }

    /// Handle `UpdateItem`. A missing item is created from its key.
    pub fn handle_update_item(
        &self,
        input: UpdateItemInput,
    ) -> Result<UpdateItemOutput, StoreError> {
        let table = self.state.require_table(&input.table_name)?;
        let key = validate_key(table.key_schema(), &input.key)?;

        let update = input
            .update_expression
            .as_deref()
            .map(parse_update)
            .transpose()
            .map_err(expression_error)?;
        let condition = parse_optional_condition(input.condition_expression.as_deref())?;

        let mut refs = References::default();
        if let Some(u) = &update {
            refs.update(u);
        }
        if let Some(c) = &condition {
            refs.condition(c);
        }
        check_references(
            &refs,
            &input.expression_attribute_names,
            &input.expression_attribute_values,
        )?;
        validate_values(&input.expression_attribute_values)?;

        let ctx = EvalContext::new(
            &input.expression_attribute_names,
            &input.expression_attribute_values,
        );
        if let Some(update) = &update {
            for target in update.targets() {
                let attr = target
                    .head()
                    .map(|name| ctx.resolve_name(name))
                    .transpose()
                    .map_err(expression_error)?;
                if let Some(attr) =
                    attr.filter(|a| table.key_schema().attributes().any(|k| k == a))
                {
                    return Err(StoreError::validation(format!(
                        "Cannot update attribute {attr}. This attribute is part of the key"
                    )));
                }
            }
        }

        let on_failure = input.return_values_on_condition_check_failure;
        let key_item = input.key;
        let (old, new) = table.storage.modify_item(&key, |old| {
            check_condition(&ctx, condition.as_ref(), old, on_failure)?;
            let mut new = old.cloned().unwrap_or_else(|| key_item.clone());
            if let Some(update) = &update {
                ctx.apply_update(&mut new, update).map_err(expression_error)?;
            }
            validate_item(&new)?;
            Ok::<_, StoreError>((Some(new.clone()), (old.cloned(), new)))
        })?;

        Ok(UpdateItemOutput {
            attributes: match input.return_values.unwrap_or_default() {
                ReturnValue::None => Item::new(),
                ReturnValue::AllOld => old.unwrap_or_default(),
                ReturnValue::AllNew => new,
            },
        })
    }

    /// Handle `DeleteItem`.
    pub fn handle_delete_item(
        &self,
        input: DeleteItemInput,
    ) -> Result<DeleteItemOutput, StoreError> {
        let table = self.state.require_table(&input.table_name)?;
        let return_values = input.return_values.unwrap_or_default();
        if return_values == ReturnValue::AllNew {
            return Err(StoreError::validation(format!(
                "Return values set to invalid value for this operation: {return_values}"
            )));
        }
        let key = validate_key(table.key_schema(), &input.key)?;

        let condition = parse_optional_condition(input.condition_expression.as_deref())?;
        let mut refs = References::default();
        if let Some(c) = &condition {
            refs.condition(c);
        }
        check_references(
            &refs,
            &input.expression_attribute_names,
            &input.expression_attribute_values,
        )?;

        let ctx = EvalContext::new(
            &input.expression_attribute_names,
            &input.expression_attribute_values,
        );
        let old = table.storage.modify_item(&key, |old| {
            check_condition(&ctx, condition.as_ref(), old, None)?;
            Ok::<_, StoreError>((None, old.cloned()))
        })?;

        Ok(DeleteItemOutput {
            attributes: match return_values {
                ReturnValue::AllOld => old.unwrap_or_default(),
                _ => Item::new(),
            },
        })
    }

    // -----------------------------------------------------------------------
    // Query & Scan
    // -----------------------------------------------------------------------

    /// Handle `Query`.
    ///
    /// `Limit` counts items read before the filter; `LastEvaluatedKey` is set
    /// only when the limit cut the page short.
    pub fn handle_query(&self, input: QueryInput) -> Result<QueryOutput, StoreError> {
        let table = self.state.require_table(&input.table_name)?;
        let limit = page_limit(input.limit)?;
        let select = validate_select(input.select, input.projection_expression.is_some())?;
        let index = input
            .index_name
            .as_deref()
            .map(|name| table.require_index(name))
            .transpose()?;
        let key_schema = index.unwrap_or_else(|| table.key_schema());

        let key_condition = input
            .key_condition_expression
            .as_deref()
            .ok_or_else(|| {
                StoreError::validation(
                    "Either the KeyConditions or KeyConditionExpression parameter must be specified",
                )
            })
            .and_then(|text| parse_condition(text).map_err(expression_error))?;
        let filter = parse_optional_condition(input.filter_expression.as_deref())?;
        let projection = input
            .projection_expression
            .as_deref()
            .map(parse_projection)
            .transpose()
            .map_err(expression_error)?;

        let mut refs = References::default();
        refs.condition(&key_condition);
        if let Some(f) = &filter {
            refs.condition(f);
        }
        if let Some(p) = &projection {
            refs.projection(p);
        }
        check_references(
            &refs,
            &input.expression_attribute_names,
            &input.expression_attribute_values,
        )?;

        let ctx = EvalContext::new(
            &input.expression_attribute_names,
            &input.expression_attribute_values,
        );
        let (partition, sort) = key_condition_parts(&ctx, &key_condition, key_schema)?;
        let forward = input.scan_index_forward.unwrap_or(true);
        let start = (!input.exclusive_start_key.is_empty()).then_some(&input.exclusive_start_key);

        let evaluated = match index {
            Some(index) => table.storage.query_index(
                index,
                &partition,
                sort.as_ref(),
                forward,
                limit,
                start,
            ),
            None => {
                let start = start
                    .map(|k| table.storage.primary_key(k))
                    .transpose()
                    .map_err(storage_error)?;
                table.storage.query(
                    &partition,
                    sort.as_ref(),
                    forward,
                    limit,
                    start.as_ref().map(|k| &k.sort_key),
                )
            }
        };

        let page = finish_page(
            &table,
            &ctx,
            evaluated,
            filter.as_ref(),
            projection.as_deref(),
            index,
        )?;
        debug!(table = %table.name, count = page.count, scanned = page.scanned_count, "query page");
        Ok(QueryOutput {
            items: if select == Select::Count { Vec::new() } else { page.items },
            count: page.count,
            scanned_count: page.scanned_count,
            last_evaluated_key: page.last_evaluated_key,
        })
    }

    /// Handle `Scan` over the base table, in key order.
    pub fn handle_scan(&self, input: ScanInput) -> Result<ScanOutput, StoreError> {
        let table = self.state.require_table(&input.table_name)?;
        if let Some(index) = &input.index_name {
            return Err(StoreError::validation(format!(
                "Scanning secondary index {index} is not supported"
            )));
        }
        let limit = page_limit(input.limit)?;
        let select = validate_select(input.select, input.projection_expression.is_some())?;

        let filter = parse_optional_condition(input.filter_expression.as_deref())?;
        let projection = input
            .projection_expression
            .as_deref()
            .map(parse_projection)
            .transpose()
            .map_err(expression_error)?;

        let mut refs = References::default();
        if let Some(f) = &filter {
            refs.condition(f);
        }
        if let Some(p) = &projection {
            refs.projection(p);
        }
        check_references(
            &refs,
            &input.expression_attribute_names,
            &input.expression_attribute_values,
        )?;

        let ctx = EvalContext::new(
            &input.expression_attribute_names,
            &input.expression_attribute_values,
        );
        let start = (!input.exclusive_start_key.is_empty())
            .then(|| table.storage.primary_key(&input.exclusive_start_key))
            .transpose()
            .map_err(storage_error)?;
        let evaluated = table.storage.scan(limit, start.as_ref());

        let page = finish_page(
            &table,
            &ctx,
            evaluated,
            filter.as_ref(),
            projection.as_deref(),
            None,
        )?;
        debug!(table = %table.name, count = page.count, scanned = page.scanned_count, "scan page");
        Ok(ScanOutput {
            items: if select == Select::Count { Vec::new() } else { page.items },
            count: page.count,
            scanned_count: page.scanned_count,
            last_evaluated_key: page.last_evaluated_key,
        })
    }

    // -----------------------------------------------------------------------
    // Batch operations
    // -----------------------------------------------------------------------

    /// Handle `BatchGetItem`. Keys consumed by the unprocessed budget come
    /// back in `UnprocessedKeys`.
    pub fn handle_batch_get_item(
        &self,
        input: BatchGetItemInput,
    ) -> Result<BatchGetItemOutput, StoreError> {
        let total: usize = input.request_items.values().map(|k| k.keys.len()).sum();
        if total > MAX_BATCH_GET_KEYS {
            return Err(StoreError::validation(format!(
                "Too many items requested for the BatchGetItem call: {total} exceeds the limit of {MAX_BATCH_GET_KEYS}"
            )));
        }

        let mut output = BatchGetItemOutput::default();
        for (table_name, request) in input.request_items {
            let table = self.state.require_table(&table_name)?;
            let projection = request
                .projection_expression
                .as_deref()
                .map(parse_projection)
                .transpose()
                .map_err(expression_error)?;
            let no_values = HashMap::new();
            let ctx = EvalContext::new(&request.expression_attribute_names, &no_values);

            let mut found = Vec::new();
            let mut withheld = Vec::new();
            for key in &request.keys {
                let primary = validate_key(table.key_schema(), key)?;
                if self.withhold() {
                    withheld.push(key.clone());
                    continue;
                }
                if let Some(item) = table.storage.get_item(&primary) {
                    found.push(project(&ctx, item, projection.as_deref())?);
                }
            }

            if !withheld.is_empty() {
                debug!(table = %table_name, keys = withheld.len(), "withholding batch get keys");
                output.unprocessed_keys.insert(
                    table_name.clone(),
                    KeysAndAttributes {
                        keys: withheld,
                        ..request
                    },
                );
            }
            output.responses.insert(table_name, found);
        }
        Ok(output)
    }

    /// Handle `BatchWriteItem`. Every request is validated before any is
    /// applied; requests consumed by the unprocessed budget come back in
    /// `UnprocessedItems`.
    pub fn handle_batch_write_item(
        &self,
        input: BatchWriteItemInput,
    ) -> Result<BatchWriteItemOutput, StoreError> {
        let total: usize = input.request_items.values().map(Vec::len).sum();
        if total > MAX_BATCH_WRITE_REQUESTS {
            return Err(StoreError::validation(format!(
                "Too many items in the BatchWriteItem request; the request length {total} exceeds the limit of {MAX_BATCH_WRITE_REQUESTS}"
            )));
        }

        let mut planned: Vec<(Arc<MemoryTable>, Vec<(PrimaryKey, WriteRequest)>)> =
            Vec::with_capacity(input.request_items.len());
        for (table_name, requests) in input.request_items {
            let table = self.state.require_table(&table_name)?;
            let mut keyed: Vec<(PrimaryKey, WriteRequest)> = Vec::with_capacity(requests.len());
            for request in requests {
                let key = match (&request.put_request, &request.delete_request) {
                    (Some(put), None) => {
                        validate_item(&put.item)?;
                        table.storage.primary_key(&put.item).map_err(storage_error)?
                    }
                    (None, Some(delete)) => validate_key(table.key_schema(), &delete.key)?,
                    _ => {
                        return Err(StoreError::validation(
                            "Each write request must contain exactly one of PutRequest or DeleteRequest",
                        ));
                    }
                };
                if keyed.iter().any(|(k, _)| *k == key) {
                    return Err(StoreError::validation(
                        "Provided list of item keys contains duplicates",
                    ));
                }
                keyed.push((key, request));
            }
            planned.push((table, keyed));
        }

        let mut output = BatchWriteItemOutput::default();
        for (table, requests) in planned {
            let mut withheld = Vec::new();
            for (key, request) in requests {
                if self.withhold() {
                    withheld.push(request);
                    continue;
                }
                match request.put_request {
                    Some(put) => {
                        table.storage.put_item(put.item).map_err(storage_error)?;
                    }
                    None => {
                        table.storage.delete_item(&key);
                    }
                }
            }
            if !withheld.is_empty() {
                debug!(table = %table.name, requests = withheld.len(), "withholding batch writes");
                output.unprocessed_items.insert(table.name.clone(), withheld);
            }
        }
        Ok(output)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct FinishedPage {
    items: Vec<Item>,
    count: i32,
    scanned_count: i32,
    last_evaluated_key: Item,
}

fn finish_page(
    table: &MemoryTable,
    ctx: &EvalContext<'_>,
    evaluated: Evaluated,
    filter: Option<&Condition>,
    projection: Option<&[Path]>,
    index: Option<&KeySchema>,
) -> Result<FinishedPage, StoreError> {
    let last_evaluated_key = match (evaluated.truncated, evaluated.items.last()) {
        (true, Some(last)) => table.storage.last_evaluated_key(last, index),
        _ => Item::new(),
    };
    let scanned = evaluated.items.len();

    let mut items = Vec::with_capacity(scanned);
    for item in evaluated.items {
        let keep = match filter {
            Some(f) => ctx.evaluate(f, &item).map_err(expression_error)?,
            None => true,
        };
        if keep {
            items.push(project(ctx, item, projection)?);
        }
    }

    Ok(FinishedPage {
        count: i32::try_from(items.len()).unwrap_or(i32::MAX),
        scanned_count: i32::try_from(scanned).unwrap_or(i32::MAX),
        items,
        last_evaluated_key,
    })
}

fn project(
    ctx: &EvalContext<'_>,
    item: Item,
    projection: Option<&[Path]>,
) -> Result<Item, StoreError> {
    match projection {
        Some(paths) => ctx.project(&item, paths).map_err(expression_error),
        None => Ok(item),
    }
}

fn parse_optional_condition(text: Option<&str>) -> Result<Option<Condition>, StoreError> {
    text.map(parse_condition).transpose().map_err(expression_error)
}

/// Fail with `ConditionalCheckFailedException` if `condition` is false for
/// the current item.
fn check_condition(
    ctx: &EvalContext<'_>,
    condition: Option<&Condition>,
    current: Option<&Item>,
    on_failure: Option<ReturnValue>,
) -> Result<(), StoreError> {
    let Some(condition) = condition else {
        return Ok(());
    };
    let empty = Item::new();
    if ctx
        .evaluate(condition, current.unwrap_or(&empty))
        .map_err(expression_error)?
    {
        return Ok(());
    }
    let err = StoreError::conditional_check_failed("The conditional request failed");
    Err(match (on_failure, current) {
        (Some(ReturnValue::AllOld), Some(item)) => err.with_item(item.clone()),
        _ => err,
    })
}

/// Split a key condition into the partition value and the sort-key range.
fn key_condition_parts(
    ctx: &EvalContext<'_>,
    condition: &Condition,
    schema: &KeySchema,
) -> Result<(SortableAttributeValue, Option<SortKeyCondition>), StoreError> {
    let invalid = |detail: &str| {
        StoreError::validation(format!("Query key condition not supported: {detail}"))
    };
    let parts: Vec<&Condition> = match condition {
        Condition::And(a, b) => vec![a.as_ref(), b.as_ref()],
        other => vec![other],
    };

    let attribute = |operand: &Operand| -> Result<String, StoreError> {
        match operand {
            Operand::Path(path) if path.0.len() == 1 => path
                .head()
                .ok_or_else(|| invalid("key attribute must be a name"))
                .and_then(|name| ctx.resolve_name(name).map_err(expression_error)),
            _ => Err(invalid("key attribute must be a top-level name")),
        }
    };
    let value = |attr: &str, operand: &Operand| -> Result<SortableAttributeValue, StoreError> {
        let Operand::Value(name) = operand else {
            return Err(invalid("key values must be placeholders"));
        };
        let value = ctx.resolve_value(name).map_err(expression_error)?;
        SortableAttributeValue::from_attribute_value(attr, value).map_err(storage_error)
    };

    let mut partition = None;
    let mut sort = None;
    let is_sort_key = |attr: &str| schema.sort_key.as_deref() == Some(attr);

    for part in parts {
        match part {
            Condition::Compare { left, op, right } => {
                let attr = attribute(left)?;
                let v = value(&attr, right)?;
                if attr == schema.partition_key && *op == CompareOp::Eq && partition.is_none() {
                    partition = Some(v);
                } else if is_sort_key(&attr) && sort.is_none() {
                    sort = Some(match op {
                        CompareOp::Eq => SortKeyCondition::Eq(v),
                        CompareOp::Lt => SortKeyCondition::Lt(v),
                        CompareOp::Le => SortKeyCondition::Le(v),
                        CompareOp::Gt => SortKeyCondition::Gt(v),
                        CompareOp::Ge => SortKeyCondition::Ge(v),
                        CompareOp::Ne => return Err(invalid("<> is not allowed on a key")),
                    });
                } else {
                    return Err(invalid(&format!("unexpected condition on {attr}")));
                }
            }
            Condition::Between { value: v, low, high } => {
                let attr = attribute(v)?;
                if !is_sort_key(&attr) || sort.is_some() {
                    return Err(invalid(&format!("BETWEEN on {attr}")));
                }
                let (lo, hi) = (value(&attr, low)?, value(&attr, high)?);
                if lo > hi {
                    return Err(StoreError::validation(
                        "Invalid KeyConditionExpression: the BETWEEN lower bound is greater than the upper bound",
                    ));
                }
                sort = Some(SortKeyCondition::Between(lo, hi));
            }
            Condition::Function {
                function: Function::BeginsWith,
                args,
            } if args.len() == 2 => {
                let attr = attribute(&args[0])?;
                if !is_sort_key(&attr) || sort.is_some() {
                    return Err(invalid(&format!("begins_with on {attr}")));
                }
                sort = Some(SortKeyCondition::BeginsWith(value(&attr, &args[1])?));
            }
            _ => return Err(invalid("only AND of a partition match and one sort condition")),
        }
    }

    let partition =
        partition.ok_or_else(|| invalid("missing equality on the partition key"))?;
    Ok((partition, sort))
}

/// Every supplied placeholder must be used and every used one supplied.
fn check_references(
    refs: &References,
    names: &HashMap<String, String>,
    values: &HashMap<String, AttributeValue>,
) -> Result<(), StoreError> {
    let mut unused: Vec<&str> = names
        .keys()
        .filter(|k| !refs.names.contains(k.as_str()))
        .map(String::as_str)
        .collect();
    if !unused.is_empty() {
        unused.sort_unstable();
        return Err(StoreError::validation(format!(
            "Value provided in ExpressionAttributeNames unused in expressions: keys: {{{}}}",
            unused.join(", ")
        )));
    }
    let mut unused: Vec<&str> = values
        .keys()
        .filter(|k| !refs.values.contains(k.as_str()))
        .map(String::as_str)
        .collect();
    if !unused.is_empty() {
        unused.sort_unstable();
        return Err(StoreError::validation(format!(
            "Value provided in ExpressionAttributeValues unused in expressions: keys: {{{}}}",
            unused.join(", ")
        )));
    }
    if let Some(name) = refs.names.iter().find(|n| !names.contains_key(n.as_str())) {
        return Err(expression_error(ExpressionError::UnresolvedName(name.clone())));
    }
    if let Some(value) = refs.values.iter().find(|v| !values.contains_key(v.as_str())) {
        return Err(expression_error(ExpressionError::UnresolvedValue(value.clone())));
    }
    Ok(())
}

/// A key map must hold exactly the schema's key attributes.
fn validate_key(schema: &KeySchema, key: &Item) -> Result<PrimaryKey, StoreError> {
    if key.len() != schema.attributes().count() {
        return Err(StoreError::validation(
            "The provided key element does not match the schema",
        ));
    }
    extract_key(schema, key).map_err(storage_error)
}

fn validate_item(item: &Item) -> Result<(), StoreError> {
    item.values().try_for_each(validate_value)
}

fn validate_values(values: &HashMap<String, AttributeValue>) -> Result<(), StoreError> {
    values.values().try_for_each(validate_value)
}

/// Numbers must be valid decimals and sets non-empty.
fn validate_value(value: &AttributeValue) -> Result<(), StoreError> {
    if value.is_empty_set() {
        return Err(StoreError::validation(
            "One or more parameter values were invalid: An empty set is not allowed",
        ));
    }
    let number = |n: &String| {
        Number::parse(n)
            .map(drop)
            .map_err(|e| StoreError::validation(e.to_string()))
    };
    match value {
        AttributeValue::N(n) => number(n),
        AttributeValue::Ns(ns) => ns.iter().try_for_each(number),
        AttributeValue::L(list) => list.iter().try_for_each(validate_value),
        AttributeValue::M(map) => map.values().try_for_each(validate_value),
        _ => Ok(()),
    }
}

fn validate_select(select: Option<Select>, has_projection: bool) -> Result<Select, StoreError> {
    let select = select.unwrap_or(if has_projection {
        Select::SpecificAttributes
    } else {
        Select::AllAttributes
    });
    match (select, has_projection) {
        (Select::SpecificAttributes, false) => Err(StoreError::validation(
            "Select SPECIFIC_ATTRIBUTES requires a ProjectionExpression",
        )),
        (Select::Count | Select::AllAttributes, true) => Err(StoreError::validation(
            "Cannot specify a ProjectionExpression unless Select is SPECIFIC_ATTRIBUTES",
        )),
        _ => Ok(select),
    }
}

fn page_limit(limit: Option<i32>) -> Result<Option<usize>, StoreError> {
    limit
        .map(|l| {
            usize::try_from(l)
                .ok()
                .filter(|l| *l > 0)
                .ok_or_else(|| StoreError::validation("Limit must be greater than 0"))
        })
        .transpose()
}

fn expression_error(e: ExpressionError) -> StoreError {
    StoreError::validation(format!("Invalid expression: {e}")).with_source(e)
}

fn storage_error(e: StorageError) -> StoreError {
    StoreError::validation(format!(
        "One or more parameter values were invalid: {e}"
    ))
    .with_source(e)
}
