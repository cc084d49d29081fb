//! Chunked batch reads and writes with retry of unprocessed entries.
//!
//! Requests are split into store-sized chunks. Entries the store hands back
//! as unprocessed are resent with exponential backoff until the configured
//! attempt budget runs out; whatever is left is reported per item.

use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, warn};

use dynadoc_model::StoreOperation;
use dynadoc_model::input::{BatchGetItemInput, BatchWriteItemInput};
use dynadoc_model::types::{KeysAndAttributes, WriteRequest};

use crate::client::Table;
use crate::error::{Error, Result};
use crate::transport::Transport;
use crate::value::Item;

/// Most write requests the store accepts in one `BatchWriteItem`.
pub const BATCH_WRITE_CHUNK: usize = 25;
/// Most keys the store accepts in one `BatchGetItem`.
pub const BATCH_GET_CHUNK: usize = 100;

const RETRY_BASE_DELAY: Duration = Duration::from_millis(10);

/// One write of a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Put of a full item.
    Put(Item),
    /// Delete by key.
    Delete(Item),
}

/// Outcome of [`Table::batch_write`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchWriteReport {
    /// Writes the store acknowledged.
    pub written: usize,
    /// Writes still unprocessed after the last attempt.
    pub unprocessed: Vec<WriteOp>,
}

impl BatchWriteReport {
    /// Returns `true` if every write was applied.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.unprocessed.is_empty()
    }
}

/// Outcome of [`Table::batch_get`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchGetReport {
    /// Items found. Order is not related to the key order.
    pub items: Vec<Item>,
    /// Keys still unprocessed after the last attempt.
    pub unprocessed: Vec<Item>,
}

impl BatchGetReport {
    /// Returns `true` if every key was looked up.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.unprocessed.is_empty()
    }
}

fn backoff(attempt: u32) -> Duration {
    RETRY_BASE_DELAY * 2_u32.saturating_pow(attempt.saturating_sub(1)).min(64)
}

impl<T: Transport> Table<T> {
    /// Fetch many items by key, 100 keys per request.
    pub async fn batch_get(&self, keys: &[Item]) -> Result<BatchGetReport> {
        let mut report = BatchGetReport::default();
        let max_attempts = self.config.batch_max_attempts.max(1);

        for chunk in keys.chunks(BATCH_GET_CHUNK) {
            let mut pending = chunk
                .iter()
                .map(|key| self.encode_key(key))
                .collect::<Result<Vec<_>>>()?;
            let mut attempt = 0;

            while !pending.is_empty() && attempt < max_attempts {
                if attempt > 0 {
                    debug!(table = %self.name, attempt, keys = pending.len(), "retrying unprocessed keys");
                    tokio::time::sleep(backoff(attempt)).await;
                }
                attempt += 1;

                let input = BatchGetItemInput {
                    request_items: HashMap::from([(
                        self.name.clone(),
                        KeysAndAttributes {
                            keys: pending,
                            consistent_read: self.config.consistent_read.then_some(true),
                            ..KeysAndAttributes::default()
                        },
                    )]),
                };
                self.log_request(StoreOperation::BatchGetItem);
                let mut output = self
                    .transport
                    .batch_get_item(input)
                    .await
                    .map_err(|e| Error::from_store(&self.name, e))?;

                for item in output.responses.remove(&self.name).unwrap_or_default() {
                    report.items.push(self.codec.decode_item(&item)?);
                }
                pending = output
                    .unprocessed_keys
                    .remove(&self.name)
                    .map(|k| k.keys)
                    .unwrap_or_default();
            }

            if !pending.is_empty() {
                warn!(table = %self.name, keys = pending.len(), attempts = attempt, "batch get left keys unprocessed");
                for key in &pending {
                    report.unprocessed.push(self.codec.decode_item(key)?);
                }
            }
        }
        Ok(report)
    }

    /// Put and delete many items, 25 requests per call.
    ///
    /// Deletes may be given full items; only their key attributes are sent.
    /// If the store fails outright, [`Error::BatchWriteInterrupted`] carries
    /// the progress made so far.
    pub async fn batch_write(&self, puts: &[Item], deletes: &[Item]) -> Result<BatchWriteReport> {
        let mut requests = Vec::with_capacity(puts.len() + deletes.len());
        for item in puts {
            requests.push(WriteRequest::put(self.codec.encode_item(item)?));
        }
        for item in deletes {
            let key = self.key_of(item)?;
            requests.push(WriteRequest::delete(self.encode_key(&key)?));
        }

        let mut report = BatchWriteReport::default();
        let max_attempts = self.config.batch_max_attempts.max(1);

        for (index, chunk) in requests.chunks(BATCH_WRITE_CHUNK).enumerate() {
            let mut pending = chunk.to_vec();
            let mut attempt = 0;

            while !pending.is_empty() && attempt < max_attempts {
                if attempt > 0 {
                    debug!(table = %self.name, attempt, requests = pending.len(), "retrying unprocessed writes");
                    tokio::time::sleep(backoff(attempt)).await;
                }
                attempt += 1;

                let sent = pending.len();
                let input = BatchWriteItemInput {
                    request_items: HashMap::from([(self.name.clone(), pending.clone())]),
                };
                self.log_request(StoreOperation::BatchWriteItem);
                let mut output = match self.transport.batch_write_item(input).await {
                    Ok(output) => output,
                    Err(e) => {
                        let unsent = pending
                            .into_iter()
                            .chain(requests.iter().skip((index + 1) * BATCH_WRITE_CHUNK).cloned());
                        for request in unsent {
                            report.unprocessed.extend(self.write_op(request)?);
                        }
                        warn!(table = %self.name, written = report.written, unprocessed = report.unprocessed.len(), "batch write interrupted");
                        return Err(Error::BatchWriteInterrupted {
                            table: self.name.clone(),
                            report: Box::new(report),
                            source: Box::new(Error::from_store(&self.name, e)),
                        });
                    }
                };

                pending = output
                    .unprocessed_items
                    .remove(&self.name)
                    .unwrap_or_default();
                report.written += sent.saturating_sub(pending.len());
            }

            if !pending.is_empty() {
                warn!(table = %self.name, requests = pending.len(), attempts = attempt, "batch write left requests unprocessed");
                for request in pending {
                    report.unprocessed.extend(self.write_op(request)?);
                }
            }
        }
        Ok(report)
    }

    fn write_op(&self, request: WriteRequest) -> Result<Option<WriteOp>> {
        if let Some(put) = request.put_request {
            Ok(Some(WriteOp::Put(self.codec.decode_item(&put.item)?)))
        } else if let Some(delete) = request.delete_request {
            Ok(Some(WriteOp::Delete(self.codec.decode_item(&delete.key)?)))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_grow_backoff_exponentially() {
        assert_eq!(backoff(1), Duration::from_millis(10));
        assert_eq!(backoff(2), Duration::from_millis(20));
        assert_eq!(backoff(3), Duration::from_millis(40));
        assert_eq!(backoff(30), Duration::from_millis(640));
    }
}
