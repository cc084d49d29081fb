//! The store boundary the table client talks to.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use dynadoc_model::StoreError;
use dynadoc_model::input::{
    BatchGetItemInput, BatchWriteItemInput, DeleteItemInput, GetItemInput, PutItemInput,
    QueryInput, ScanInput, UpdateItemInput,
};
use dynadoc_model::output::{
    BatchGetItemOutput, BatchWriteItemOutput, DeleteItemOutput, GetItemOutput, PutItemOutput,
    QueryOutput, ScanOutput, UpdateItemOutput,
};

/// Future returned by every transport operation.
pub type TransportFuture<T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send>>;

/// One method per item-level store operation.
///
/// Implementations own retries, auth and networking; errors come back as
/// [`StoreError`] and are passed through by the client without retrying.
pub trait Transport: Send + Sync {
    /// `GetItem`.
    fn get_item(&self, input: GetItemInput) -> TransportFuture<GetItemOutput>;
    /// `PutItem`.
    fn put_item(&self, input: PutItemInput) -> TransportFuture<PutItemOutput>;
    /// `UpdateItem`.
    fn update_item(&self, input: UpdateItemInput) -> TransportFuture<UpdateItemOutput>;
    /// `DeleteItem`.
    fn delete_item(&self, input: DeleteItemInput) -> TransportFuture<DeleteItemOutput>;
    /// `Query`.
    fn query(&self, input: QueryInput) -> TransportFuture<QueryOutput>;
    /// `Scan`.
    fn scan(&self, input: ScanInput) -> TransportFuture<ScanOutput>;
    /// `BatchGetItem`.
    fn batch_get_item(&self, input: BatchGetItemInput) -> TransportFuture<BatchGetItemOutput>;
    /// `BatchWriteItem`.
    fn batch_write_item(&self, input: BatchWriteItemInput)
    -> TransportFuture<BatchWriteItemOutput>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn get_item(&self, input: GetItemInput) -> TransportFuture<GetItemOutput> {
        (**self).get_item(input)
    }

    fn put_item(&self, input: PutItemInput) -> TransportFuture<PutItemOutput> {
        (**self).put_item(input)
    }

    fn update_item(&self, input: UpdateItemInput) -> TransportFuture<UpdateItemOutput> {
        (**self).update_item(input)
    }

    fn delete_item(&self, input: DeleteItemInput) -> TransportFuture<DeleteItemOutput> {
        (**self).delete_item(input)
    }

    fn query(&self, input: QueryInput) -> TransportFuture<QueryOutput> {
        (**self).query(input)
    }

    fn scan(&self, input: ScanInput) -> TransportFuture<ScanOutput> {
        (**self).scan(input)
    }

    fn batch_get_item(&self, input: BatchGetItemInput) -> TransportFuture<BatchGetItemOutput> {
        (**self).batch_get_item(input)
    }

    fn batch_write_item(
        &self,
        input: BatchWriteItemInput,
    ) -> TransportFuture<BatchWriteItemOutput> {
        (**self).batch_write_item(input)
    }
}
