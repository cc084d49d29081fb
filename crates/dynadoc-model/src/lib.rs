//! Wire-format types for dynadoc.
//!
//! This crate provides the store-native shapes that cross the transport
//! boundary: the tagged [`AttributeValue`], the request/response structs for
//! the item-level operations, and the store error codes. DynamoDB's JSON
//! protocol maps onto serde derives almost one-to-one, so everything here is
//! hand-written.

pub mod attribute_value;
pub mod error;
pub mod input;
pub mod operations;
pub mod output;
pub mod types;

pub use attribute_value::AttributeValue;
pub use error::{StoreError, StoreErrorCode};
pub use operations::StoreOperation;
pub use types::{Item, Key};
