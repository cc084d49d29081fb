//! Document-style data access over a DynamoDB-like store.
//!
//! Callers work with native [`Value`] trees. The [`codec`] turns them into
//! tagged wire values and back, the [`expression`] builder renders key
//! conditions, filters, write conditions and updates with placeholders
//! that never collide, and [`Table`] assembles the requests and sends them
//! through a [`Transport`].
//!
//! ```
//! use dynadoc_core::{Value, codec};
//!
//! let wire = codec::encode(&Value::from("42")).unwrap().unwrap();
//! assert_eq!(codec::decode(Some(&wire)).unwrap(), Some(Value::from(42)));
//! ```

pub mod batch;
pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod expression;
pub mod query;
pub mod schema;
pub mod transport;
pub mod value;

pub use batch::{BatchGetReport, BatchWriteReport, WriteOp};
pub use client::Table;
pub use codec::{Codec, CodecOptions, EmptySetPolicy, NumericStrings};
pub use config::DynadocConfig;
pub use error::{CodecError, Error, ExpressionError, Result};
pub use expression::{ExpressionBuilder, Predicate, UpdateDocument};
pub use query::{ContinuationToken, Page, Query};
pub use schema::{IndexSchema, TableSchema};
pub use transport::{Transport, TransportFuture};
pub use value::{Item, Number, Value, from_value, to_value};
