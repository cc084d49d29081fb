//! Error types for the codec, the expression builder and the table client.

use dynadoc_model::{StoreError, StoreErrorCode};

use crate::batch::BatchWriteReport;

/// Errors raised while converting between native and wire values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// A value has a shape the wire format cannot carry: an empty or
    /// mixed-kind set, or a wire value with zero or several tags.
    #[error("unsupported value shape: {0}")]
    UnsupportedValueShape(String),

    /// A number is not a decimal literal or exceeds the precision ceiling.
    #[error("invalid number: {0}")]
    InvalidNumber(String),
}

/// Errors raised while building expressions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExpressionError {
    /// A clause does not have the single-field / single-operator shape it needs.
    #[error("invalid query shape: {0}")]
    InvalidQueryShape(String),

    /// Two clauses produced the same placeholder.
    #[error("placeholder collision: {0}")]
    PlaceholderCollision(String),

    /// A literal could not be encoded.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// The error type returned by the table client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A match, range, condition or update clause has the wrong shape.
    #[error("invalid query shape: {0}")]
    InvalidQueryShape(String),

    /// A value cannot be represented on the wire, or a wire value is malformed.
    #[error("unsupported value shape: {0}")]
    UnsupportedValueShape(String),

    /// A number is not a decimal literal or exceeds the precision ceiling.
    #[error("invalid number: {0}")]
    InvalidNumber(String),

    /// The write's condition evaluated to false; nothing was written.
    #[error("conditional write on table {table} failed: {message}")]
    ConditionalWriteFailed {
        /// The table the write targeted.
        table: String,
        /// The store's message.
        message: String,
    },

    /// Any other store or transport failure, passed through untouched.
    #[error(transparent)]
    Store(StoreError),

    /// A batch write stopped on a store failure. `report` counts the writes
    /// acknowledged before it; every other write is in `report.unprocessed`.
    #[error("batch write on table {table} interrupted: {source}")]
    BatchWriteInterrupted {
        /// The table the batch targeted.
        table: String,
        /// Progress up to the failure.
        report: Box<BatchWriteReport>,
        /// The failure that stopped the batch.
        #[source]
        source: Box<Error>,
    },

    /// A typed record could not be converted to or from a native value.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Returns `true` if the write was rejected by its condition.
    #[must_use]
    pub fn is_conditional_failure(&self) -> bool {
        matches!(self, Self::ConditionalWriteFailed { .. })
    }

    /// Map a store error, splitting out conditional-check failures.
    pub(crate) fn from_store(table: &str, err: StoreError) -> Self {
        if err.code == StoreErrorCode::ConditionalCheckFailedException {
            Self::ConditionalWriteFailed {
                table: table.to_owned(),
                message: err.message,
            }
        } else {
            Self::Store(err)
        }
    }
}

impl From<CodecError> for Error {
    fn from(e: CodecError) -> Self {
        match e {
            CodecError::UnsupportedValueShape(m) => Self::UnsupportedValueShape(m),
            CodecError::InvalidNumber(m) => Self::InvalidNumber(m),
        }
    }
}

impl From<ExpressionError> for Error {
    fn from(e: ExpressionError) -> Self {
        match e {
            ExpressionError::InvalidQueryShape(m) | ExpressionError::PlaceholderCollision(m) => {
                Self::InvalidQueryShape(m)
            }
            ExpressionError::Codec(c) => c.into(),
        }
    }
}

/// Result alias for the table client.
pub type Result<T, E = Error> = std::result::Result<T, E>;
