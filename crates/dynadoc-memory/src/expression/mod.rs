//! Expression language understood by the in-memory store.

pub mod ast;
pub mod evaluator;
pub mod parser;

pub use ast::{Condition, Path, References, UpdateExpr};
pub use evaluator::EvalContext;
pub use parser::{parse_condition, parse_projection, parse_update};

/// Errors from parsing or evaluating an expression.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExpressionError {
    /// A token other than the expected one.
    #[error("syntax error: expected {expected}, found {found}")]
    UnexpectedToken {
        /// What the parser wanted.
        expected: String,
        /// What it got.
        found: String,
    },
    /// `#name` missing from `ExpressionAttributeNames`.
    #[error("unresolved attribute name {0}")]
    UnresolvedName(String),
    /// `:value` missing from `ExpressionAttributeValues`.
    #[error("unresolved attribute value {0}")]
    UnresolvedValue(String),
    /// An update operand read an attribute the item does not have.
    #[error("the expression refers to an attribute that does not exist in the item: {0}")]
    MissingAttribute(String),
    /// An operand of the wrong type for the operation.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),
    /// Arithmetic outside the number limits.
    #[error("invalid arithmetic: {0}")]
    Arithmetic(String),
}
