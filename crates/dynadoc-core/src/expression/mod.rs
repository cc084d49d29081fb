//! Expression builder: key conditions, filters, write conditions, updates
//! and projections with collision-free placeholders.

pub mod builder;
pub mod condition;
pub mod placeholder;
pub mod update;

pub use builder::{BuiltExpressions, ExpressionBuilder};
pub use condition::{Comparator, Operand, Predicate};
pub use placeholder::{Clause, Fragment};
pub use update::{UpdateAction, UpdateDocument};
