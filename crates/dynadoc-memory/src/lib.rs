//! In-memory store for dynadoc.
//!
//! [`MemoryStore`] implements [`dynadoc_core::Transport`] by parsing and
//! evaluating the same expressions a real store would receive, so the
//! table client can be exercised end to end without a network.

pub mod expression;
pub mod provider;
pub mod state;
pub mod storage;
pub mod store;

pub use provider::MemoryProvider;
pub use store::MemoryStore;
