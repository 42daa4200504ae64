//! Bounded-memory, reorg-safe history of singleton state transitions: a
//! last-non-recent snapshot plus a sliding recent-history window per
//! launcher id.

pub mod error;
pub mod singleton;
pub mod store;

pub use error::Error;
pub use singleton::{SingletonCoinRecord, SingletonInfo};
pub use store::{SingletonCoinLookup, SingletonStore};
