//! Generic key-value persistence interface shared by both engines.
//!
//! Durable storage of the individual record stores (Coin Ledger,
//! Transaction Ledger, Derivation Index, Interest Set, Singleton Store)
//! is kept behind this trait rather than tied to one backend, so a
//! durable store only needs to preserve per-op atomicity and support
//! rollback-by-height queries.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Mutex;

#[derive(thiserror::Error, Debug)]
pub enum PersistError {
    #[error("persistence backend failure: {0}")]
    Backend(String),
}

/// A generic key-value persistence interface.
///
/// Uses `&self` for all methods so implementations can rely on interior
/// mutability (e.g. a `Mutex`) for thread-safe access.
pub trait Persister: Send + Sync + Debug {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PersistError>;
    fn put(&self, key: &str, value: &[u8]) -> Result<(), PersistError>;
    fn delete(&self, key: &str) -> Result<(), PersistError>;
}

/// A simple in-memory [`Persister`], useful for tests and for running the
/// engines without a durable backing store.
#[derive(Debug, Default)]
pub struct MemoryPersister {
    data: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryPersister {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Persister for MemoryPersister {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PersistError> {
        Ok(self
            .data
            .lock()
            .map_err(|_| PersistError::Backend("lock poisoned".into()))?
            .get(key)
            .cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<(), PersistError> {
        self.data
            .lock()
            .map_err(|_| PersistError::Backend("lock poisoned".into()))?
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), PersistError> {
        self.data
            .lock()
            .map_err(|_| PersistError::Backend("lock poisoned".into()))?
            .remove(key);
        Ok(())
    }
}
