//! # Persistence layer
//!
//! Byte-oriented key-value storage used by the node services.
//!
//! - **Store**: the storage interface (point reads, writes, atomic batches)
//! - **MemoryStore**: ephemeral store, used for block tests and unit tests
//! - **SledStore**: durable on-disk store inside the data directory
//! - **StoreBackend** / [`open_store`]: selects a backend by configured name
//!
//! The store is shared between services. Callers own the key layout; this
//! crate never interprets keys or values.

mod memory;
mod provider;
mod sled_store;

pub use memory::MemoryStore;
pub use provider::{open_store, StoreBackend};
pub use sled_store::SledStore;

use thiserror::Error;

/// Storage errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Error raised by the sled engine
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Unknown backend name in the configuration
    #[error("unsupported storage backend '{0}' (expected 'memory' or 'sled')")]
    UnsupportedBackend(String),

    /// Durable backend selected without a directory
    #[error("storage backend '{0}' requires a data path")]
    MissingPath(String),
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// A single write inside an atomic batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOperation {
    Put { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

/// Key-value store shared by the node services.
pub trait Store: Send + Sync {
    /// Reads the value stored under `key`.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Stores `value` under `key`, replacing any previous value.
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Removes `key`. Removing an absent key is not an error.
    fn delete(&self, key: &[u8]) -> Result<()>;

    /// Applies all operations atomically.
    fn write_batch(&self, operations: Vec<BatchOperation>) -> Result<()>;

    fn contains(&self, key: &[u8]) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Makes previous writes durable. No-op for ephemeral stores.
    fn flush(&self) -> Result<()> {
        Ok(())
    }

    /// Backend kind, for diagnostics.
    fn backend(&self) -> StoreBackend;
}
