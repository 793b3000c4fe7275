use crate::{MemoryStore, Result, SledStore, Store, StoreError};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

/// Storage backend selected by the `db.implementation` setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Ephemeral in-memory store
    Memory,
    /// Durable sled database
    Sled,
}

impl StoreBackend {
    pub fn is_durable(self) -> bool {
        matches!(self, StoreBackend::Sled)
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreBackend::Memory => write!(f, "memory"),
            StoreBackend::Sled => write!(f, "sled"),
        }
    }
}

impl FromStr for StoreBackend {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "" | "memory" | "mem" | "inmemory" | "ephemeral" => Ok(StoreBackend::Memory),
            "sled" | "disk" => Ok(StoreBackend::Sled),
            other => Err(StoreError::UnsupportedBackend(other.to_string())),
        }
    }
}

/// Opens a store for the given backend. Durable backends need a directory.
pub fn open_store(backend: StoreBackend, path: Option<&Path>) -> Result<Arc<dyn Store>> {
    match backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreBackend::Sled => {
            let path = path.ok_or_else(|| StoreError::MissingPath(backend.to_string()))?;
            Ok(Arc::new(SledStore::open(path)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_names_are_normalized() {
        assert_eq!(" Memory ".parse::<StoreBackend>().unwrap(), StoreBackend::Memory);
        assert_eq!("SLED".parse::<StoreBackend>().unwrap(), StoreBackend::Sled);
        assert!(matches!(
            "leveldb".parse::<StoreBackend>(),
            Err(StoreError::UnsupportedBackend(name)) if name == "leveldb"
        ));
    }

    #[test]
    fn sled_requires_a_path() {
        let err = open_store(StoreBackend::Sled, None).err().expect("missing path");
        assert!(matches!(err, StoreError::MissingPath(_)));
    }

    #[test]
    fn memory_needs_no_path() {
        let store = open_store(StoreBackend::Memory, None).unwrap();
        assert_eq!(store.backend(), StoreBackend::Memory);
        assert!(!store.backend().is_durable());
    }
}
