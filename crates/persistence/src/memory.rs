use crate::{BatchOperation, Result, Store, StoreBackend};
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// An in-memory store backed by a `BTreeMap`. Contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner_data: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.inner_data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner_data.read().is_empty()
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.inner_data.read().get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.inner_data.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.inner_data.write().remove(key);
        Ok(())
    }

    fn write_batch(&self, operations: Vec<BatchOperation>) -> Result<()> {
        let mut data = self.inner_data.write();
        for operation in operations {
            match operation {
                BatchOperation::Put { key, value } => {
                    data.insert(key, value);
                }
                BatchOperation::Delete { key } => {
                    data.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn backend(&self) -> StoreBackend {
        StoreBackend::Memory
    }
}
