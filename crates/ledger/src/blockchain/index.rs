use crate::{BlockHash, Error, Result};
use ethapp_persistence::{BatchOperation, Store};
use std::sync::Arc;

const NUMBER_PREFIX: &[u8] = b"blocknumber:";
const HEAD_HASH_KEY: &[u8] = b"head_hash";
const HEAD_NUMBER_KEY: &[u8] = b"head_number";

/// Block number → block hash mapping and the head pointer.
///
/// Raw block records live in the same store under their 32-byte hash; the
/// prefixed keys used here cannot collide with them.
#[derive(Clone)]
pub struct ChainIndex {
    store: Arc<dyn Store>,
}

impl ChainIndex {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Hash of the canonical block at `number`, if indexed.
    pub fn hash_by_number(&self, number: u64) -> Result<Option<BlockHash>> {
        self.store
            .get(&number_key(number))?
            .map(|bytes| BlockHash::from_slice(&bytes))
            .transpose()
    }

    /// Current head as `(number, hash)`, or `None` for an empty store.
    pub fn head(&self) -> Result<Option<(u64, BlockHash)>> {
        let hash = self.store.get(HEAD_HASH_KEY)?;
        let number = self.store.get(HEAD_NUMBER_KEY)?;
        match (number, hash) {
            (Some(number), Some(hash)) => {
                let number: [u8; 8] = number.as_slice().try_into().map_err(|_| {
                    Error::Corrupted(format!("head number has {} bytes", number.len()))
                })?;
                Ok(Some((u64::from_be_bytes(number), BlockHash::from_slice(&hash)?)))
            }
            (None, None) => Ok(None),
            _ => Err(Error::Corrupted("head hash and number out of sync".into())),
        }
    }

    /// Operations that index `hash` at `number` and make it the head.
    pub(crate) fn append_ops(number: u64, hash: &BlockHash) -> Vec<BatchOperation> {
        vec![
            BatchOperation::Put {
                key: number_key(number),
                value: hash.as_bytes().to_vec(),
            },
            BatchOperation::Put {
                key: HEAD_HASH_KEY.to_vec(),
                value: hash.as_bytes().to_vec(),
            },
            BatchOperation::Put {
                key: HEAD_NUMBER_KEY.to_vec(),
                value: number.to_be_bytes().to_vec(),
            },
        ]
    }

    /// Operation that drops the index entry at `number`.
    pub(crate) fn remove_op(number: u64) -> BatchOperation {
        BatchOperation::Delete {
            key: number_key(number),
        }
    }
}

fn number_key(number: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(NUMBER_PREFIX.len() + 8);
    key.extend_from_slice(NUMBER_PREFIX);
    key.extend_from_slice(&number.to_be_bytes());
    key
}
