use super::genesis::default_genesis;
use super::validation::{validate_body, validate_child};
use super::ChainIndex;
use crate::{Block, BlockHash, ConsensusParams, Error, Result};
use ethapp_persistence::{BatchOperation, Store};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

/// Position of the canonical head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainHead {
    pub number: u64,
    pub hash: BlockHash,
}

/// Canonical chain over a key-value store.
///
/// Raw records are stored under the block hash; the [`ChainIndex`] maps
/// heights to hashes. Writes are serialized by an internal lock.
pub struct Chain {
    store: Arc<dyn Store>,
    index: ChainIndex,
    params: ConsensusParams,
    head: Mutex<ChainHead>,
}

impl Chain {
    /// Opens the chain stored in `store`, writing the default genesis if the
    /// store holds none.
    pub fn open(store: Arc<dyn Store>, params: ConsensusParams) -> Result<Self> {
        let index = ChainIndex::new(store.clone());
        let head = match index.head()? {
            Some((number, hash)) => {
                debug!(number, %hash, "loaded chain head");
                ChainHead { number, hash }
            }
            None => {
                let genesis = default_genesis(&params);
                let (operations, head) = root_ops(&genesis)?;
                store.write_batch(operations)?;
                info!(hash = %head.hash, difficulty = genesis.difficulty(), "initialized default genesis");
                head
            }
        };

        Ok(Self {
            store,
            index,
            params,
            head: Mutex::new(head),
        })
    }

    pub fn head(&self) -> ChainHead {
        *self.head.lock()
    }

    pub fn head_number(&self) -> u64 {
        self.head.lock().number
    }

    pub fn head_block(&self) -> Result<Block> {
        let hash = self.head().hash;
        self.get_block(&hash)
    }

    pub fn index(&self) -> &ChainIndex {
        &self.index
    }

    pub fn params(&self) -> &ConsensusParams {
        &self.params
    }

    /// Decoded block by hash.
    pub fn get_block(&self, hash: &BlockHash) -> Result<Block> {
        let bytes = self
            .store
            .get(hash.as_bytes())?
            .ok_or_else(|| Error::BlockNotFound(hash.to_hex()))?;
        Block::decode(&bytes)
    }

    /// Decoded canonical block at `number`.
    pub fn get_block_by_number(&self, number: u64) -> Result<Block> {
        let hash = self
            .index
            .hash_by_number(number)?
            .ok_or_else(|| Error::BlockNotFound(format!("number {number}")))?;
        self.get_block(&hash)
    }

    pub fn contains_block(&self, hash: &BlockHash) -> Result<bool> {
        Ok(self.store.contains(hash.as_bytes())?)
    }

    /// Makes `genesis` the root of the chain at height 0, whatever number its
    /// header declares. Index entries of the previous chain are dropped in the
    /// same batch that writes the new root.
    pub fn initialize_genesis(&self, genesis: &Block) -> Result<ChainHead> {
        validate_body(genesis)?;
        let mut head = self.head.lock();

        let mut operations: Vec<BatchOperation> =
            (1..=head.number).map(ChainIndex::remove_op).collect();
        let (root, new_head) = root_ops(genesis)?;
        operations.extend(root);
        self.store.write_batch(operations)?;

        *head = new_head;
        info!(
            hash = %head.hash,
            declared_number = genesis.number(),
            "chain initialized from genesis override"
        );
        Ok(*head)
    }

    /// Validates `block` against the head and appends it.
    pub fn add_block(&self, block: &Block) -> Result<ChainHead> {
        let mut head = self.head.lock();
        let hash = block.hash();
        if self.store.contains(hash.as_bytes())? {
            return Err(Error::AlreadyKnown(hash));
        }

        let parent = self.get_block(&head.hash)?;
        validate_child(&parent, head.number, block, &self.params)?;

        let number = head.number + 1;
        let mut operations = vec![BatchOperation::Put {
            key: hash.as_bytes().to_vec(),
            value: block.encode()?,
        }];
        operations.extend(ChainIndex::append_ops(number, &hash));
        self.store.write_batch(operations)?;

        *head = ChainHead { number, hash };
        debug!(number, %hash, "block appended");
        Ok(*head)
    }
}

fn root_ops(genesis: &Block) -> Result<(Vec<BatchOperation>, ChainHead)> {
    let hash = genesis.hash();
    let mut operations = vec![BatchOperation::Put {
        key: hash.as_bytes().to_vec(),
        value: genesis.encode()?,
    }];
    operations.extend(ChainIndex::append_ops(0, &hash));
    Ok((operations, ChainHead { number: 0, hash }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethapp_persistence::{MemoryStore, StoreBackend, StoreError};
    use std::sync::atomic::{AtomicBool, Ordering};

    fn open() -> Chain {
        Chain::open(Arc::new(MemoryStore::new()), ConsensusParams::default()).unwrap()
    }

    /// Memory store whose batches fail while `broken` is set.
    #[derive(Default)]
    struct BrittleStore {
        inner: MemoryStore,
        broken: AtomicBool,
    }

    impl Store for BrittleStore {
        fn get(&self, key: &[u8]) -> ethapp_persistence::Result<Option<Vec<u8>>> {
            self.inner.get(key)
        }

        fn put(&self, key: &[u8], value: &[u8]) -> ethapp_persistence::Result<()> {
            self.inner.put(key, value)
        }

        fn delete(&self, key: &[u8]) -> ethapp_persistence::Result<()> {
            self.inner.delete(key)
        }

        fn write_batch(&self, operations: Vec<BatchOperation>) -> ethapp_persistence::Result<()> {
            if self.broken.load(Ordering::SeqCst) {
                return Err(StoreError::Sled(sled::Error::Unsupported("batch refused".into())));
            }
            self.inner.write_batch(operations)
        }

        fn backend(&self) -> StoreBackend {
            StoreBackend::Memory
        }
    }

    #[test]
    fn open_writes_default_genesis_once() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let first = Chain::open(store.clone(), ConsensusParams::default()).unwrap();
        let head = first.head();
        assert_eq!(head.number, 0);

        let reopened = Chain::open(store, ConsensusParams::default()).unwrap();
        assert_eq!(reopened.head(), head);
    }

    #[test]
    fn add_block_extends_head() {
        let chain = open();
        let genesis = chain.head_block().unwrap();
        let child = Block::new_child(&genesis, 1, 10, chain.params());

        let head = chain.add_block(&child).unwrap();
        assert_eq!(head.number, 1);
        assert_eq!(head.hash, child.hash());
        assert_eq!(chain.get_block_by_number(1).unwrap(), child);
        assert!(matches!(
            chain.add_block(&child),
            Err(Error::AlreadyKnown(hash)) if hash == child.hash()
        ));
    }

    #[test]
    fn rejected_block_leaves_chain_untouched() {
        let chain = open();
        let genesis = chain.head_block().unwrap();
        let mut child = Block::new_child(&genesis, 1, 10, chain.params());
        child.header.difficulty += 1;

        let err = chain.add_block(&child).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(chain.head_number(), 0);
        assert!(!chain.contains_block(&child.hash()).unwrap());
    }

    #[test]
    fn genesis_override_resets_index() {
        let chain = open();
        let genesis = chain.head_block().unwrap();
        let child = Block::new_child(&genesis, 1, 10, chain.params());
        chain.add_block(&child).unwrap();

        let mut root = Block::new_child(&genesis, 9, 99, chain.params());
        root.header.extra_data = b"override".to_vec();
        let head = chain.initialize_genesis(&root).unwrap();

        assert_eq!(head.number, 0);
        assert_eq!(chain.index().hash_by_number(0).unwrap(), Some(root.hash()));
        assert_eq!(chain.index().hash_by_number(1).unwrap(), None);

        let next = Block::new_child(&root, 1, 100, chain.params());
        assert_eq!(chain.add_block(&next).unwrap().number, 1);
    }

    #[test]
    fn failed_genesis_override_keeps_the_previous_chain() {
        let store = Arc::new(BrittleStore::default());
        let chain = Chain::open(store.clone(), ConsensusParams::default()).unwrap();
        let genesis = chain.head_block().unwrap();
        let child = Block::new_child(&genesis, 1, 10, chain.params());
        chain.add_block(&child).unwrap();

        let mut root = Block::new_child(&genesis, 9, 99, chain.params());
        root.header.extra_data = b"override".to_vec();
        store.broken.store(true, Ordering::SeqCst);
        assert!(matches!(chain.initialize_genesis(&root), Err(Error::Storage(_))));

        assert_eq!(chain.head_number(), 1);
        assert_eq!(chain.index().hash_by_number(1).unwrap(), Some(child.hash()));
        assert_eq!(chain.index().head().unwrap(), Some((1, child.hash())));
        assert!(!chain.contains_block(&root.hash()).unwrap());
    }

    #[test]
    fn block_with_the_same_header_but_other_payloads_is_rejected() {
        let chain = open();
        let genesis = chain.head_block().unwrap();
        let honest = Block::new_child(&genesis, 1, 10, chain.params())
            .with_transactions(vec![b"transfer 1".to_vec()]);
        let mut forged = honest.clone();
        forged.transactions = vec![b"transfer 1000".to_vec()];

        assert!(matches!(
            chain.add_block(&forged),
            Err(Error::InvalidTransactionsRoot { .. })
        ));
        assert!(!chain.contains_block(&honest.hash()).unwrap());

        chain.add_block(&honest).unwrap();
        assert_eq!(chain.get_block(&honest.hash()).unwrap(), honest);
        assert!(matches!(
            chain.initialize_genesis(&forged),
            Err(Error::InvalidTransactionsRoot { .. })
        ));
    }
}
