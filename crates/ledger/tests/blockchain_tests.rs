//! Chain behaviour over both storage backends.

use ethapp_ledger::*;
use ethapp_persistence::{MemoryStore, SledStore, Store};
use std::sync::Arc;
use tempfile::TempDir;

fn extend(chain: &Chain, count: u64) -> Vec<Block> {
    let mut parent = chain.head_block().unwrap();
    let mut added = Vec::new();
    for _ in 0..count {
        let number = chain.head_number() + 1;
        let block = Block::new_child(&parent, number, parent.timestamp() + 15, chain.params());
        chain.add_block(&block).unwrap();
        parent = block.clone();
        added.push(block);
    }
    added
}

#[test]
fn raw_records_concatenate_into_a_decodable_stream() {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let chain = Chain::open(store.clone(), ConsensusParams::default()).unwrap();
    extend(&chain, 10);

    let mut stream = Vec::new();
    for number in 0..=chain.head_number() {
        let hash = chain.index().hash_by_number(number).unwrap().unwrap();
        stream.extend(store.get(hash.as_bytes()).unwrap().unwrap());
    }

    let decoded: Vec<Block> = BlockReader::new(stream.as_slice())
        .collect::<Result<_>>()
        .unwrap();
    assert_eq!(decoded.len(), 11);
    for (number, block) in decoded.iter().enumerate() {
        assert_eq!(
            chain.index().hash_by_number(number as u64).unwrap(),
            Some(block.hash())
        );
    }
}

#[test]
fn sled_chain_keeps_head_across_reopen() {
    let tmp = TempDir::new().unwrap();
    let store: Arc<dyn Store> = Arc::new(SledStore::open(tmp.path()).unwrap());

    let chain = Chain::open(store.clone(), ConsensusParams::default()).unwrap();
    let added = extend(&chain, 3);
    let head = chain.head();
    drop(chain);

    let reopened = Chain::open(store, ConsensusParams::default()).unwrap();
    assert_eq!(reopened.head(), head);
    assert_eq!(reopened.head_block().unwrap(), added[2]);
}

#[test]
fn fake_params_change_the_default_genesis() {
    let normal = Chain::open(Arc::new(MemoryStore::new()), ConsensusParams::default()).unwrap();
    let fake = Chain::open(Arc::new(MemoryStore::new()), ConsensusParams::fake()).unwrap();

    assert_eq!(fake.head_block().unwrap().difficulty(), 1024);
    assert_ne!(normal.head().hash, fake.head().hash);
}
