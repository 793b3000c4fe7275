//! Default genesis block.

use crate::{transactions_root, Block, BlockHash, BlockHeader, ConsensusParams};

const GENESIS_NONCE: u64 = 0x42;
const GENESIS_EXTRA_DATA: &[u8] = b"ethapp genesis";

/// Genesis block used when a store holds no chain yet.
pub fn default_genesis(params: &ConsensusParams) -> Block {
    Block {
        header: BlockHeader {
            parent_hash: BlockHash::ZERO,
            number: 0,
            timestamp: 0,
            difficulty: params.genesis_difficulty,
            nonce: GENESIS_NONCE,
            extra_data: GENESIS_EXTRA_DATA.to_vec(),
            transactions_root: transactions_root(&[]),
        },
        transactions: Vec::new(),
    }
}
