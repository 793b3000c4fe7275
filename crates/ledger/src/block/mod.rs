//! Block data structures.

mod codec;

pub use codec::{BlockReader, MAX_RECORD_SIZE};

use crate::{ConsensusParams, Error, Result};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;

/// 32-byte Keccak-256 block hash.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockHash([u8; 32]);

impl BlockHash {
    pub const LENGTH: usize = 32;
    pub const ZERO: BlockHash = BlockHash([0u8; 32]);

    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let array: [u8; 32] = bytes
            .try_into()
            .map_err(|_| Error::InvalidHashLength(bytes.len()))?;
        Ok(Self(array))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockHash({})", self.to_hex())
    }
}

impl FromStr for BlockHash {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let digits = s.trim().trim_start_matches("0x");
        let bytes = hex::decode(digits).map_err(|err| Error::Decode(err.to_string()))?;
        Self::from_slice(&bytes)
    }
}

/// Block header. Its hash identifies the block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub parent_hash: BlockHash,
    pub number: u64,
    pub timestamp: u64,
    pub difficulty: u64,
    pub nonce: u64,
    pub extra_data: Vec<u8>,
    pub transactions_root: BlockHash,
}

impl BlockHeader {
    /// Keccak-256 over the header fields in declaration order.
    pub fn hash(&self) -> BlockHash {
        let mut hasher = Keccak256::new();
        hasher.update(self.parent_hash.as_bytes());
        hasher.update(self.number.to_be_bytes());
        hasher.update(self.timestamp.to_be_bytes());
        hasher.update(self.difficulty.to_be_bytes());
        hasher.update(self.nonce.to_be_bytes());
        hasher.update((self.extra_data.len() as u64).to_be_bytes());
        hasher.update(&self.extra_data);
        hasher.update(self.transactions_root.as_bytes());
        BlockHash(hasher.finalize().into())
    }
}

/// Keccak-256 over the payload count and each length-prefixed payload.
pub fn transactions_root(transactions: &[Vec<u8>]) -> BlockHash {
    let mut hasher = Keccak256::new();
    hasher.update((transactions.len() as u64).to_be_bytes());
    for payload in transactions {
        hasher.update((payload.len() as u64).to_be_bytes());
        hasher.update(payload);
    }
    BlockHash(hasher.finalize().into())
}

/// A block: header plus transaction payloads, which this crate does not interpret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<Vec<u8>>,
}

impl Block {
    pub fn hash(&self) -> BlockHash {
        self.header.hash()
    }

    pub fn number(&self) -> u64 {
        self.header.number
    }

    pub fn parent_hash(&self) -> BlockHash {
        self.header.parent_hash
    }

    pub fn timestamp(&self) -> u64 {
        self.header.timestamp
    }

    pub fn difficulty(&self) -> u64 {
        self.header.difficulty
    }

    /// Replaces the payloads and updates the header commitment to match.
    pub fn with_transactions(mut self, transactions: Vec<Vec<u8>>) -> Self {
        self.header.transactions_root = transactions_root(&transactions);
        self.transactions = transactions;
        self
    }

    /// True if the header commits to the payloads the block carries.
    pub fn has_valid_transactions_root(&self) -> bool {
        self.header.transactions_root == transactions_root(&self.transactions)
    }

    /// Builds an empty block that validates on top of `parent` at height `number`.
    pub fn new_child(
        parent: &Block,
        number: u64,
        timestamp: u64,
        params: &ConsensusParams,
    ) -> Self {
        let difficulty =
            params.expected_difficulty(parent.difficulty(), parent.timestamp(), timestamp);
        Block {
            header: BlockHeader {
                parent_hash: parent.hash(),
                number,
                timestamp,
                difficulty,
                nonce: 0,
                extra_data: Vec::new(),
                transactions_root: transactions_root(&[]),
            },
            transactions: Vec::new(),
        }
    }
}
