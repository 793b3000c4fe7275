//! Ledger Module
//!
//! Chain data owned by the node's chain service.
//!
//! ## Components
//!
//! - **Block**: header plus opaque transaction payloads, identified by a Keccak-256 hash
//! - **BlockReader**: decodes a concatenation of raw block records one at a time
//! - **ChainIndex**: block number → block hash mapping and head pointer
//! - **Chain**: genesis handling and the validated `add_block` path
//! - **ConsensusParams**: difficulty constants consulted by validation

pub mod block;
pub mod blockchain;
pub mod params;

pub use block::{transactions_root, Block, BlockHash, BlockHeader, BlockReader, MAX_RECORD_SIZE};
pub use blockchain::{Chain, ChainHead, ChainIndex};
pub use params::ConsensusParams;

use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
#[derive(Debug, Error)]
pub enum Error {
    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] ethapp_persistence::StoreError),

    /// I/O error while reading a record stream
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Block could not be encoded
    #[error("Failed to encode block: {0}")]
    Encode(String),

    /// Bytes do not form a valid block record
    #[error("Failed to decode block: {0}")]
    Decode(String),

    /// Hash bytes of the wrong length
    #[error("Invalid hash length: expected 32 bytes, got {0}")]
    InvalidHashLength(usize),

    /// Block not found
    #[error("Block not found: {0}")]
    BlockNotFound(String),

    /// Index and records disagree
    #[error("Chain index corrupted: {0}")]
    Corrupted(String),

    /// Block is already part of the chain
    #[error("Block {0} already known")]
    AlreadyKnown(BlockHash),

    /// Block does not extend the current head
    #[error("Unknown parent {parent} (current head {head})")]
    UnknownParent { parent: BlockHash, head: BlockHash },

    /// Block number does not follow the head
    #[error("Invalid block number: expected {expected}, got {actual}")]
    InvalidNumber { expected: u64, actual: u64 },

    /// Timestamp does not advance
    #[error("Invalid timestamp {timestamp}: must be after parent timestamp {parent}")]
    InvalidTimestamp { timestamp: u64, parent: u64 },

    /// Difficulty does not match the adjustment rule
    #[error("Invalid difficulty: expected {expected}, got {actual}")]
    InvalidDifficulty { expected: u64, actual: u64 },

    /// Extra data exceeds the allowed size
    #[error("Extra data too long: {actual} bytes (max {max})")]
    ExtraDataTooLong { actual: usize, max: usize },

    /// Header does not commit to the block's payloads
    #[error("Invalid transactions root: header has {declared}, payloads hash to {actual}")]
    InvalidTransactionsRoot { declared: BlockHash, actual: BlockHash },
}

impl Error {
    /// True for errors raised by block validation rather than I/O or storage.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::AlreadyKnown(_)
                | Error::UnknownParent { .. }
                | Error::InvalidNumber { .. }
                | Error::InvalidTimestamp { .. }
                | Error::InvalidDifficulty { .. }
                | Error::ExtraDataTooLong { .. }
                | Error::InvalidTransactionsRoot { .. }
        )
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::Decode(err.to_string())
    }
}
