//! Header checks applied by [`Chain::add_block`](super::Chain::add_block).

use crate::{transactions_root, Block, ConsensusParams, Error, Result};

/// Checks that the header commits to the payloads the block carries.
pub fn validate_body(block: &Block) -> Result<()> {
    let actual = transactions_root(&block.transactions);
    if block.header.transactions_root != actual {
        return Err(Error::InvalidTransactionsRoot {
            declared: block.header.transactions_root,
            actual,
        });
    }
    Ok(())
}

/// Validates `block` as the successor of `parent`, which sits at `parent_number`.
///
/// `parent_number` is the parent's height in the chain, which for an
/// overridden genesis differs from the number declared in its header.
pub fn validate_child(
    parent: &Block,
    parent_number: u64,
    block: &Block,
    params: &ConsensusParams,
) -> Result<()> {
    let parent_hash = parent.hash();
    if block.parent_hash() != parent_hash {
        return Err(Error::UnknownParent {
            parent: block.parent_hash(),
            head: parent_hash,
        });
    }

    let expected = parent_number + 1;
    if block.number() != expected {
        return Err(Error::InvalidNumber {
            expected,
            actual: block.number(),
        });
    }

    if block.timestamp() <= parent.timestamp() {
        return Err(Error::InvalidTimestamp {
            timestamp: block.timestamp(),
            parent: parent.timestamp(),
        });
    }

    let expected =
        params.expected_difficulty(parent.difficulty(), parent.timestamp(), block.timestamp());
    if block.difficulty() != expected {
        return Err(Error::InvalidDifficulty {
            expected,
            actual: block.difficulty(),
        });
    }

    let extra = block.header.extra_data.len();
    if extra > params.max_extra_data {
        return Err(Error::ExtraDataTooLong {
            actual: extra,
            max: params.max_extra_data,
        });
    }

    validate_body(block)
}
