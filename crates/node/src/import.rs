//! Block segment import.
//!
//! A block test file is a JSON object keyed by test name. Each test lists its
//! blocks as raw records in hex:
//!
//! ```json
//! { "simple": { "blocks": [ { "encoded": "0x..." }, { "encoded": "0x..." } ] } }
//! ```
//!
//! The first block of the segment becomes the chain root; the rest go through
//! the validated append path.

use crate::error::NodeError;
use crate::lifecycle::AppLifecycle;
use crate::registry::ServiceRegistry;
use crate::services::{ChainService, CHAIN, DB, PEER_MANAGER};
use ethapp_ledger::{Block, ChainHead};
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Import errors.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid block test file: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("no test named '{0}' in block test file")]
    UnknownTest(String),

    #[error("test '{0}' has no blocks")]
    EmptySegment(String),

    #[error("block at position {position} cannot be decoded: {reason}")]
    InvalidBlock { position: usize, reason: String },

    #[error("required service '{0}' is not registered")]
    MissingService(&'static str),

    #[error("block at position {position} (number {number}) rejected: {source}")]
    BlockRejected {
        position: usize,
        number: u64,
        #[source]
        source: ethapp_ledger::Error,
    },

    #[error(transparent)]
    Ledger(#[from] ethapp_ledger::Error),

    #[error(transparent)]
    Node(#[from] NodeError),
}

#[derive(Deserialize)]
struct TestFixture {
    blocks: Vec<EncodedBlock>,
}

#[derive(Deserialize)]
struct EncodedBlock {
    encoded: String,
}

/// Decoded blocks of one block test.
#[derive(Debug, Clone)]
pub struct BlockSegment {
    name: String,
    blocks: Vec<Block>,
}

impl BlockSegment {
    /// Reads test `name` from a block test file.
    pub fn load(path: &Path, name: &str) -> Result<Self, ImportError> {
        let source = fs::read_to_string(path).map_err(|source| ImportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&source, name)
    }

    /// Parses test `name` from a block test document.
    pub fn from_json(source: &str, name: &str) -> Result<Self, ImportError> {
        let mut tests: serde_json::Map<String, serde_json::Value> = serde_json::from_str(source)?;
        let entry = tests
            .remove(name)
            .ok_or_else(|| ImportError::UnknownTest(name.to_string()))?;
        let fixture: TestFixture = serde_json::from_value(entry)?;
        if fixture.blocks.is_empty() {
            return Err(ImportError::EmptySegment(name.to_string()));
        }

        let blocks = fixture
            .blocks
            .iter()
            .enumerate()
            .map(|(position, block)| decode_block(position, &block.encoded))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            name: name.to_string(),
            blocks,
        })
    }

    /// Wraps already decoded blocks.
    pub fn from_blocks(name: &str, blocks: Vec<Block>) -> Result<Self, ImportError> {
        if blocks.is_empty() {
            return Err(ImportError::EmptySegment(name.to_string()));
        }
        Ok(Self {
            name: name.to_string(),
            blocks,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

fn decode_block(position: usize, encoded: &str) -> Result<Block, ImportError> {
    let digits = encoded.strip_prefix("0x").unwrap_or(encoded);
    let bytes = hex::decode(digits).map_err(|err| ImportError::InvalidBlock {
        position,
        reason: err.to_string(),
    })?;
    Block::decode(&bytes).map_err(|err| ImportError::InvalidBlock {
        position,
        reason: err.to_string(),
    })
}

/// Outcome of a successful import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub blocks: usize,
    pub head: ChainHead,
}

/// Injects a block segment into the chain without going through the network.
pub struct BlockSegmentImporter {
    chain: Arc<ChainService>,
}

impl BlockSegmentImporter {
    /// Fails unless both the `db` and `chain` services are registered.
    pub fn new(registry: &ServiceRegistry) -> Result<Self, ImportError> {
        for required in [DB, CHAIN] {
            if !registry.contains(required) {
                return Err(ImportError::MissingService(required));
            }
        }
        let chain = registry
            .get::<ChainService>(CHAIN)
            .map_err(NodeError::from)?;
        Ok(Self { chain })
    }

    /// Imports `segment` into a started node.
    ///
    /// The peer manager is stopped first. The first block replaces the chain
    /// root; the remaining blocks are appended in order and the first
    /// rejected block aborts the import.
    pub async fn import(
        &self,
        app: &mut AppLifecycle,
        segment: &BlockSegment,
    ) -> Result<ImportSummary, ImportError> {
        if app.registry().contains(PEER_MANAGER) && app.stop_service(PEER_MANAGER).await? {
            info!(target: "import", "peer manager stopped for import");
        }

        let (genesis, rest) = segment
            .blocks
            .split_first()
            .ok_or_else(|| ImportError::EmptySegment(segment.name.clone()))?;

        let chain = self.chain.chain();
        let root = chain.initialize_genesis(genesis)?;
        info!(
            target: "import",
            test = %segment.name,
            hash = %root.hash,
            declared_number = genesis.number(),
            "genesis replaced"
        );

        for (offset, block) in rest.iter().enumerate() {
            let position = offset + 1;
            let head = chain
                .add_block(block)
                .map_err(|source| ImportError::BlockRejected {
                    position,
                    number: block.number(),
                    source,
                })?;
            debug!(target: "import", position, number = head.number, hash = %head.hash, "block imported");
        }

        let head = chain.head();
        info!(
            target: "import",
            test = %segment.name,
            blocks = segment.len(),
            head = head.number,
            hash = %head.hash,
            "block test imported"
        );
        Ok(ImportSummary {
            blocks: segment.len(),
            head,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethapp_ledger::ConsensusParams;

    fn encoded(block: &Block) -> String {
        format!("0x{}", hex::encode(block.encode().unwrap()))
    }

    fn chain_of(count: u64) -> Vec<Block> {
        let params = ConsensusParams::default();
        let mut blocks = vec![ethapp_ledger::blockchain::genesis::default_genesis(&params)];
        for number in 1..count {
            let parent = &blocks[blocks.len() - 1];
            let child = Block::new_child(parent, number, parent.timestamp() + 20, &params);
            blocks.push(child);
        }
        blocks
    }

    #[test]
    fn loads_named_test_and_ignores_extra_fields() {
        let blocks = chain_of(2);
        let document = serde_json::json!({
            "other": { "blocks": [] },
            "simple": {
                "network": "Frontier",
                "blocks": [
                    { "encoded": encoded(&blocks[0]), "blockHeader": {} },
                    { "encoded": hex::encode(blocks[1].encode().unwrap()) }
                ]
            }
        });

        let segment = BlockSegment::from_json(&document.to_string(), "simple").unwrap();
        assert_eq!(segment.name(), "simple");
        assert_eq!(segment.blocks(), blocks.as_slice());
    }

    #[test]
    fn load_errors_are_classified() {
        assert!(matches!(
            BlockSegment::from_json("{ not json", "simple"),
            Err(ImportError::InvalidJson(_))
        ));
        assert!(matches!(
            BlockSegment::from_json(r#"{"simple": {"blocks": []}}"#, "missing"),
            Err(ImportError::UnknownTest(name)) if name == "missing"
        ));
        assert!(matches!(
            BlockSegment::from_json(r#"{"simple": {"blocks": []}}"#, "simple"),
            Err(ImportError::EmptySegment(name)) if name == "simple"
        ));
        assert!(matches!(
            BlockSegment::from_json(r#"{"simple": {"genesis": 1}}"#, "simple"),
            Err(ImportError::InvalidJson(_))
        ));
    }

    #[test]
    fn undecodable_block_reports_its_position() {
        let blocks = chain_of(1);
        let document = serde_json::json!({
            "simple": { "blocks": [ { "encoded": encoded(&blocks[0]) }, { "encoded": "0xzz" } ] }
        });
        assert!(matches!(
            BlockSegment::from_json(&document.to_string(), "simple"),
            Err(ImportError::InvalidBlock { position: 1, .. })
        ));

        let document = serde_json::json!({ "simple": { "blocks": [ { "encoded": "0x0102" } ] } });
        assert!(matches!(
            BlockSegment::from_json(&document.to_string(), "simple"),
            Err(ImportError::InvalidBlock { position: 0, .. })
        ));
    }

    #[test]
    fn importer_requires_chain_and_db() {
        let registry = ServiceRegistry::new();
        assert!(matches!(
            BlockSegmentImporter::new(&registry),
            Err(ImportError::MissingService("db"))
        ));
    }
}
