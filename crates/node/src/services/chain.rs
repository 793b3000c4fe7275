use super::db::DbService;
use crate::error::NodeResult;
use crate::registry::ServiceRegistry;
use crate::service::{Service, ServiceContext, ServiceHandle, ServiceSpec};
use async_trait::async_trait;
use ethapp_config::{AppConfig, Table, Value};
use ethapp_ledger::{Chain, ConsensusParams};
use std::sync::Arc;
use tracing::info;

pub(super) const SPEC: ServiceSpec = ServiceSpec {
    name: super::CHAIN,
    requires: &[super::DB],
    default_config,
    build,
};

fn default_config() -> Table {
    let mut eth = Table::new();
    eth.insert(
        "genesis_difficulty".into(),
        Value::Integer(ConsensusParams::GENESIS_DIFFICULTY as i64),
    );
    eth.insert(
        "block_diff_factor".into(),
        Value::Integer(ConsensusParams::BLOCK_DIFF_FACTOR as i64),
    );

    let mut table = Table::new();
    table.insert("eth".into(), Value::Table(eth));
    table
}

fn build(config: &AppConfig, registry: &ServiceRegistry) -> NodeResult<ServiceHandle> {
    let db = registry.get::<DbService>(super::DB)?;
    Ok(ServiceHandle::new(Arc::new(ChainService::open(
        db,
        consensus_params(config),
    )?)))
}

/// Consensus parameters from the `eth` section. Missing or non-positive
/// values keep their defaults.
pub fn consensus_params(config: &AppConfig) -> ConsensusParams {
    let mut params = ConsensusParams::default();
    if let Some(difficulty) = positive(config, "eth.genesis_difficulty") {
        params.genesis_difficulty = difficulty;
    }
    if let Some(factor) = positive(config, "eth.block_diff_factor") {
        params.block_diff_factor = factor;
    }
    params
}

fn positive(config: &AppConfig, path: &str) -> Option<u64> {
    config
        .get_integer(path)
        .and_then(|value| u64::try_from(value).ok())
        .filter(|value| *value > 0)
}

/// Chain engine over the shared store.
pub struct ChainService {
    chain: Chain,
    db: Arc<DbService>,
}

impl ChainService {
    pub fn open(db: Arc<DbService>, params: ConsensusParams) -> NodeResult<Self> {
        let chain = Chain::open(db.store(), params)?;
        Ok(Self { chain, db })
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    pub fn db(&self) -> &Arc<DbService> {
        &self.db
    }
}

#[async_trait]
impl Service for ChainService {
    fn name(&self) -> &str {
        super::CHAIN
    }

    async fn start(&self, _ctx: &ServiceContext) -> NodeResult<()> {
        let head = self.chain.head();
        info!(
            target: "chain",
            number = head.number,
            hash = %head.hash,
            genesis_difficulty = self.chain.params().genesis_difficulty,
            "chain ready"
        );
        Ok(())
    }

    async fn stop(&self) -> NodeResult<()> {
        info!(target: "chain", number = self.chain.head_number(), "chain stopped");
        Ok(())
    }
}
