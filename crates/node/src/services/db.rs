use crate::error::{NodeError, NodeResult};
use crate::registry::ServiceRegistry;
use crate::service::{Service, ServiceContext, ServiceHandle, ServiceSpec};
use async_trait::async_trait;
use ethapp_config::{AppConfig, Table, Value};
use ethapp_persistence::{open_store, Store, StoreBackend};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

pub(super) const SPEC: ServiceSpec = ServiceSpec {
    name: super::DB,
    requires: &[],
    default_config,
    build,
};

fn default_config() -> Table {
    let mut db = Table::new();
    db.insert("implementation".into(), Value::String("sled".into()));
    db.insert("path".into(), Value::String("chaindata".into()));

    let mut table = Table::new();
    table.insert("db".into(), Value::Table(db));
    table
}

fn build(config: &AppConfig, _registry: &ServiceRegistry) -> NodeResult<ServiceHandle> {
    Ok(ServiceHandle::new(Arc::new(DbService::from_config(config)?)))
}

/// Key-value storage shared by the other services.
pub struct DbService {
    store: Arc<dyn Store>,
    location: Option<PathBuf>,
}

impl DbService {
    /// Opens the store selected by `db.implementation`. Durable stores live
    /// under `<data_dir>/<db.path>`.
    pub fn from_config(config: &AppConfig) -> NodeResult<Self> {
        let backend: StoreBackend = config
            .get_str("db.implementation")
            .unwrap_or_default()
            .parse()?;

        let location = match (backend.is_durable(), config.data_dir()) {
            (true, Some(data_dir)) => {
                let path = data_dir.join(config.get_str("db.path").unwrap_or("chaindata"));
                std::fs::create_dir_all(&path)?;
                Some(path)
            }
            _ => None,
        };

        let store = open_store(backend, location.as_deref())?;
        info!(target: "db", %backend, path = ?location, "opened store");
        Ok(Self { store, location })
    }

    pub fn with_store(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            location: None,
        }
    }

    pub fn store(&self) -> Arc<dyn Store> {
        self.store.clone()
    }

    pub fn backend(&self) -> StoreBackend {
        self.store.backend()
    }

    /// Bytes stored under `key`, as written.
    pub fn get_record(&self, key: &[u8]) -> NodeResult<Option<Vec<u8>>> {
        Ok(self.store.get(key)?)
    }
}

#[async_trait]
impl Service for DbService {
    fn name(&self) -> &str {
        super::DB
    }

    async fn start(&self, _ctx: &ServiceContext) -> NodeResult<()> {
        info!(target: "db", backend = %self.backend(), path = ?self.location, "db ready");
        Ok(())
    }

    async fn stop(&self) -> NodeResult<()> {
        self.store.flush().map_err(NodeError::from)
    }
}
