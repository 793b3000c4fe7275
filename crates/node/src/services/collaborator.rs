//! Stand-ins for the networking, mining and RPC services.
//!
//! Each one keeps its configuration section and runs an idle task until it is
//! stopped or the node shuts down. Their protocols are provided elsewhere.

use crate::error::{NodeError, NodeResult};
use crate::registry::ServiceRegistry;
use crate::service::{Service, ServiceContext, ServiceHandle, ServiceSpec};
use async_trait::async_trait;
use ethapp_config::{AppConfig, Table, Value};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const IDLE_INTERVAL: Duration = Duration::from_secs(30);

pub(super) const DISCOVERY_SPEC: ServiceSpec = ServiceSpec {
    name: super::DISCOVERY,
    requires: &[],
    default_config: discovery_defaults,
    build: build_discovery,
};

pub(super) const PEER_MANAGER_SPEC: ServiceSpec = ServiceSpec {
    name: super::PEER_MANAGER,
    requires: &[],
    default_config: p2p_defaults,
    build: build_peer_manager,
};

pub(super) const POW_SPEC: ServiceSpec = ServiceSpec {
    name: super::POW,
    requires: &[super::CHAIN],
    default_config: pow_defaults,
    build: build_pow,
};

pub(super) const JSONRPC_SPEC: ServiceSpec = ServiceSpec {
    name: super::JSONRPC,
    requires: &[super::CHAIN],
    default_config: jsonrpc_defaults,
    build: build_jsonrpc,
};

fn section(name: &str, entries: Vec<(&str, Value)>) -> Table {
    let inner: Table = entries
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect();
    let mut table = Table::new();
    table.insert(name.to_string(), Value::Table(inner));
    table
}

fn discovery_defaults() -> Table {
    section(
        "discovery",
        vec![
            ("listen_host", Value::String("0.0.0.0".into())),
            ("listen_port", Value::Integer(30303)),
            ("bootstrap_nodes", Value::Array(Vec::new())),
        ],
    )
}

fn p2p_defaults() -> Table {
    section(
        "p2p",
        vec![
            ("listen_host", Value::String("0.0.0.0".into())),
            ("listen_port", Value::Integer(30303)),
            ("min_peers", Value::Integer(5)),
            ("max_peers", Value::Integer(10)),
        ],
    )
}

fn pow_defaults() -> Table {
    section(
        "pow",
        vec![
            ("activated", Value::Boolean(false)),
            ("cpu_pct", Value::Integer(100)),
            ("coinbase_hex", Value::String(String::new())),
        ],
    )
}

fn jsonrpc_defaults() -> Table {
    section(
        "jsonrpc",
        vec![
            ("listen_host", Value::String("127.0.0.1".into())),
            ("listen_port", Value::Integer(4000)),
        ],
    )
}

fn build_discovery(config: &AppConfig, _: &ServiceRegistry) -> NodeResult<ServiceHandle> {
    Ok(CollaboratorService::from_config(super::DISCOVERY, "discovery", config).into_handle())
}

fn build_peer_manager(config: &AppConfig, _: &ServiceRegistry) -> NodeResult<ServiceHandle> {
    Ok(CollaboratorService::from_config(super::PEER_MANAGER, "p2p", config).into_handle())
}

fn build_pow(config: &AppConfig, _: &ServiceRegistry) -> NodeResult<ServiceHandle> {
    Ok(CollaboratorService::from_config(super::POW, "pow", config).into_handle())
}

fn build_jsonrpc(config: &AppConfig, _: &ServiceRegistry) -> NodeResult<ServiceHandle> {
    Ok(CollaboratorService::from_config(super::JSONRPC, "jsonrpc", config).into_handle())
}

struct Worker {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Service that holds a configuration section and idles until stopped.
pub struct CollaboratorService {
    name: &'static str,
    settings: Table,
    worker: Mutex<Option<Worker>>,
}

impl CollaboratorService {
    pub fn new(name: &'static str, settings: Table) -> Self {
        Self {
            name,
            settings,
            worker: Mutex::new(None),
        }
    }

    /// Copies the `section` table out of the configuration.
    pub fn from_config(name: &'static str, section: &str, config: &AppConfig) -> Self {
        Self::new(name, config.get_table(section).cloned().unwrap_or_default())
    }

    pub fn settings(&self) -> &Table {
        &self.settings
    }

    /// Whether the idle task is running.
    pub fn is_running(&self) -> bool {
        self.worker
            .lock()
            .as_ref()
            .map(|worker| !worker.handle.is_finished())
            .unwrap_or(false)
    }

    fn into_handle(self) -> ServiceHandle {
        ServiceHandle::new(Arc::new(self))
    }

    fn summary(&self) -> String {
        self.settings
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[async_trait]
impl Service for CollaboratorService {
    fn name(&self) -> &str {
        self.name
    }

    async fn start(&self, ctx: &ServiceContext) -> NodeResult<()> {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            return Ok(());
        }

        let token = ctx.shutdown.child_token();
        let task_token = token.clone();
        let name = self.name;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(IDLE_INTERVAL);
            loop {
                tokio::select! {
                    _ = task_token.cancelled() => break,
                    _ = ticker.tick() => debug!(target: "services", service = name, "idle"),
                }
            }
        });
        *worker = Some(Worker { token, handle });

        info!(target: "services", service = self.name, settings = %self.summary(), "running");
        Ok(())
    }

    async fn stop(&self) -> NodeResult<()> {
        let worker = self.worker.lock().take();
        let Some(worker) = worker else {
            return Ok(());
        };

        worker.token.cancel();
        worker.handle.await.map_err(|err| NodeError::Service {
            name: self.name.to_string(),
            message: format!("task ended abnormally: {err}"),
        })
    }
}
