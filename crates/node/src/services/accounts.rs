use crate::error::NodeResult;
use crate::registry::ServiceRegistry;
use crate::service::{Service, ServiceContext, ServiceHandle, ServiceSpec};
use async_trait::async_trait;
use ethapp_config::{AppConfig, Table, Value};
use parking_lot::RwLock;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

pub(super) const SPEC: ServiceSpec = ServiceSpec {
    name: super::ACCOUNTS,
    requires: &[],
    default_config,
    build,
};

fn default_config() -> Table {
    let mut accounts = Table::new();
    accounts.insert("keystore_dir".into(), Value::String("keystore".into()));

    let mut table = Table::new();
    table.insert("accounts".into(), Value::Table(accounts));
    table
}

fn build(config: &AppConfig, _registry: &ServiceRegistry) -> NodeResult<ServiceHandle> {
    Ok(ServiceHandle::new(Arc::new(AccountsService::from_config(
        config,
    )?)))
}

/// Tracks the key files found in the keystore directory.
///
/// Key management itself is not provided; the service only makes sure the
/// directory exists and lists its `*.json` files.
pub struct AccountsService {
    keystore_dir: Option<PathBuf>,
    accounts: RwLock<Vec<String>>,
}

impl AccountsService {
    /// Resolves `accounts.keystore_dir` against the data directory. Without a
    /// data directory no keystore is used.
    pub fn from_config(config: &AppConfig) -> NodeResult<Self> {
        let keystore_dir = config.data_dir().map(|data_dir| {
            data_dir.join(config.get_str("accounts.keystore_dir").unwrap_or("keystore"))
        });

        let accounts = match &keystore_dir {
            Some(dir) => {
                fs::create_dir_all(dir)?;
                list_key_files(dir)?
            }
            None => Vec::new(),
        };

        Ok(Self {
            keystore_dir,
            accounts: RwLock::new(accounts),
        })
    }

    pub fn keystore_dir(&self) -> Option<&Path> {
        self.keystore_dir.as_deref()
    }

    /// Names of the key files, without extension, sorted.
    pub fn accounts(&self) -> Vec<String> {
        self.accounts.read().clone()
    }
}

fn list_key_files(dir: &Path) -> NodeResult<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
            names.push(stem.to_string());
        }
    }
    names.sort();
    Ok(names)
}

#[async_trait]
impl Service for AccountsService {
    fn name(&self) -> &str {
        super::ACCOUNTS
    }

    async fn start(&self, _ctx: &ServiceContext) -> NodeResult<()> {
        if let Some(dir) = &self.keystore_dir {
            let found = list_key_files(dir)?;
            debug!(target: "accounts", keys = ?found, "scanned keystore");
            *self.accounts.write() = found;
        }
        info!(
            target: "accounts",
            count = self.accounts.read().len(),
            keystore = ?self.keystore_dir,
            "accounts loaded"
        );
        Ok(())
    }

    async fn stop(&self) -> NodeResult<()> {
        Ok(())
    }
}
