//! Configuration assembly for the node commands.

use crate::error::NodeResult;
use crate::service::ServiceSpec;
use crate::services::POW;
use ethapp_config::{
    default_data_dir, setup_data_dir, AppConfig, Table, Value, CLIENT_VERSION, DATA_DIR,
    DEACTIVATED_SERVICES,
};
use std::path::PathBuf;
use tracing::info;

pub const CLIENT_NAME: &str = "ethapp";

/// Port used by `run --nodial` so that a local node does not collide with a
/// regular one.
pub const NODIAL_LISTEN_PORT: i64 = 29873;

/// `<name>/v<version>/<os>/rust`
pub fn client_version() -> String {
    format!(
        "{CLIENT_NAME}/v{}/{}/rust",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS
    )
}

/// Application defaults merged with the defaults of every catalog entry.
pub fn default_config(catalog: &[ServiceSpec]) -> Table {
    let mut config = AppConfig::new();
    let mut app = Table::new();
    app.insert(CLIENT_VERSION.into(), Value::String(client_version()));
    app.insert(DEACTIVATED_SERVICES.into(), Value::Array(Vec::new()));
    config.merge_defaults(&app);

    for spec in catalog {
        config.merge_defaults(&(spec.default_config)());
    }
    config.table().clone()
}

/// Global command-line settings that shape the configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigOptions {
    /// Alternative configuration file replacing `<data_dir>/config.toml`.
    pub alt_config: Option<PathBuf>,
    /// `a.b.c=value` overrides, applied in order.
    pub params: Vec<String>,
    pub data_dir: Option<PathBuf>,
    /// Replaces `discovery.bootstrap_nodes`.
    pub bootstrap_node: Option<String>,
    pub mining_pct: u32,
}

/// Builds the configuration: file, then defaults for missing keys, then
/// command-line overrides.
pub fn build_config(options: &ConfigOptions, catalog: &[ServiceSpec]) -> NodeResult<AppConfig> {
    let data_dir = options.data_dir.clone().unwrap_or_else(default_data_dir);
    setup_data_dir(&data_dir)?;
    info!(target: "config", path = %data_dir.display(), "using data directory");

    let mut config = match &options.alt_config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::load_from_data_dir(&data_dir)?,
    };
    config.set(DATA_DIR, data_dir.display().to_string())?;
    config.merge_defaults(&default_config(catalog));

    for param in &options.params {
        config.set_param(param)?;
    }
    if let Some(node) = &options.bootstrap_node {
        config.set(
            "discovery.bootstrap_nodes",
            Value::Array(vec![Value::String(node.clone())]),
        )?;
    }
    if options.mining_pct > 0 {
        config.set("pow.activated", true)?;
        config.set("pow.cpu_pct", i64::from(options.mining_pct.min(100)))?;
    }
    if !config.get_bool("pow.activated").unwrap_or(false) {
        config.deactivate_service(POW)?;
    }
    Ok(config)
}

/// No outbound dialing: no bootstrap nodes, private listen ports, no peer
/// minimum.
pub fn apply_nodial(config: &mut AppConfig) -> NodeResult<()> {
    config.set("discovery.bootstrap_nodes", Value::Array(Vec::new()))?;
    config.set("discovery.listen_port", NODIAL_LISTEN_PORT)?;
    config.set("p2p.listen_port", NODIAL_LISTEN_PORT)?;
    config.set("p2p.min_peers", 0)?;
    Ok(())
}

/// Low-difficulty consensus parameters for local chains.
pub fn apply_fake(config: &mut AppConfig) -> NodeResult<()> {
    let fake = ethapp_ledger::ConsensusParams::fake();
    config.set("eth.genesis_difficulty", fake.genesis_difficulty as i64)?;
    config.set("eth.block_diff_factor", fake.block_diff_factor as i64)?;
    Ok(())
}

/// Appends `/<login>` to the client version. Returns `false` if the version
/// was left unchanged.
pub fn append_login_name(config: &mut AppConfig, login: Option<&str>) -> NodeResult<bool> {
    let Some(login) = login.filter(|name| !name.is_empty()) else {
        return Ok(false);
    };
    let version = config
        .get_str(CLIENT_VERSION)
        .map(str::to_string)
        .unwrap_or_else(client_version);
    config.set(CLIENT_VERSION, format!("{version}/{login}"))?;
    Ok(true)
}

/// Login name of the current user from the environment.
pub fn login_name() -> Option<String> {
    ["USER", "LOGNAME", "USERNAME"]
        .iter()
        .find_map(|key| std::env::var(key).ok().filter(|value| !value.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::default_catalog;

    fn options(dir: &tempfile::TempDir) -> ConfigOptions {
        ConfigOptions {
            data_dir: Some(dir.path().to_path_buf()),
            ..ConfigOptions::default()
        }
    }

    #[test]
    fn client_version_names_the_platform() {
        let version = client_version();
        assert!(version.starts_with("ethapp/v"));
        assert!(version.ends_with("/rust"));
        assert!(version.contains(std::env::consts::OS));
    }

    #[test]
    fn defaults_cover_every_service_section() {
        let config = AppConfig::from_table(default_config(&default_catalog()));
        for key in [
            "client_version",
            "deactivated_services",
            "db.implementation",
            "accounts.keystore_dir",
            "discovery.bootstrap_nodes",
            "p2p.min_peers",
            "eth.genesis_difficulty",
            "pow.activated",
            "jsonrpc.listen_port",
        ] {
            assert!(config.contains(key), "missing default {key}");
        }
    }

    #[test]
    fn pow_is_deactivated_unless_mining() {
        let dir = tempfile::tempdir().unwrap();
        let config = build_config(&options(&dir), &default_catalog()).unwrap();
        assert_eq!(config.deactivated_services(), vec!["pow".to_string()]);
        assert_eq!(
            config.data_dir().as_deref(),
            Some(dir.path())
        );
        assert!(dir.path().join("config.toml").is_file());
    }

    #[test]
    fn mining_pct_activates_pow_and_is_capped() {
        let dir = tempfile::tempdir().unwrap();
        let options = ConfigOptions {
            mining_pct: 250,
            ..options(&dir)
        };
        let config = build_config(&options, &default_catalog()).unwrap();
        assert_eq!(config.get_bool("pow.activated"), Some(true));
        assert_eq!(config.get_integer("pow.cpu_pct"), Some(100));
        assert!(config.deactivated_services().is_empty());
    }

    #[test]
    fn overrides_and_bootstrap_node_are_applied() {
        let dir = tempfile::tempdir().unwrap();
        let options = ConfigOptions {
            params: vec![
                "jsonrpc.listen_port=5000".into(),
                "deactivated_services=[\"jsonrpc\"]".into(),
            ],
            bootstrap_node: Some("enode://abc@10.0.0.1:30303".into()),
            ..options(&dir)
        };
        let config = build_config(&options, &default_catalog()).unwrap();
        assert_eq!(config.get_integer("jsonrpc.listen_port"), Some(5000));
        assert_eq!(
            config.get_str_list("discovery.bootstrap_nodes"),
            vec!["enode://abc@10.0.0.1:30303".to_string()]
        );
        assert_eq!(
            config.deactivated_services(),
            vec!["jsonrpc".to_string(), "pow".to_string()]
        );
    }

    #[test]
    fn unknown_override_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let options = ConfigOptions {
            params: vec!["jsonrpc.no_such_key=1".into()],
            ..options(&dir)
        };
        assert!(build_config(&options, &default_catalog()).is_err());
    }

    #[test]
    fn file_values_win_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.toml"),
            "[p2p]\nmin_peers = 42\n",
        )
        .unwrap();
        let config = build_config(&options(&dir), &default_catalog()).unwrap();
        assert_eq!(config.get_integer("p2p.min_peers"), Some(42));
        assert_eq!(config.get_integer("p2p.max_peers"), Some(10));
    }

    #[test]
    fn nodial_and_fake_rewrite_their_keys() {
        let mut config = AppConfig::from_table(default_config(&default_catalog()));
        config
            .set(
                "discovery.bootstrap_nodes",
                Value::Array(vec![Value::String("enode://x@1.1.1.1:1".into())]),
            )
            .unwrap();

        apply_nodial(&mut config).unwrap();
        apply_fake(&mut config).unwrap();

        assert!(config.get_str_list("discovery.bootstrap_nodes").is_empty());
        assert_eq!(config.get_integer("discovery.listen_port"), Some(29873));
        assert_eq!(config.get_integer("p2p.listen_port"), Some(29873));
        assert_eq!(config.get_integer("p2p.min_peers"), Some(0));
        assert_eq!(config.get_integer("eth.genesis_difficulty"), Some(1024));
        assert_eq!(config.get_integer("eth.block_diff_factor"), Some(16));
    }

    #[test]
    fn login_name_is_appended_when_known() {
        let mut config = AppConfig::from_table(default_config(&[]));
        assert!(!append_login_name(&mut config, None).unwrap());
        assert!(!append_login_name(&mut config, Some("")).unwrap());
        assert_eq!(config.get_str("client_version"), Some(client_version().as_str()));

        assert!(append_login_name(&mut config, Some("carol")).unwrap());
        assert_eq!(
            config.get_str("client_version"),
            Some(format!("{}/carol", client_version()).as_str())
        );
    }
}
