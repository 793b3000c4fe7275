//! Data directory layout.
//!
//! A data directory holds `config.toml` (values that differ from the defaults
//! plus the generated node key) next to the storage and keystore directories
//! owned by the services.

use crate::{ConfigError, Result};
use rand::RngCore;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// File name of the configuration document inside a data directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

const APP_DIR_NAME: &str = "ethapp";

/// Platform data directory for the node, falling back to the working directory.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

/// Creates the data directory and its configuration file if they are missing.
///
/// A freshly created configuration only contains the required node key.
/// Returns the path of the configuration file.
pub fn setup_data_dir(data_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(data_dir).map_err(|source| ConfigError::Io {
        path: data_dir.to_path_buf(),
        source,
    })?;

    let config_path = data_dir.join(CONFIG_FILE_NAME);
    if config_path.exists() {
        return Ok(config_path);
    }

    let mut key = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut key);
    let contents = format!(
        "# Only values that differ from the defaults belong here.\n\n[node]\nprivkey_hex = \"{}\"\n",
        hex::encode(key)
    );
    fs::write(&config_path, contents).map_err(|source| ConfigError::Io {
        path: config_path.clone(),
        source,
    })?;
    info!(path = %config_path.display(), "created config file with new node key");
    Ok(config_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AppConfig;

    #[test]
    fn setup_writes_node_key_once() {
        let tmp = tempfile::TempDir::new().expect("temp dir");
        let dir = tmp.path().join("node");

        let path = setup_data_dir(&dir).expect("setup");
        let first = AppConfig::load(&path).expect("load");
        let key = first.get_str("node.privkey_hex").expect("key").to_string();
        assert_eq!(key.len(), 64);

        setup_data_dir(&dir).expect("second setup");
        let second = AppConfig::load(&path).expect("reload");
        assert_eq!(second.get_str("node.privkey_hex"), Some(key.as_str()));
    }

    #[test]
    fn default_data_dir_is_app_specific() {
        assert!(default_data_dir().ends_with(APP_DIR_NAME));
    }
}
