//! Node configuration.
//!
//! The configuration is a nested mapping addressed by dotted key paths such as
//! `pow.activated` or `discovery.bootstrap_nodes`. It is assembled in layers:
//!
//! 1. built-in defaults contributed by the application and by every service,
//! 2. the configuration file found in the data directory (or an alternative
//!    file given on the command line), which only carries values that differ
//!    from the defaults,
//! 3. single `a.b.c=value` overrides from the command line.
//!
//! Once services are built the configuration is shared read-only.

mod data_dir;
mod error;

pub use data_dir::{default_data_dir, setup_data_dir, CONFIG_FILE_NAME};
pub use error::{ConfigError, Result};

use std::fs;
use std::path::{Path, PathBuf};
pub use toml::{Table, Value};

/// Key holding the list of service names that must not be registered.
pub const DEACTIVATED_SERVICES: &str = "deactivated_services";
/// Key holding the resolved data directory.
pub const DATA_DIR: &str = "data_dir";
/// Key holding the client version string announced to peers.
pub const CLIENT_VERSION: &str = "client_version";

/// Nested configuration mapping with dotted-path access.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppConfig {
    table: Table,
}

impl AppConfig {
    /// Creates an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing table.
    pub fn from_table(table: Table) -> Self {
        Self { table }
    }

    /// Parses a TOML document.
    pub fn parse(source: &str) -> Result<Self> {
        let table = toml::from_str::<Table>(source).map_err(|source| ConfigError::Parse {
            path: None,
            source,
        })?;
        Ok(Self { table })
    }

    /// Loads a configuration file. The file must exist.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let table = toml::from_str::<Table>(&contents).map_err(|source| ConfigError::Parse {
            path: Some(path.to_path_buf()),
            source,
        })?;
        Ok(Self { table })
    }

    /// Loads `config.toml` from a data directory. A missing file yields an
    /// empty configuration.
    pub fn load_from_data_dir(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE_NAME);
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config file not found; using defaults only");
            return Ok(Self::new());
        }
        Self::load(&path)
    }

    /// Underlying table.
    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Looks up a value by dotted path.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.table.get(first)?;
        for segment in segments {
            current = current.as_table()?.get(segment)?;
        }
        Some(current)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    pub fn get_bool(&self, path: &str) -> Option<bool> {
        self.get(path).and_then(Value::as_bool)
    }

    pub fn get_integer(&self, path: &str) -> Option<i64> {
        self.get(path).and_then(Value::as_integer)
    }

    pub fn get_table(&self, path: &str) -> Option<&Table> {
        self.get(path).and_then(Value::as_table)
    }

    /// Returns the string entries of an array value; non-string entries are skipped.
    pub fn get_str_list(&self, path: &str) -> Vec<String> {
        self.get(path)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Sets a value, creating intermediate tables as needed.
    pub fn set(&mut self, path: &str, value: impl Into<Value>) -> Result<()> {
        let segments: Vec<&str> = path.split('.').collect();
        if segments.iter().any(|segment| segment.trim().is_empty()) {
            return Err(ConfigError::InvalidParam(path.to_string()));
        }

        let (last, parents) = segments
            .split_last()
            .ok_or_else(|| ConfigError::InvalidParam(path.to_string()))?;

        let mut current = &mut self.table;
        for (depth, segment) in parents.iter().enumerate() {
            let entry = current
                .entry(segment.to_string())
                .or_insert_with(|| Value::Table(Table::new()));
            current = match entry {
                Value::Table(table) => table,
                _ => return Err(ConfigError::NotATable(segments[..=depth].join("."))),
            };
        }
        current.insert(last.to_string(), value.into());
        Ok(())
    }

    /// Applies a single `a.b.c=value` override.
    ///
    /// The value is parsed as a TOML value (`5000`, `true`, `["x"]`, `"text"`)
    /// and falls back to a plain string. The key must already exist in the
    /// resolved configuration.
    pub fn set_param(&mut self, param: &str) -> Result<()> {
        let (key, raw) = param
            .split_once('=')
            .ok_or_else(|| ConfigError::InvalidParam(param.to_string()))?;
        let key = key.trim();
        if key.is_empty() || key.split('.').any(|segment| segment.is_empty()) {
            return Err(ConfigError::InvalidParam(param.to_string()));
        }
        if !self.contains(key) {
            return Err(ConfigError::UnknownParameter(key.to_string()));
        }
        self.set(key, parse_value(raw.trim()))
    }

    /// Fills in every key of `defaults` that is not already present.
    pub fn merge_defaults(&mut self, defaults: &Table) {
        merge_tables(&mut self.table, defaults);
    }

    /// Names listed under `deactivated_services`.
    pub fn deactivated_services(&self) -> Vec<String> {
        self.get_str_list(DEACTIVATED_SERVICES)
    }

    /// Adds a service name to `deactivated_services` unless already listed.
    pub fn deactivate_service(&mut self, name: &str) -> Result<()> {
        let mut names = self.deactivated_services();
        if names.iter().any(|existing| existing == name) {
            return Ok(());
        }
        names.push(name.to_string());
        self.set(
            DEACTIVATED_SERVICES,
            Value::Array(names.into_iter().map(Value::String).collect()),
        )
    }

    pub fn data_dir(&self) -> Option<PathBuf> {
        self.get_str(DATA_DIR).map(PathBuf::from)
    }

    /// Renders the configuration as a TOML document.
    pub fn dump(&self) -> Result<String> {
        Ok(toml::to_string_pretty(&self.table)?)
    }
}

/// Parses a command-line value as TOML, falling back to a plain string.
pub fn parse_value(raw: &str) -> Value {
    toml::from_str::<Table>(&format!("value = {raw}"))
        .ok()
        .and_then(|mut table| table.remove("value"))
        .unwrap_or_else(|| Value::String(raw.to_string()))
}

fn merge_tables(target: &mut Table, defaults: &Table) {
    for (key, default) in defaults {
        match (target.get_mut(key), default) {
            (Some(Value::Table(existing)), Value::Table(nested)) => merge_tables(existing, nested),
            (Some(_), _) => {}
            (None, _) => {
                target.insert(key.clone(), default.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AppConfig {
        AppConfig::parse(
            r#"
            deactivated_services = []

            [pow]
            activated = false
            cpu_pct = 100

            [discovery]
            bootstrap_nodes = ["enode://a@1.2.3.4:30303"]
            "#,
        )
        .expect("sample config")
    }

    #[test]
    fn dotted_lookup_walks_nested_tables() {
        let config = sample();
        assert_eq!(config.get_bool("pow.activated"), Some(false));
        assert_eq!(config.get_integer("pow.cpu_pct"), Some(100));
        assert_eq!(
            config.get_str_list("discovery.bootstrap_nodes"),
            vec!["enode://a@1.2.3.4:30303".to_string()]
        );
        assert!(config.get("pow.missing").is_none());
        assert!(config.get("pow.activated.deeper").is_none());
    }

    #[test]
    fn set_creates_intermediate_tables() {
        let mut config = AppConfig::new();
        config.set("jsonrpc.listen_port", 4000).unwrap();
        assert_eq!(config.get_integer("jsonrpc.listen_port"), Some(4000));
    }

    #[test]
    fn set_refuses_to_descend_into_scalars() {
        let mut config = sample();
        let err = config.set("pow.activated.flag", true).unwrap_err();
        assert!(matches!(err, ConfigError::NotATable(path) if path == "pow.activated"));
    }

    #[test]
    fn parse_value_prefers_toml_then_string() {
        assert_eq!(parse_value("5000"), Value::Integer(5000));
        assert_eq!(parse_value("true"), Value::Boolean(true));
        assert_eq!(
            parse_value("[\"x\", \"y\"]"),
            Value::Array(vec![Value::String("x".into()), Value::String("y".into())])
        );
        assert_eq!(
            parse_value("enode://pub@host:1"),
            Value::String("enode://pub@host:1".into())
        );
    }

    #[test]
    fn set_param_rejects_malformed_and_unknown_keys() {
        let mut config = sample();
        assert!(matches!(
            config.set_param("pow.activated"),
            Err(ConfigError::InvalidParam(_))
        ));
        assert!(matches!(
            config.set_param("=true"),
            Err(ConfigError::InvalidParam(_))
        ));
        assert!(matches!(
            config.set_param("pow.unknown=1"),
            Err(ConfigError::UnknownParameter(key)) if key == "pow.unknown"
        ));

        config.set_param("pow.activated=true").unwrap();
        assert_eq!(config.get_bool("pow.activated"), Some(true));
    }

    #[test]
    fn merge_defaults_keeps_existing_values() {
        let mut config = sample();
        let defaults = AppConfig::parse(
            r#"
            [pow]
            activated = true
            cpu_pct = 100
            coinbase_hex = ""

            [p2p]
            min_peers = 5
            "#,
        )
        .unwrap();

        config.merge_defaults(defaults.table());
        assert_eq!(config.get_bool("pow.activated"), Some(false));
        assert_eq!(config.get_str("pow.coinbase_hex"), Some(""));
        assert_eq!(config.get_integer("p2p.min_peers"), Some(5));
    }

    #[test]
    fn deactivate_service_is_idempotent() {
        let mut config = sample();
        config.deactivate_service("pow").unwrap();
        config.deactivate_service("pow").unwrap();
        assert_eq!(config.deactivated_services(), vec!["pow".to_string()]);
    }

    #[test]
    fn dump_round_trips() {
        let config = sample();
        let rendered = config.dump().unwrap();
        assert_eq!(AppConfig::parse(&rendered).unwrap(), config);
    }
}
