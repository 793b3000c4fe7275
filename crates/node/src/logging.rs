use anyhow::{anyhow, Context, Result};
use std::io;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_FILTER: &str = "info";

/// Converts a `module:level` list such as `:info,chain:debug` into filter
/// directives (`info,chain=debug`). An empty module sets the default level.
pub fn filter_directives(log_config: &str) -> String {
    log_config
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| match item.rsplit_once(':') {
            Some(("", level)) => level.trim().to_ascii_lowercase(),
            Some((module, level)) => {
                format!("{}={}", module.trim(), level.trim().to_ascii_lowercase())
            }
            None => item.to_ascii_lowercase(),
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Filter from `--log-config`, else `RUST_LOG`, else `info`.
pub fn env_filter(log_config: Option<&str>) -> Result<EnvFilter> {
    match log_config.map(filter_directives) {
        Some(directives) if !directives.is_empty() => EnvFilter::try_new(&directives)
            .with_context(|| format!("invalid log configuration '{directives}'")),
        _ => Ok(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))),
    }
}

/// Installs the global subscriber. Logs go to stderr.
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing(log_config: Option<&str>, json: bool) -> Result<()> {
    let builder = fmt()
        .with_env_filter(env_filter(log_config)?)
        .with_writer(io::stderr)
        .with_target(true);

    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|err| anyhow!("failed to install tracing subscriber: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_config_maps_to_directives() {
        assert_eq!(filter_directives(":info,chain:debug"), "info,chain=debug");
        assert_eq!(filter_directives("db:WARN, app:trace"), "db=warn,app=trace");
        assert_eq!(filter_directives("debug"), "debug");
        assert_eq!(filter_directives(" , "), "");
    }

    #[test]
    fn invalid_levels_are_reported() {
        assert!(env_filter(Some(":info,chain:loud")).is_err());
        assert!(env_filter(Some(":info,chain:debug")).is_ok());
    }

    #[test]
    fn second_subscriber_install_is_reported() {
        init_tracing(Some(":warn"), false).unwrap();
        let err = init_tracing(Some(":warn"), true).unwrap_err();
        assert!(err.to_string().contains("tracing subscriber"));
    }
}
