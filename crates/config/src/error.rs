use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors. Each variant renders a message the operator can act on.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration{}: {source}", path.as_ref().map(|p| format!(" in {}", p.display())).unwrap_or_default())]
    Parse {
        path: Option<PathBuf>,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to render configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error(
        "config parameter must be of the form \"a.b.c=d\" where \"a.b.c\" specifies the parameter \
         to set and d is a valid TOML value (example: \"-c jsonrpc.listen_port=5000\"), got \"{0}\""
    )]
    InvalidParam(String),

    #[error("unknown config parameter \"{0}\"; run the `config` command to list the available keys")]
    UnknownParameter(String),

    #[error("config key \"{0}\" holds a value, not a section")]
    NotATable(String),
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
