use thiserror::Error;

/// Registry wiring errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("service '{0}' is already registered")]
    DuplicateService(String),

    #[error("unknown service '{0}'")]
    UnknownService(String),

    #[error("service '{service}' requires '{dependency}', which is not registered or is deactivated")]
    MissingDependency { service: String, dependency: String },

    #[error("service dependencies form a cycle among: {}", .0.join(", "))]
    DependencyCycle(Vec<String>),

    #[error("service '{0}' is not of the requested type")]
    ServiceTypeMismatch(String),
}

/// Node container errors.
#[derive(Error, Debug)]
pub enum NodeError {
    #[error(transparent)]
    Config(#[from] ethapp_config::ConfigError),

    #[error(transparent)]
    Store(#[from] ethapp_persistence::StoreError),

    #[error(transparent)]
    Ledger(#[from] ethapp_ledger::Error),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("service '{name}' failed to start: {source}")]
    StartFailed {
        name: String,
        #[source]
        source: Box<NodeError>,
    },

    #[error("service '{name}' failed to stop: {source}")]
    StopFailed {
        name: String,
        #[source]
        source: Box<NodeError>,
    },

    #[error("service '{name}': {message}")]
    Service { name: String, message: String },
}

/// Result type for node container operations.
pub type NodeResult<T> = std::result::Result<T, NodeError>;
