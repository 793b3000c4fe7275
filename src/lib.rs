//! # ethapp
//!
//! Lifecycle container for an Ethereum-style node.
//!
//! The workspace is split into:
//!
//! - [`config`]: layered configuration with dotted-path access
//! - [`persistence`]: key-value stores (in-memory and sled)
//! - [`ledger`]: blocks, raw record encoding and the chain engine
//! - [`node`]: services, registry, lifecycle, block import and export
//!
//! ```rust,no_run
//! use ethapp_rs::node::services::default_catalog;
//! use ethapp_rs::node::{app::default_config, AppLifecycle};
//! use ethapp_rs::config::AppConfig;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let catalog = default_catalog();
//! let mut config = AppConfig::from_table(default_config(&catalog));
//! config.set("db.implementation", "memory")?;
//!
//! let mut app = AppLifecycle::new(config);
//! app.register_services(&catalog)?;
//! app.start_all().await?;
//! app.wait_for_shutdown().await;
//! # Ok(())
//! # }
//! ```

pub use ethapp_config as config;
pub use ethapp_ledger as ledger;
pub use ethapp_node as node;
pub use ethapp_persistence as persistence;

/// Commonly used types.
pub mod prelude {
    pub use ethapp_config::AppConfig;
    pub use ethapp_ledger::{Block, BlockHash, BlockReader, Chain, ConsensusParams};
    pub use ethapp_node::{
        AppLifecycle, BlockSegment, BlockSegmentExporter, BlockSegmentImporter, Service,
        ServiceContext, ServiceHandle, ServiceRegistry, ServiceSpec,
    };
    pub use ethapp_persistence::{MemoryStore, Store, StoreBackend};
}
