//! Built-in services and the default catalog.

mod accounts;
mod chain;
mod collaborator;
mod db;

pub use accounts::AccountsService;
pub use chain::{consensus_params, ChainService};
pub use collaborator::CollaboratorService;
pub use db::DbService;

use crate::service::ServiceSpec;

pub const DB: &str = "db";
pub const ACCOUNTS: &str = "accounts";
pub const DISCOVERY: &str = "discovery";
pub const PEER_MANAGER: &str = "peermanager";
pub const CHAIN: &str = "chain";
pub const POW: &str = "pow";
pub const JSONRPC: &str = "jsonrpc";

/// Services of a full node, in start order.
pub fn default_catalog() -> Vec<ServiceSpec> {
    vec![
        db::SPEC,
        accounts::SPEC,
        collaborator::DISCOVERY_SPEC,
        collaborator::PEER_MANAGER_SPEC,
        chain::SPEC,
        collaborator::POW_SPEC,
        collaborator::JSONRPC_SPEC,
    ]
}

/// Catalog entry by name.
pub fn find_spec(catalog: &[ServiceSpec], name: &str) -> Option<ServiceSpec> {
    catalog.iter().find(|spec| spec.name == name).copied()
}
