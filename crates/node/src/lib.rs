//! # ethapp node
//!
//! Lifecycle container for the node services.
//!
//! - [`ServiceRegistry`]: uniquely named services in registration order
//! - [`AppLifecycle`]: ordered start, reverse stop, signal-driven shutdown
//! - [`services`]: storage, accounts, chain and the network stand-ins
//! - [`BlockSegmentImporter`]: loads a block test segment into the chain
//! - [`BlockSegmentExporter`]: streams raw block records to a file
//!
//! The `ethapp` binary wires these together behind the `run`, `config`,
//! `blocktest` and `export` commands.

pub mod app;
pub mod args;
pub mod commands;
pub mod error;
pub mod export;
pub mod import;
pub mod lifecycle;
pub mod logging;
pub mod registry;
pub mod service;
pub mod services;
pub mod shutdown;

pub use error::{NodeError, NodeResult, RegistryError};
pub use export::{BlockSegmentExporter, ExportError, ExportRange, ExportSummary};
pub use import::{BlockSegment, BlockSegmentImporter, ImportError, ImportSummary};
pub use lifecycle::{AppLifecycle, PostStartCallback};
pub use registry::{ServiceDescriptor, ServiceRegistry};
pub use service::{Service, ServiceContext, ServiceHandle, ServiceSpec, ServiceState};
