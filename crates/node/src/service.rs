//! Service abstraction.
//!
//! A service is a named unit with `start` and `stop`. Services are built from
//! a [`ServiceSpec`] catalog entry, wrapped in a [`ServiceHandle`] and owned by
//! the registry of an [`AppLifecycle`](crate::AppLifecycle).

use crate::error::NodeResult;
use crate::registry::ServiceRegistry;
use async_trait::async_trait;
use ethapp_config::{AppConfig, Table};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Lifecycle state of a registered service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Created,
    Started,
    Stopped,
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceState::Created => write!(f, "created"),
            ServiceState::Started => write!(f, "started"),
            ServiceState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Passed to every service at start.
#[derive(Clone)]
pub struct ServiceContext {
    pub config: Arc<AppConfig>,
    /// Process-wide cancellation token. Services must not cancel it; they
    /// derive child tokens for their own tasks.
    pub shutdown: CancellationToken,
}

/// A startable and stoppable unit of node functionality.
#[async_trait]
pub trait Service: Send + Sync + 'static {
    /// Registry name of the service.
    fn name(&self) -> &str;

    /// Starts the service. Long-running work is spawned as tasks that watch
    /// `ctx.shutdown`.
    async fn start(&self, ctx: &ServiceContext) -> NodeResult<()>;

    /// Stops the service and waits for its tasks to finish.
    async fn stop(&self) -> NodeResult<()>;
}

/// Shared handle to a registered service.
///
/// Keeps both the trait object used by the lifecycle and a type-erased
/// reference so that callers can recover the concrete service type.
#[derive(Clone)]
pub struct ServiceHandle {
    service: Arc<dyn Service>,
    any: Arc<dyn Any + Send + Sync>,
}

impl ServiceHandle {
    pub fn new<S: Service>(service: Arc<S>) -> Self {
        Self {
            service: service.clone(),
            any: service,
        }
    }

    pub fn service(&self) -> &Arc<dyn Service> {
        &self.service
    }

    pub fn name(&self) -> &str {
        self.service.name()
    }

    /// Concrete service, if it has type `S`.
    pub fn downcast<S: Service>(&self) -> Option<Arc<S>> {
        self.any.clone().downcast::<S>().ok()
    }
}

impl fmt::Debug for ServiceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceHandle")
            .field("name", &self.service.name())
            .finish()
    }
}

/// Builds a service from the configuration and the services registered so far.
pub type BuildFn = fn(&AppConfig, &ServiceRegistry) -> NodeResult<ServiceHandle>;

/// Catalog entry describing a service that can be registered.
#[derive(Clone, Copy)]
pub struct ServiceSpec {
    pub name: &'static str,
    /// Services that must be registered (and therefore started) before this one.
    pub requires: &'static [&'static str],
    /// Default configuration contributed by the service.
    pub default_config: fn() -> Table,
    pub build: BuildFn,
}

impl fmt::Debug for ServiceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceSpec")
            .field("name", &self.name)
            .field("requires", &self.requires)
            .finish()
    }
}
