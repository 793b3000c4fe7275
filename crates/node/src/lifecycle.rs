use crate::error::{NodeError, NodeResult, RegistryError};
use crate::registry::ServiceRegistry;
use crate::service::{ServiceContext, ServiceHandle, ServiceSpec, ServiceState};
use ethapp_config::AppConfig;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Hook run once every service has started.
pub type PostStartCallback = Box<dyn FnOnce(&AppLifecycle) + Send + Sync>;

/// Owns the configuration and the registered services, and drives their
/// start and stop.
pub struct AppLifecycle {
    config: Arc<AppConfig>,
    registry: ServiceRegistry,
    shutdown: CancellationToken,
    stopped: bool,
    post_start: Option<PostStartCallback>,
}

impl AppLifecycle {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config: Arc::new(config),
            registry: ServiceRegistry::new(),
            shutdown: CancellationToken::new(),
            stopped: false,
            post_start: None,
        }
    }

    /// Sets the hook that runs after the next successful [`start_all`].
    ///
    /// [`start_all`]: AppLifecycle::start_all
    pub fn set_post_start_callback<F>(&mut self, callback: F)
    where
        F: FnOnce(&AppLifecycle) + Send + Sync + 'static,
    {
        self.post_start = Some(Box::new(callback));
    }

    pub fn config(&self) -> &Arc<AppConfig> {
        &self.config
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    /// Token whose cancellation starts the shutdown sequence.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Registers a prebuilt service.
    pub fn register_handle(
        &mut self,
        name: &str,
        requires: &[&str],
        handle: ServiceHandle,
    ) -> Result<(), RegistryError> {
        self.registry.register(name, requires, handle)
    }

    /// Builds and registers one catalog entry.
    ///
    /// # Panics
    ///
    /// Panics if the name is already registered or the built service reports
    /// a different name; both are wiring defects.
    pub fn register(&mut self, spec: &ServiceSpec) -> NodeResult<()> {
        assert!(
            !self.registry.contains(spec.name),
            "service '{}' registered twice",
            spec.name
        );

        let handle = (spec.build)(self.config.as_ref(), &self.registry)?;
        assert_eq!(
            handle.name(),
            spec.name,
            "catalog entry '{}' built a service with another name",
            spec.name
        );

        self.registry.register(spec.name, spec.requires, handle)?;
        assert!(self.registry.contains(spec.name));
        info!(target: "app", service = spec.name, "registered service");
        Ok(())
    }

    /// Registers the catalog entries that are not listed in
    /// `deactivated_services`, in dependency order.
    pub fn register_services(&mut self, catalog: &[ServiceSpec]) -> NodeResult<()> {
        let deactivated = self.config.deactivated_services();
        if !deactivated.is_empty() {
            info!(target: "app", services = ?deactivated, "skipping deactivated services");
        }

        for spec in ServiceRegistry::plan(catalog, &deactivated)? {
            self.register(spec)?;
        }
        Ok(())
    }

    /// Starts every created service in registration order. The first failure
    /// aborts. On success the post-start callback, if any, runs once.
    pub async fn start_all(&mut self) -> NodeResult<()> {
        let ctx = ServiceContext {
            config: self.config.clone(),
            shutdown: self.shutdown.clone(),
        };

        for entry in self.registry.iter_mut() {
            if entry.state() != ServiceState::Created {
                continue;
            }
            entry
                .service()
                .start(&ctx)
                .await
                .map_err(|source| NodeError::StartFailed {
                    name: entry.name().to_string(),
                    source: Box::new(source),
                })?;
            entry.set_state(ServiceState::Started);
            info!(target: "app", service = entry.name(), "service started");
        }

        if let Some(callback) = self.post_start.take() {
            callback(self);
        }
        Ok(())
    }

    /// Stops a single service. Returns `false` if it was not running.
    pub async fn stop_service(&mut self, name: &str) -> NodeResult<bool> {
        let entry = self.registry.lookup_mut(name)?;
        if entry.state() != ServiceState::Started {
            return Ok(false);
        }

        let result = entry.service().stop().await;
        entry.set_state(ServiceState::Stopped);
        result.map_err(|source| NodeError::StopFailed {
            name: name.to_string(),
            source: Box::new(source),
        })?;
        info!(target: "app", service = name, "service stopped");
        Ok(true)
    }

    /// Stops every running service in reverse registration order.
    ///
    /// Only the first call does anything. Stop failures are logged and the
    /// remaining services are still stopped.
    pub async fn stop_all(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        info!(target: "app", "stopping services");

        for entry in self.registry.iter_mut().rev() {
            if entry.state() != ServiceState::Started {
                continue;
            }
            match entry.service().stop().await {
                Ok(()) => info!(target: "app", service = entry.name(), "service stopped"),
                Err(err) => {
                    error!(target: "app", service = entry.name(), error = %err, "service failed to stop")
                }
            }
            entry.set_state(ServiceState::Stopped);
        }
    }

    /// Waits for the shutdown token, then stops all services.
    pub async fn wait_for_shutdown(&mut self) {
        if !self.shutdown.is_cancelled() {
            info!(target: "app", "waiting for termination signal");
        }
        self.shutdown.cancelled().await;
        if self.stopped {
            warn!(target: "app", "shutdown requested after services were stopped");
            return;
        }
        self.stop_all().await;
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::Service;
    use async_trait::async_trait;
    use ethapp_config::Table;
    use parking_lot::Mutex;

    struct Quiet;

    #[async_trait]
    impl Service for Quiet {
        fn name(&self) -> &str {
            "quiet"
        }

        async fn start(&self, _ctx: &ServiceContext) -> NodeResult<()> {
            Ok(())
        }

        async fn stop(&self) -> NodeResult<()> {
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl Service for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        async fn start(&self, _ctx: &ServiceContext) -> NodeResult<()> {
            Err(NodeError::Service {
                name: "failing".into(),
                message: "port in use".into(),
            })
        }

        async fn stop(&self) -> NodeResult<()> {
            Ok(())
        }
    }

    fn no_defaults() -> Table {
        Table::new()
    }

    fn build_failing(_: &AppConfig, _: &ServiceRegistry) -> NodeResult<ServiceHandle> {
        Ok(ServiceHandle::new(Arc::new(Failing)))
    }

    const FAILING: ServiceSpec = ServiceSpec {
        name: "failing",
        requires: &[],
        default_config: no_defaults,
        build: build_failing,
    };

    fn build_quiet(_: &AppConfig, _: &ServiceRegistry) -> NodeResult<ServiceHandle> {
        Ok(ServiceHandle::new(Arc::new(Quiet)))
    }

    const QUIET: ServiceSpec = ServiceSpec {
        name: "quiet",
        requires: &[],
        default_config: no_defaults,
        build: build_quiet,
    };

    #[tokio::test]
    async fn post_start_callback_sees_running_services_once() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut app = AppLifecycle::new(AppConfig::new());
        app.register(&QUIET).unwrap();

        let record = seen.clone();
        app.set_post_start_callback(move |app| {
            let state = app.registry().lookup("quiet").unwrap().state();
            record.lock().push(state);
        });

        app.start_all().await.unwrap();
        app.start_all().await.unwrap();
        assert_eq!(*seen.lock(), vec![ServiceState::Started]);
        app.stop_all().await;
    }

    #[tokio::test]
    async fn post_start_callback_is_skipped_when_start_fails() {
        let called = Arc::new(Mutex::new(false));
        let mut app = AppLifecycle::new(AppConfig::new());
        app.register(&FAILING).unwrap();

        let flag = called.clone();
        app.set_post_start_callback(move |_| *flag.lock() = true);

        assert!(app.start_all().await.is_err());
        assert!(!*called.lock());
    }

    #[tokio::test]
    async fn start_failure_is_reported_with_the_service_name() {
        let mut app = AppLifecycle::new(AppConfig::new());
        app.register(&FAILING).unwrap();

        let err = app.start_all().await.unwrap_err();
        assert!(matches!(err, NodeError::StartFailed { ref name, .. } if name == "failing"));
        assert_eq!(
            app.registry().lookup("failing").unwrap().state(),
            ServiceState::Created
        );
    }

    #[test]
    #[should_panic(expected = "registered twice")]
    fn registering_a_catalog_entry_twice_panics() {
        let mut app = AppLifecycle::new(AppConfig::new());
        app.register(&FAILING).unwrap();
        let _ = app.register(&FAILING);
    }

    #[tokio::test]
    async fn stop_service_rejects_unknown_names() {
        let mut app = AppLifecycle::new(AppConfig::new());
        let err = app.stop_service("peermanager").await.unwrap_err();
        assert!(matches!(
            err,
            NodeError::Registry(RegistryError::UnknownService(name)) if name == "peermanager"
        ));
    }
}
