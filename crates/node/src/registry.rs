use crate::error::RegistryError;
use crate::service::{Service, ServiceHandle, ServiceSpec, ServiceState};
use std::collections::HashSet;
use std::sync::Arc;

/// A registered service together with its requirements and state.
#[derive(Debug)]
pub struct ServiceDescriptor {
    name: String,
    requires: Vec<String>,
    handle: ServiceHandle,
    state: ServiceState,
}

impl ServiceDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn requires(&self) -> &[String] {
        &self.requires
    }

    pub fn state(&self) -> ServiceState {
        self.state
    }

    pub fn handle(&self) -> &ServiceHandle {
        &self.handle
    }

    pub fn service(&self) -> &Arc<dyn Service> {
        self.handle.service()
    }

    pub(crate) fn set_state(&mut self, state: ServiceState) {
        self.state = state;
    }
}

/// Ordered set of uniquely named services.
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    entries: Vec<ServiceDescriptor>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a service. Fails without touching the registry if the name is
    /// taken or a required service is not registered yet.
    pub fn register(
        &mut self,
        name: &str,
        requires: &[&str],
        handle: ServiceHandle,
    ) -> Result<(), RegistryError> {
        if self.contains(name) {
            return Err(RegistryError::DuplicateService(name.to_string()));
        }
        if let Some(missing) = requires.iter().find(|dependency| !self.contains(dependency)) {
            return Err(RegistryError::MissingDependency {
                service: name.to_string(),
                dependency: missing.to_string(),
            });
        }

        self.entries.push(ServiceDescriptor {
            name: name.to_string(),
            requires: requires.iter().map(|r| r.to_string()).collect(),
            handle,
            state: ServiceState::Created,
        });
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|entry| entry.name == name)
    }

    pub fn lookup(&self, name: &str) -> Result<&ServiceDescriptor, RegistryError> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .ok_or_else(|| RegistryError::UnknownService(name.to_string()))
    }

    pub(crate) fn lookup_mut(
        &mut self,
        name: &str,
    ) -> Result<&mut ServiceDescriptor, RegistryError> {
        self.entries
            .iter_mut()
            .find(|entry| entry.name == name)
            .ok_or_else(|| RegistryError::UnknownService(name.to_string()))
    }

    /// Typed access to a registered service.
    pub fn get<S: Service>(&self, name: &str) -> Result<Arc<S>, RegistryError> {
        self.lookup(name)?
            .handle
            .downcast::<S>()
            .ok_or_else(|| RegistryError::ServiceTypeMismatch(name.to_string()))
    }

    /// Names in registration order.
    pub fn active_names(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &ServiceDescriptor> {
        self.entries.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl DoubleEndedIterator<Item = &mut ServiceDescriptor> {
        self.entries.iter_mut()
    }

    /// Orders the catalog entries that are not deactivated.
    ///
    /// Each entry comes after everything it requires; otherwise the catalog
    /// order is kept.
    pub fn plan<'a>(
        catalog: &'a [ServiceSpec],
        deactivated: &[String],
    ) -> Result<Vec<&'a ServiceSpec>, RegistryError> {
        let active: Vec<&ServiceSpec> = catalog
            .iter()
            .filter(|spec| !deactivated.iter().any(|name| name == spec.name))
            .collect();

        let mut seen = HashSet::new();
        for spec in &active {
            if !seen.insert(spec.name) {
                return Err(RegistryError::DuplicateService(spec.name.to_string()));
            }
        }
        for spec in &active {
            if let Some(missing) = spec.requires.iter().find(|dep| !seen.contains(*dep)) {
                return Err(RegistryError::MissingDependency {
                    service: spec.name.to_string(),
                    dependency: missing.to_string(),
                });
            }
        }

        let mut placed: HashSet<&str> = HashSet::new();
        let mut ordered = Vec::with_capacity(active.len());
        while ordered.len() < active.len() {
            let next = active.iter().find(|spec| {
                !placed.contains(spec.name) && spec.requires.iter().all(|dep| placed.contains(dep))
            });
            match next {
                Some(spec) => {
                    placed.insert(spec.name);
                    ordered.push(*spec);
                }
                None => {
                    let remaining = active
                        .iter()
                        .filter(|spec| !placed.contains(spec.name))
                        .map(|spec| spec.name.to_string())
                        .collect();
                    return Err(RegistryError::DependencyCycle(remaining));
                }
            }
        }
        Ok(ordered)
    }
}
