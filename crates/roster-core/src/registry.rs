//! Lifecycle supervision for long-running background services.
//!
//! A [`ServiceRegistry`] owns a set of uniquely-named [`Service`]s and
//! starts or stops all of them concurrently. Each service is responsible
//! for its own liveness: one that ignores its stop signal will hold up
//! [`ServiceRegistry::stop_all`] indefinitely.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use futures::future::join_all;
use tracing::info;

/// A long-running component with an explicit start/stop lifecycle.
#[async_trait]
pub trait Service: Send + Sync {
    /// Unique name used for registration and logging.
    fn name(&self) -> &str;

    /// Start the service. Calling `start` on a running service is a no-op.
    async fn start(&self);

    /// Stop the service and wait until its background work has exited.
    async fn stop(&self);

    /// Whether the service is currently running.
    fn is_running(&self) -> bool;
}

/// Errors returned by [`ServiceRegistry::register`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// A service with the same name is already registered.
    #[error("service already registered: {0}")]
    Duplicate(String),
}

/// Registry of named services.
#[derive(Default)]
pub struct ServiceRegistry {
    services: Mutex<BTreeMap<String, Arc<dyn Service>>>,
}

impl ServiceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service under its name.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Duplicate`] if the name is taken.
    pub fn register(&self, service: Arc<dyn Service>) -> Result<Arc<dyn Service>, RegistryError> {
        let name = service.name().to_owned();
        let mut services = self.lock();
        if services.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }
        services.insert(name.clone(), Arc::clone(&service));
        info!(service = name, "Registered service");
        Ok(service)
    }

    /// Remove a service by name. The service is not stopped.
    pub fn deregister(&self, name: &str) -> Option<Arc<dyn Service>> {
        let removed = self.lock().remove(name);
        if removed.is_some() {
            info!(service = name, "Deregistered service");
        }
        removed
    }

    /// Remove every service. None of them are stopped.
    pub fn deregister_all(&self) {
        self.lock().clear();
    }

    /// Names of all registered services, sorted.
    pub fn names(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    /// Look up a service by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Service>> {
        self.lock().get(name).cloned()
    }

    /// Start every registered service concurrently and wait for all of them.
    pub async fn start_all(&self) {
        let services = self.snapshot();
        join_all(services.iter().map(|s| async move {
            info!(service = s.name(), "Starting service");
            s.start().await;
            info!(service = s.name(), "Started service");
        }))
        .await;
    }

    /// Stop every registered service concurrently and wait for all of them.
    pub async fn stop_all(&self) {
        let services = self.snapshot();
        join_all(services.iter().map(|s| async move {
            info!(service = s.name(), "Stopping service");
            s.stop().await;
            info!(service = s.name(), "Stopped service");
        }))
        .await;
    }

    /// Copy the registered services out so no lock is held across awaits.
    fn snapshot(&self) -> Vec<Arc<dyn Service>> {
        self.lock().values().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Arc<dyn Service>>> {
        self.services.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
