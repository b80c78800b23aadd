//! Service registration lifecycle.
//!
//! [`LifecycleManager`] connects to the discovery backend, publishes the
//! service's records through a [`CircuitBreaker`], and remembers every record
//! it published so that [`LifecycleManager::shutdown`] can withdraw all of
//! them before the registry client is released.
//!
//! Phases move strictly forward:
//! `Uninitialized -> Initialized -> ShuttingDown -> Closed`.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::future::join_all;
use mockable::Clock;
use tokio::sync::{Mutex as AsyncMutex, RwLock};
use tracing::{debug, info, warn};

use super::circuit_breaker::{CircuitBreaker, CircuitBreakerSettings, CircuitError};
use super::ports::{ServiceRegistry, ServiceRegistryConnector, ServiceRegistryError};
use super::service_record::{API_NAME_METADATA_KEY, RegistrationId, ServiceRecord};

/// Failures reported by the lifecycle manager.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    /// The registry client could not be created.
    #[error("service registry initialisation failed: {0}")]
    Initialization(#[source] ServiceRegistryError),
    /// The registry refused or failed a publish call.
    #[error("service registration failed: {0}")]
    Registration(#[source] ServiceRegistryError),
    /// The breaker rejected the publish without contacting the registry.
    #[error("service registry circuit is open")]
    CircuitOpen,
    /// An unpublish (or the final close) failed during shutdown.
    #[error("service registry shutdown failed: {0}")]
    Shutdown(#[source] ServiceRegistryError),
    /// The manager has shut down.
    #[error("lifecycle manager is closed")]
    Closed,
}

/// Observable lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    /// No registry client yet; the first publish or `initialize` connects.
    Uninitialized,
    /// Connected and accepting publishes.
    Initialized,
    /// Withdrawing records; new publishes are rejected.
    ShuttingDown,
    /// Registry client closed. Terminal.
    Closed,
}

/// Static configuration for the manager.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LifecycleSettings {
    /// Value stored under `api.name` in published endpoint metadata.
    pub api_name: String,
    /// Breaker guarding publish calls.
    pub breaker: CircuitBreakerSettings,
}

struct Connection {
    registry: Arc<dyn ServiceRegistry>,
    breaker: CircuitBreaker,
}

enum Phase {
    Uninitialized,
    Initialized(Arc<Connection>),
    ShuttingDown,
    Closed,
}

/// Publishes this service's records and withdraws them at shutdown.
pub struct LifecycleManager {
    connector: Arc<dyn ServiceRegistryConnector>,
    settings: LifecycleSettings,
    clock: Arc<dyn Clock>,
    phase: AsyncMutex<Phase>,
    // `None` once shutdown has drained the set.
    registered: Mutex<Option<HashMap<ServiceRecord, RegistrationId>>>,
    // Read-held across each registry publish; shutdown takes the write side
    // before closing the client.
    in_flight: RwLock<()>,
}

impl LifecycleManager {
    /// Build an uninitialized manager.
    pub fn new(
        connector: Arc<dyn ServiceRegistryConnector>,
        settings: LifecycleSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            connector,
            settings,
            clock,
            phase: AsyncMutex::new(Phase::Uninitialized),
            registered: Mutex::new(Some(HashMap::new())),
            in_flight: RwLock::new(()),
        }
    }

    /// Current phase.
    pub async fn phase(&self) -> LifecyclePhase {
        match *self.phase.lock().await {
            Phase::Uninitialized => LifecyclePhase::Uninitialized,
            Phase::Initialized(_) => LifecyclePhase::Initialized,
            Phase::ShuttingDown => LifecyclePhase::ShuttingDown,
            Phase::Closed => LifecyclePhase::Closed,
        }
    }

    /// Records currently published by this manager.
    pub fn registered_records(&self) -> Vec<ServiceRecord> {
        self.lock_registered()
            .as_ref()
            .map(|records| records.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Connect to the registry and build the breaker.
    ///
    /// Calling this again once initialized leaves the existing client in place.
    pub async fn initialize(&self) -> Result<(), LifecycleError> {
        self.connection().await.map(|_| ())
    }

    /// Publish an HTTP endpoint rooted at `/`, tagged with the API name.
    pub async fn publish_endpoint(
        &self,
        name: &str,
        host: &str,
        port: u16,
    ) -> Result<(), LifecycleError> {
        let record = ServiceRecord::http_endpoint(name, host, port)
            .with_metadata(API_NAME_METADATA_KEY, self.settings.api_name.as_str());
        self.publish(record).await
    }

    /// Publish a logical message-bus service.
    pub async fn publish_logical_service(
        &self,
        name: &str,
        address: &str,
        contract: &str,
    ) -> Result<(), LifecycleError> {
        self.publish(ServiceRecord::message_service(name, address, contract))
            .await
    }

    async fn publish(&self, record: ServiceRecord) -> Result<(), LifecycleError> {
        let connection = self.connection().await?;
        let _in_flight = self.in_flight.read().await;

        match self.lock_registered().as_ref() {
            None => return Err(LifecycleError::Closed),
            Some(records) if records.contains_key(&record) => {
                debug!(name = record.name(), "record already published");
                return Ok(());
            }
            Some(_) => {}
        }

        let registry = connection.registry.clone();
        let outcome = connection
            .breaker
            .execute(|| async { registry.publish(&record).await })
            .await;
        let registration = match outcome {
            Ok(registration) => registration,
            Err(CircuitError::Open) => {
                warn!(name = record.name(), "publish rejected by open circuit");
                return Err(LifecycleError::CircuitOpen);
            }
            Err(CircuitError::Timeout(after)) => {
                warn!(name = record.name(), ?after, "publish timed out");
                return Err(LifecycleError::Registration(
                    ServiceRegistryError::connection(format!("publish timed out after {after:?}")),
                ));
            }
            Err(CircuitError::Call(err)) => {
                warn!(name = record.name(), error = %err, "publish failed");
                return Err(LifecycleError::Registration(err));
            }
        };

        let surplus = {
            let mut guard = self.lock_registered();
            match guard.as_mut().map(|records| records.entry(record)) {
                Some(Entry::Vacant(slot)) => {
                    info!(
                        name = slot.key().name(),
                        location = %slot.key().location(),
                        registration = %registration,
                        "service record published"
                    );
                    slot.insert(registration);
                    None
                }
                Some(Entry::Occupied(slot)) => {
                    debug!(name = slot.key().name(), "concurrent publish already tracked");
                    Some((registration, Ok(())))
                }
                // Shutdown drained the set while this publish was in flight.
                None => Some((registration, Err(LifecycleError::Closed))),
            }
        };

        // Every registration is either tracked or withdrawn here; shutdown
        // keeps the client open until this call releases `in_flight`.
        if let Some((registration, outcome)) = surplus {
            if let Err(err) = connection.registry.unpublish(&registration).await {
                warn!(registration = %registration, error = %err, "surplus unpublish failed");
            }
            return outcome;
        }
        Ok(())
    }

    /// Withdraw every published record, then close the registry client.
    ///
    /// Unpublish calls run concurrently and are all awaited. The client is
    /// closed even when some of them fail; the first failure is reported.
    pub async fn shutdown(&self) -> Result<(), LifecycleError> {
        let connection = {
            let mut phase = self.phase.lock().await;
            match std::mem::replace(&mut *phase, Phase::ShuttingDown) {
                Phase::Initialized(connection) => connection,
                Phase::Uninitialized => {
                    *phase = Phase::Closed;
                    self.lock_registered().take();
                    return Ok(());
                }
                previous @ (Phase::ShuttingDown | Phase::Closed) => {
                    *phase = previous;
                    return Err(LifecycleError::Closed);
                }
            }
        };

        let records = self.lock_registered().take().unwrap_or_default();
        // Publishes still in flight withdraw their own registrations.
        let _drained = self.in_flight.write().await;
        info!(count = records.len(), "unpublishing service records");

        let registry = &connection.registry;
        let outcomes = join_all(records.iter().map(|(record, registration)| async move {
            let outcome = registry.unpublish(registration).await;
            match &outcome {
                Ok(()) => debug!(name = record.name(), "service record unpublished"),
                Err(err) => warn!(name = record.name(), error = %err, "unpublish failed"),
            }
            outcome
        }))
        .await;
        let first_failure = outcomes.into_iter().find_map(Result::err);

        let closed = registry.close().await;
        *self.phase.lock().await = Phase::Closed;

        match (first_failure, closed) {
            (Some(err), _) | (None, Err(err)) => Err(LifecycleError::Shutdown(err)),
            (None, Ok(())) => {
                info!("service registry closed");
                Ok(())
            }
        }
    }

    async fn connection(&self) -> Result<Arc<Connection>, LifecycleError> {
        let mut phase = self.phase.lock().await;
        match &*phase {
            Phase::Initialized(connection) => return Ok(connection.clone()),
            Phase::ShuttingDown | Phase::Closed => return Err(LifecycleError::Closed),
            Phase::Uninitialized => {}
        }

        let registry = self
            .connector
            .connect()
            .await
            .map_err(LifecycleError::Initialization)?;
        let breaker = CircuitBreaker::new(self.settings.breaker.clone(), self.clock.clone());
        info!(breaker = %self.settings.breaker.name, "service registry initialised");

        let connection = Arc::new(Connection { registry, breaker });
        *phase = Phase::Initialized(connection.clone());
        Ok(connection)
    }

    fn lock_registered(&self) -> MutexGuard<'_, Option<HashMap<ServiceRecord, RegistrationId>>> {
        self.registered.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
