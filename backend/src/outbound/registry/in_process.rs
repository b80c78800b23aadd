//! Process-local service registry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tracing::debug;

use crate::domain::ports::{ServiceRegistry, ServiceRegistryConnector, ServiceRegistryError};
use crate::domain::{RegistrationId, ServiceRecord};

#[derive(Debug, Default)]
struct State {
    records: HashMap<RegistrationId, ServiceRecord>,
    closed: bool,
}

/// Registry backend holding records in memory.
#[derive(Debug, Default)]
pub struct InProcessServiceRegistry {
    state: Mutex<State>,
}

impl InProcessServiceRegistry {
    /// Open registry with no records.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the records currently published.
    pub fn records(&self) -> Vec<ServiceRecord> {
        self.lock_state().records.values().cloned().collect()
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.lock_state().closed
    }

    fn lock_state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn open_state(&self) -> Result<MutexGuard<'_, State>, ServiceRegistryError> {
        let state = self.lock_state();
        if state.closed {
            return Err(ServiceRegistryError::closed());
        }
        Ok(state)
    }
}

#[async_trait]
impl ServiceRegistry for InProcessServiceRegistry {
    async fn publish(
        &self,
        record: &ServiceRecord,
    ) -> Result<RegistrationId, ServiceRegistryError> {
        let registration = RegistrationId::random();
        self.open_state()?
            .records
            .insert(registration.clone(), record.clone());
        debug!(%registration, name = record.name(), "record stored in process");
        Ok(registration)
    }

    async fn unpublish(&self, registration: &RegistrationId) -> Result<(), ServiceRegistryError> {
        self.open_state()?
            .records
            .remove(registration)
            .map(|_| ())
            .ok_or_else(|| {
                ServiceRegistryError::rejected(format!("unknown registration {registration}"))
            })
    }

    async fn close(&self) -> Result<(), ServiceRegistryError> {
        let mut state = self.lock_state();
        state.closed = true;
        state.records.clear();
        Ok(())
    }
}

/// Connector sharing one in-process registry across `connect` calls.
#[derive(Debug, Default, Clone)]
pub struct InProcessRegistryConnector {
    registry: Arc<InProcessServiceRegistry>,
}

impl InProcessRegistryConnector {
    /// Connector around a fresh registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared registry.
    pub fn registry(&self) -> Arc<InProcessServiceRegistry> {
        self.registry.clone()
    }
}

#[async_trait]
impl ServiceRegistryConnector for InProcessRegistryConnector {
    async fn connect(&self) -> Result<Arc<dyn ServiceRegistry>, ServiceRegistryError> {
        Ok(self.registry.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn endpoint() -> ServiceRecord {
        ServiceRecord::http_endpoint("user-service", "localhost", 8080)
    }

    #[rstest]
    #[tokio::test]
    async fn publish_then_unpublish_round_trips() {
        let registry = InProcessServiceRegistry::new();

        let registration = registry.publish(&endpoint()).await.expect("publish");
        assert_eq!(registry.records(), vec![endpoint()]);

        registry.unpublish(&registration).await.expect("unpublish");
        assert!(registry.records().is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn unpublishing_an_unknown_registration_is_rejected() {
        let registry = InProcessServiceRegistry::new();

        let err = registry
            .unpublish(&RegistrationId::new("missing"))
            .await
            .expect_err("unknown registration");

        assert!(matches!(err, ServiceRegistryError::Rejected { .. }));
    }

    #[rstest]
    #[tokio::test]
    async fn closed_registry_refuses_further_calls() {
        let registry = InProcessServiceRegistry::new();
        registry.publish(&endpoint()).await.expect("publish");

        registry.close().await.expect("close");

        assert!(registry.is_closed());
        assert!(registry.records().is_empty());
        assert_eq!(
            registry.publish(&endpoint()).await,
            Err(ServiceRegistryError::Closed)
        );
    }

    #[rstest]
    #[tokio::test]
    async fn connector_hands_out_the_shared_registry() {
        let connector = InProcessRegistryConnector::new();

        let client = connector.connect().await.expect("connect");
        client.publish(&endpoint()).await.expect("publish");

        assert_eq!(connector.registry().records(), vec![endpoint()]);
    }
}
