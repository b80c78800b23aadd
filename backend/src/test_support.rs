//! Test utilities for the backend crate.
//!
//! Shared by unit tests (in `src/`) and integration tests (in `tests/`, via
//! the `test-support` feature).

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeDelta, Utc};
use mockable::Clock;

use crate::domain::ports::{ServiceRegistry, ServiceRegistryConnector, ServiceRegistryError};
use crate::domain::{RegistrationId, ServiceRecord};
use crate::outbound::registry::InProcessServiceRegistry;

/// Clock whose current instant only moves when told to.
pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn advance(&self, delta: Duration) {
        let delta = match TimeDelta::from_std(delta) {
            Ok(delta) => delta,
            Err(error) => {
                panic!("failed to convert Duration to TimeDelta: {error}; delta={delta:?}")
            }
        };
        *self.lock_clock() += delta;
    }

    fn lock_clock(&self) -> MutexGuard<'_, DateTime<Utc>> {
        match self.0.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("clock mutex"),
        }
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.lock_clock()
    }
}

/// One call observed by [`RecordingServiceRegistry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryCall {
    Publish(ServiceRecord),
    Unpublish(RegistrationId),
    Close,
}

/// Registry that delegates to the in-process backend and logs every call.
#[derive(Default)]
pub struct RecordingServiceRegistry {
    inner: InProcessServiceRegistry,
    calls: Mutex<Vec<RegistryCall>>,
}

impl RecordingServiceRegistry {
    /// Calls observed so far, in order.
    pub fn calls(&self) -> Vec<RegistryCall> {
        self.lock_calls().clone()
    }

    /// Records the backend currently holds.
    pub fn published(&self) -> Vec<ServiceRecord> {
        self.inner.records()
    }

    fn record(&self, call: RegistryCall) {
        self.lock_calls().push(call);
    }

    fn lock_calls(&self) -> MutexGuard<'_, Vec<RegistryCall>> {
        match self.calls.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("registry call log mutex"),
        }
    }
}

#[async_trait]
impl ServiceRegistry for RecordingServiceRegistry {
    async fn publish(
        &self,
        record: &ServiceRecord,
    ) -> Result<RegistrationId, ServiceRegistryError> {
        self.record(RegistryCall::Publish(record.clone()));
        self.inner.publish(record).await
    }

    async fn unpublish(&self, registration: &RegistrationId) -> Result<(), ServiceRegistryError> {
        self.record(RegistryCall::Unpublish(registration.clone()));
        self.inner.unpublish(registration).await
    }

    async fn close(&self) -> Result<(), ServiceRegistryError> {
        self.record(RegistryCall::Close);
        self.inner.close().await
    }
}

/// Connector handing out one shared [`RecordingServiceRegistry`].
#[derive(Default, Clone)]
pub struct RecordingRegistryConnector {
    registry: Arc<RecordingServiceRegistry>,
}

impl RecordingRegistryConnector {
    /// The registry every `connect` call returns.
    pub fn registry(&self) -> Arc<RecordingServiceRegistry> {
        self.registry.clone()
    }
}

#[async_trait]
impl ServiceRegistryConnector for RecordingRegistryConnector {
    async fn connect(&self) -> Result<Arc<dyn ServiceRegistry>, ServiceRegistryError> {
        Ok(self.registry.clone())
    }
}
