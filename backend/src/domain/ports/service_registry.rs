//! Ports for the service discovery backend.
//!
//! [`ServiceRegistryConnector`] builds a live [`ServiceRegistry`] client from
//! backend-specific configuration; the lifecycle manager owns the resulting
//! client and closes it at shutdown.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{RegistrationId, ServiceRecord};

use super::define_port_error;

define_port_error! {
    /// Errors raised by registry adapters.
    pub enum ServiceRegistryError {
        /// Backend could not be reached.
        Connection { message: String } => "service registry connection failed: {message}",
        /// Backend refused or failed the operation.
        Rejected { message: String } => "service registry rejected the request: {message}",
        /// Client was already closed.
        Closed => "service registry client is closed",
    }
}

/// Client for one discovery backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ServiceRegistry: Send + Sync {
    /// Publish `record`, returning the backend's handle for it.
    async fn publish(&self, record: &ServiceRecord) -> Result<RegistrationId, ServiceRegistryError>;

    /// Remove a previously published record.
    async fn unpublish(&self, registration: &RegistrationId) -> Result<(), ServiceRegistryError>;

    /// Release backend resources. Later calls fail with
    /// [`ServiceRegistryError::Closed`].
    async fn close(&self) -> Result<(), ServiceRegistryError>;
}

/// Builds registry clients.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ServiceRegistryConnector: Send + Sync {
    /// Open a client against the configured backend.
    async fn connect(&self) -> Result<Arc<dyn ServiceRegistry>, ServiceRegistryError>;
}
