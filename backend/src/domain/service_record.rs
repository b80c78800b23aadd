//! Records advertised through the service registry.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadata key carrying the configured API name.
pub const API_NAME_METADATA_KEY: &str = "api.name";

/// What a published record points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServiceLocation {
    /// Reachable HTTP endpoint.
    HttpEndpoint {
        host: String,
        port: u16,
        #[serde(rename = "root")]
        base_path: String,
    },
    /// Logical address on a message bus.
    MessageService {
        address: String,
        contract: String,
    },
}

impl fmt::Display for ServiceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HttpEndpoint {
                host,
                port,
                base_path,
            } => write!(f, "http://{host}:{port}{base_path}"),
            Self::MessageService { address, contract } => write!(f, "{address} ({contract})"),
        }
    }
}

/// One record published to the registry.
///
/// Records compare by value, so publishing an identical record twice is
/// detected by the lifecycle manager's registered set.
///
/// # Examples
/// ```
/// use user_service::domain::ServiceRecord;
///
/// let record = ServiceRecord::http_endpoint("user-service", "0.0.0.0", 8080)
///     .with_metadata("api.name", "users");
/// assert_eq!(record.location().to_string(), "http://0.0.0.0:8080/");
/// assert_eq!(record.metadata().get("api.name").map(String::as_str), Some("users"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceRecord {
    name: String,
    location: ServiceLocation,
    metadata: BTreeMap<String, String>,
}

impl ServiceRecord {
    /// HTTP endpoint rooted at `/`.
    pub fn http_endpoint(name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            location: ServiceLocation::HttpEndpoint {
                host: host.into(),
                port,
                base_path: "/".to_owned(),
            },
            metadata: BTreeMap::new(),
        }
    }

    /// Logical message-bus service.
    pub fn message_service(
        name: impl Into<String>,
        address: impl Into<String>,
        contract: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            location: ServiceLocation::MessageService {
                address: address.into(),
                contract: contract.into(),
            },
            metadata: BTreeMap::new(),
        }
    }

    /// Attach one metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Record name other services look up.
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Where the service can be reached.
    pub fn location(&self) -> &ServiceLocation {
        &self.location
    }

    /// Free-form key/value tags, such as `api.name`.
    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }
}

/// Backend-assigned handle for a published record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegistrationId(String);

impl RegistrationId {
    /// Wrap an identifier returned by the backend.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Fresh random identifier for backends that do not assign their own.
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Borrow the identifier.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    fn message_service_location_displays_address_and_contract() {
        let record = ServiceRecord::message_service("users-events", "users.address", "UserEvents");
        assert_eq!(record.location().to_string(), "users.address (UserEvents)");
        assert!(record.metadata().is_empty());
    }

    #[rstest]
    fn http_endpoint_serialises_with_type_tag() {
        let record = ServiceRecord::http_endpoint("user-service", "localhost", 8080)
            .with_metadata(API_NAME_METADATA_KEY, "users");
        let value = serde_json::to_value(&record).expect("serialise record");
        assert_eq!(
            value,
            json!({
                "name": "user-service",
                "location": {
                    "type": "http-endpoint",
                    "host": "localhost",
                    "port": 8080,
                    "root": "/"
                },
                "metadata": { "api.name": "users" },
            })
        );
    }

    #[rstest]
    fn identical_records_compare_equal() {
        let a = ServiceRecord::http_endpoint("svc", "h", 1).with_metadata("k", "v");
        let b = ServiceRecord::http_endpoint("svc", "h", 1).with_metadata("k", "v");
        assert_eq!(a, b);
        assert_ne!(a, b.with_metadata("k", "other"));
    }
}
