//! Service configuration loaded via OrthoConfig.
//!
//! Values come from CLI flags, `USER_SERVICE_*` environment variables, and
//! the optional configuration file, in that order of precedence. Every field
//! is optional; accessors apply the defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use cap_std::{ambient_authority, fs::Dir};
use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;
use zeroize::Zeroizing;

use user_service::domain::{CircuitBreakerSettings, DEFAULT_REQUEST_TIMEOUT, LifecycleSettings};
use user_service::outbound::token::DEFAULT_TOKEN_TTL;

const DEFAULT_HTTP_ADDRESS: &str = "0.0.0.0";
const DEFAULT_HTTP_PORT: u16 = 8080;
const DEFAULT_SERVICE_NAME: &str = "user-service";

/// Configuration for the user service binary.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "USER_SERVICE")]
pub struct ServiceSettings {
    /// Interface the HTTP server binds to.
    pub http_address: Option<String>,
    pub http_port: Option<u16>,
    /// Host published to the registry; defaults to the bind address.
    pub advertised_host: Option<String>,
    /// PostgreSQL URL. Without it the in-memory store is used.
    pub database_url: Option<String>,
    /// Redis URL. Without it the in-process registry is used.
    pub registry_url: Option<String>,
    /// Record name for the published HTTP endpoint.
    pub service_name: Option<String>,
    /// Metadata value stored under `api.name`.
    pub api_name: Option<String>,
    pub circuit_breaker_name: Option<String>,
    pub circuit_breaker_max_failures: Option<u32>,
    pub circuit_breaker_timeout_ms: Option<u64>,
    pub circuit_breaker_reset_timeout_ms: Option<u64>,
    /// Bound on each user store call.
    pub request_timeout_ms: Option<u64>,
    /// File holding the token signing secret.
    pub token_secret_file: Option<PathBuf>,
    pub token_ttl_secs: Option<u64>,
    /// Publish the HTTP endpoint at startup.
    pub publish_endpoint: Option<bool>,
}

impl ServiceSettings {
    /// Bind interface, `0.0.0.0` unless set.
    pub fn http_address(&self) -> &str {
        self.http_address.as_deref().unwrap_or(DEFAULT_HTTP_ADDRESS)
    }

    /// Bind port, 8080 unless set.
    pub fn http_port(&self) -> u16 {
        self.http_port.unwrap_or(DEFAULT_HTTP_PORT)
    }

    /// Host written into the published endpoint record.
    pub fn advertised_host(&self) -> &str {
        self.advertised_host
            .as_deref()
            .unwrap_or_else(|| self.http_address())
    }

    /// Name of the published endpoint record.
    pub fn service_name(&self) -> &str {
        self.service_name.as_deref().unwrap_or(DEFAULT_SERVICE_NAME)
    }

    /// Bound on each user store call.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout_ms
            .map_or(DEFAULT_REQUEST_TIMEOUT, Duration::from_millis)
    }

    /// Lifetime of issued bearer tokens.
    pub fn token_ttl(&self) -> Duration {
        self.token_ttl_secs
            .map_or(DEFAULT_TOKEN_TTL, Duration::from_secs)
    }

    /// Whether the HTTP endpoint is published at startup.
    pub fn publish_endpoint(&self) -> bool {
        self.publish_endpoint.unwrap_or(true)
    }

    /// Breaker settings with unset fields taken from the defaults.
    pub fn circuit_breaker(&self) -> CircuitBreakerSettings {
        let defaults = CircuitBreakerSettings::default();
        CircuitBreakerSettings {
            name: self
                .circuit_breaker_name
                .clone()
                .unwrap_or(defaults.name),
            max_failures: self
                .circuit_breaker_max_failures
                .unwrap_or(defaults.max_failures),
            call_timeout: self
                .circuit_breaker_timeout_ms
                .map_or(defaults.call_timeout, Duration::from_millis),
            reset_timeout: self
                .circuit_breaker_reset_timeout_ms
                .map_or(defaults.reset_timeout, Duration::from_millis),
            fallback_on_failure: defaults.fallback_on_failure,
        }
    }

    pub fn lifecycle(&self) -> LifecycleSettings {
        LifecycleSettings {
            api_name: self.api_name.clone().unwrap_or_default(),
            breaker: self.circuit_breaker(),
        }
    }
}

/// Failure reading the token secret file.
#[derive(Debug, Error)]
pub enum TokenSecretError {
    #[error("failed to read token secret at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("token secret at {path} is empty")]
    Empty { path: PathBuf },
}

/// Read the signing secret, dropping trailing whitespace left by editors.
pub fn read_token_secret(path: &Path) -> Result<Zeroizing<Vec<u8>>, TokenSecretError> {
    let read_error = |source| TokenSecretError::Read {
        path: path.to_path_buf(),
        source,
    };
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file_name = path.file_name().ok_or_else(|| {
        read_error(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "token secret path must be a file",
        ))
    })?;

    let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(read_error)?;
    let mut secret = Zeroizing::new(dir.read(Path::new(file_name)).map_err(read_error)?);
    let trimmed_len = secret
        .iter()
        .rposition(|byte| !byte.is_ascii_whitespace())
        .map_or(0, |last| last + 1);
    secret.truncate(trimmed_len);

    if secret.is_empty() {
        return Err(TokenSecretError::Empty {
            path: path.to_path_buf(),
        });
    }
    Ok(secret)
}
