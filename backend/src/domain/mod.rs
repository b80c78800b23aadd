//! Domain primitives, services, and ports.
//!
//! Purpose: keep account rules and the registration lifecycle independent of
//! HTTP, Postgres, Redis, and token formats. Inbound adapters call the
//! driving port ([`ports::UserAccounts`]); outbound adapters implement the
//! driven ports.
//!
//! Public surface:
//! - Error / ErrorCode — transport-agnostic failure payload.
//! - UserRecord / Username — the persisted account.
//! - LoginCredentials / TokenClaims / AuthToken — login inputs and outputs.
//! - ServiceRecord / RegistrationId — registry entries.
//! - CircuitBreaker — guard for registry publish calls.
//! - LifecycleManager — publishes and withdraws registry entries.
//! - UserAccountService — implementation of the account use-cases.

pub mod auth;
pub mod circuit_breaker;
pub mod error;
pub mod lifecycle;
pub mod ports;
pub mod service_record;
pub mod trace_id;
pub mod user;
pub mod user_account_service;

pub use self::auth::{
    AuthToken, AuthenticatedUser, LoginCredentials, LoginValidationError, TokenClaims,
};
pub use self::circuit_breaker::{
    CircuitBreaker, CircuitBreakerSettings, CircuitBreakerState, CircuitError,
};
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::lifecycle::{LifecycleError, LifecycleManager, LifecyclePhase, LifecycleSettings};
pub use self::service_record::{
    API_NAME_METADATA_KEY, RegistrationId, ServiceLocation, ServiceRecord,
};
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};
pub use self::user::{UserRecord, UserRecordDto, UserValidationError, Username};
pub use self::user_account_service::{DEFAULT_REQUEST_TIMEOUT, UserAccountService};

