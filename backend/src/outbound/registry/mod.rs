//! Service registry adapters.
//!
//! - **in-process**: records live in this process only. Default backend when
//!   no registry URL is configured, so the lifecycle still runs end to end.
//! - **redis**: records are JSON values in a Redis hash, keyed by
//!   registration id, so other services can discover this one.

mod in_process;
mod redis_registry;

pub use in_process::{InProcessRegistryConnector, InProcessServiceRegistry};
pub use redis_registry::{DEFAULT_RECORDS_KEY, RedisRegistryConnector, RedisServiceRegistry};
