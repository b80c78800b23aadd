//! Persistence adapters for the `UserStore` port.
//!
//! - **Diesel**: PostgreSQL via `diesel-async` and a `bb8` pool. Records are
//!   JSONB documents with a uniquely indexed `username` column.
//! - **In-memory**: process-local map used when no database is configured.
//!
//! Diesel row structs (`models.rs`) and schema definitions (`schema.rs`) are
//! internal and never reach the domain.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use user_service::outbound::persistence::{DbPool, DieselUserStore, PoolSettings};
//!
//! let settings = PoolSettings::new("postgres://localhost/cmad", Duration::from_secs(5));
//! let pool = DbPool::connect(&settings).await?;
//! let store = DieselUserStore::new(pool);
//! ```

mod diesel_user_store;
mod in_memory_user_store;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_user_store::DieselUserStore;
pub use in_memory_user_store::InMemoryUserStore;
pub use migrations::{MIGRATIONS, MigrationError, run_pending_migrations};
pub use pool::{DbPool, PoolError, PoolSettings};
