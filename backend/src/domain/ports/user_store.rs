//! Port for the user document store.
//!
//! Records are keyed by username; the store also assigns an internal id that
//! updates address once a lookup has found the record.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{UserRecord, Username};

use super::define_port_error;

define_port_error! {
    /// Errors raised by user store adapters.
    pub enum UserStoreError {
        /// Store connection could not be established.
        Connection { message: String } => "user store connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "user store query failed: {message}",
        /// Insert rejected by the unique username constraint.
        Duplicate { username: String } => "user {username} already exists",
    }
}

/// A record together with its store-assigned identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUser {
    pub id: Uuid,
    pub record: UserRecord,
}

/// Port for reading and writing user records.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Find the record whose username equals `username`.
    async fn find_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<StoredUser>, UserStoreError>;

    /// Insert a new record, returning its assigned id.
    async fn insert(&self, record: &UserRecord) -> Result<Uuid, UserStoreError>;

    /// Replace the record stored under `id`.
    async fn update_by_id(&self, id: &Uuid, record: &UserRecord) -> Result<(), UserStoreError>;

    /// Remove every record with this username, returning how many matched.
    async fn delete_by_username(&self, username: &Username) -> Result<u64, UserStoreError>;
}
