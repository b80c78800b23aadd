//! Driving port for user account use-cases.
//!
//! Inbound adapters call this port to run account operations without
//! importing the store or token infrastructure, so HTTP handler tests can
//! substitute a mock.

use async_trait::async_trait;

use crate::domain::{AuthenticatedUser, Error, LoginCredentials, UserRecord, Username};

/// Domain use-case port for account management.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserAccounts: Send + Sync {
    /// Create `record`; fails with a conflict when the username is taken.
    async fn add_user(&self, record: UserRecord) -> Result<Username, Error>;

    /// Fetch the stored record for `username`.
    async fn retrieve_user(&self, username: &Username) -> Result<UserRecord, Error>;

    /// Overwrite every mutable field of an existing record.
    async fn update_user(&self, username: &Username, record: UserRecord)
    -> Result<Username, Error>;

    /// Remove `username`; succeeds even when nothing matched.
    async fn delete_user(&self, username: &Username) -> Result<(), Error>;

    /// Verify credentials and issue a bearer token.
    async fn login_user(&self, credentials: &LoginCredentials)
    -> Result<AuthenticatedUser, Error>;

    /// End a session. Tokens are stateless, so nothing is invalidated.
    async fn logout_user(&self) -> Result<(), Error>;
}
