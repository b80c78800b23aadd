//! User account orchestration.
//!
//! Each operation is a short, strictly sequential series of store calls; no
//! user state is cached between requests. Every store call is bounded by the
//! configured request timeout.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::domain::ports::{TokenIssuer, UserAccounts, UserStore, UserStoreError};
use crate::domain::{
    AuthenticatedUser, Error, LoginCredentials, TokenClaims, UserRecord, Username,
};

/// Default bound for a single store call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Account service implementing the [`UserAccounts`] driving port.
///
/// Generic over the store and token issuer so tests can use concrete mocks
/// while the server wires trait objects.
pub struct UserAccountService<S: ?Sized, T: ?Sized> {
    store: Arc<S>,
    tokens: Arc<T>,
    request_timeout: Duration,
}

impl<S: ?Sized, T: ?Sized> Clone for UserAccountService<S, T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            tokens: Arc::clone(&self.tokens),
            request_timeout: self.request_timeout,
        }
    }
}

impl<S: ?Sized, T: ?Sized> UserAccountService<S, T> {
    /// Create a service using [`DEFAULT_REQUEST_TIMEOUT`].
    pub fn new(store: Arc<S>, tokens: Arc<T>) -> Self {
        Self {
            store,
            tokens,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Override the per-call store timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }
}

impl<S, T> UserAccountService<S, T>
where
    S: UserStore + ?Sized,
    T: TokenIssuer + ?Sized,
{
    async fn call_store<R, F>(&self, operation: &'static str, call: F) -> Result<R, Error>
    where
        F: Future<Output = Result<R, UserStoreError>>,
    {
        match tokio::time::timeout(self.request_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => {
                warn!(operation, error = %err, "user store call failed");
                Err(Self::map_store_error(err))
            }
            Err(_) => {
                warn!(operation, timeout = ?self.request_timeout, "user store call timed out");
                Err(Error::service_unavailable(format!(
                    "user store did not answer {operation} within {:?}",
                    self.request_timeout
                )))
            }
        }
    }

    fn map_store_error(error: UserStoreError) -> Error {
        match error {
            UserStoreError::Connection { message } => {
                Error::service_unavailable(format!("user store unavailable: {message}"))
            }
            UserStoreError::Query { message } => {
                Error::internal(format!("user store error: {message}"))
            }
            UserStoreError::Duplicate { username } => duplicate_user(&username),
        }
    }
}

fn duplicate_user(username: &str) -> Error {
    Error::conflict(format!("user {username} already exists"))
}

fn user_not_found(username: &Username) -> Error {
    Error::not_found(format!("user {username} not found"))
}

#[async_trait]
impl<S, T> UserAccounts for UserAccountService<S, T>
where
    S: UserStore + ?Sized,
    T: TokenIssuer + ?Sized,
{
    async fn add_user(&self, record: UserRecord) -> Result<Username, Error> {
        let username = record.username().clone();
        let existing = self
            .call_store("lookup", self.store.find_by_username(&username))
            .await?;
        if existing.is_some() {
            return Err(duplicate_user(username.as_str()));
        }

        // The unique index still arbitrates concurrent inserts for one name.
        let id = self.call_store("insert", self.store.insert(&record)).await?;
        info!(username = %username, %id, "user added");
        Ok(username)
    }

    async fn retrieve_user(&self, username: &Username) -> Result<UserRecord, Error> {
        self.call_store("lookup", self.store.find_by_username(username))
            .await?
            .map(|stored| stored.record)
            .ok_or_else(|| user_not_found(username))
    }

    async fn update_user(
        &self,
        username: &Username,
        record: UserRecord,
    ) -> Result<Username, Error> {
        let Some(mut stored) = self
            .call_store("lookup", self.store.find_by_username(username))
            .await?
        else {
            return Err(user_not_found(username));
        };

        stored.record.overwrite_from(&record);
        self.call_store("update", self.store.update_by_id(&stored.id, &stored.record))
            .await?;
        info!(username = %username, id = %stored.id, "user updated");
        Ok(username.clone())
    }

    async fn delete_user(&self, username: &Username) -> Result<(), Error> {
        let removed = self
            .call_store("delete", self.store.delete_by_username(username))
            .await?;
        info!(username = %username, removed, "user deleted");
        Ok(())
    }

    async fn login_user(
        &self,
        credentials: &LoginCredentials,
    ) -> Result<AuthenticatedUser, Error> {
        let stored = self
            .call_store("lookup", self.store.find_by_username(credentials.username()))
            .await?;

        // Unknown users and wrong passwords are reported identically.
        let Some(stored) = stored.filter(|stored| credentials.matches(&stored.record)) else {
            debug!(username = %credentials.username(), "login rejected");
            return Err(Error::unauthorized("invalid credentials"));
        };

        let token = self
            .tokens
            .issue(&TokenClaims::from(&stored.record))
            .map_err(|err| Error::internal(format!("failed to issue token: {err}")))?;
        info!(username = %credentials.username(), "user logged in");
        Ok(AuthenticatedUser {
            record: stored.record,
            token,
        })
    }

    async fn logout_user(&self) -> Result<(), Error> {
        Ok(())
    }
}

#[cfg(test)]
#[path = "user_account_service_tests.rs"]
mod tests;
