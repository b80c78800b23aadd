//! Pooled PostgreSQL connections for [`DieselUserStore`](super::DieselUserStore).
//!
//! The pool is lazy: no connection is opened until the first store call, so
//! the service starts even while the database is still coming up. Store calls
//! then fail with [`PoolError::Unavailable`], which the store reports as a
//! connection failure (HTTP 503).

use std::time::Duration;

use diesel_async::AsyncPgConnection;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::pooled_connection::bb8::{Pool, PooledConnection};

use crate::domain::ports::define_port_error;

const DEFAULT_MAX_SIZE: u32 = 8;

define_port_error! {
    /// Pool failures.
    pub enum PoolError {
        /// No connection could be checked out in time.
        Unavailable { message: String } => "no user store connection available: {message}",
        /// The pool could not be built from its settings.
        Misconfigured { message: String } => "user store pool is misconfigured: {message}",
    }
}

/// Pool settings for the user store.
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use user_service::outbound::persistence::PoolSettings;
///
/// let settings = PoolSettings::new("postgres://users@localhost/cmad", Duration::from_secs(2))
///     .with_max_size(4);
/// assert_eq!(settings.max_size, 4);
/// assert_eq!(settings.checkout_timeout, Duration::from_secs(2));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSettings {
    pub database_url: String,
    pub max_size: u32,
    /// Keep at or below the store request timeout so a starved pool shows up
    /// as a connection failure rather than a timed-out request.
    pub checkout_timeout: Duration,
}

impl PoolSettings {
    /// Settings with the default pool size.
    pub fn new(database_url: impl Into<String>, checkout_timeout: Duration) -> Self {
        Self {
            database_url: database_url.into(),
            max_size: DEFAULT_MAX_SIZE,
            checkout_timeout,
        }
    }

    #[must_use]
    pub fn with_max_size(mut self, max_size: u32) -> Self {
        self.max_size = max_size.max(1);
        self
    }
}

/// Shared handle to the user store's connection pool.
#[derive(Clone)]
pub struct DbPool {
    inner: Pool<AsyncPgConnection>,
}

impl DbPool {
    /// Build the pool without opening any connection.
    ///
    /// # Errors
    /// Returns [`PoolError::Misconfigured`] when the pool rejects the
    /// settings.
    pub async fn connect(settings: &PoolSettings) -> Result<Self, PoolError> {
        let manager =
            AsyncDieselConnectionManager::<AsyncPgConnection>::new(&settings.database_url);
        let inner = Pool::builder()
            .max_size(settings.max_size)
            .min_idle(None)
            .connection_timeout(settings.checkout_timeout)
            .build(manager)
            .await
            .map_err(|err| PoolError::misconfigured(err.to_string()))?;
        Ok(Self { inner })
    }

    /// Check out a connection.
    ///
    /// # Errors
    /// Returns [`PoolError::Unavailable`] when the checkout timeout elapses or
    /// the database refuses the connection.
    pub async fn get(&self) -> Result<PooledConnection<'_, AsyncPgConnection>, PoolError> {
        self.inner
            .get()
            .await
            .map_err(|err| PoolError::unavailable(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn new_settings_use_the_default_size() {
        let settings = PoolSettings::new("postgres://localhost/cmad", Duration::from_secs(3));

        assert_eq!(settings.max_size, DEFAULT_MAX_SIZE);
        assert_eq!(settings.checkout_timeout, Duration::from_secs(3));
    }

    #[rstest]
    fn zero_max_size_is_clamped() {
        let settings =
            PoolSettings::new("postgres://localhost/cmad", Duration::from_secs(3)).with_max_size(0);

        assert_eq!(settings.max_size, 1);
    }

    #[rstest]
    #[tokio::test]
    async fn lazy_pool_builds_without_a_database() {
        // Port 1 refuses connections; building must not try it.
        let settings =
            PoolSettings::new("postgres://users@127.0.0.1:1/cmad", Duration::from_millis(50));

        let pool = DbPool::connect(&settings).await.expect("lazy pool");
        let err = pool.get().await.err().expect("checkout fails");

        assert!(matches!(err, PoolError::Unavailable { .. }));
    }
}
