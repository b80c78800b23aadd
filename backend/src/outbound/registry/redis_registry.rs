//! Redis-backed service registry.
//!
//! Each published record is stored as JSON in one hash (default `records`),
//! with the registration id as the field name. Consumers discover services
//! with `HGETALL`.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use bb8_redis::{RedisConnectionManager, bb8, redis};
use tracing::{debug, info};

use crate::domain::ports::{ServiceRegistry, ServiceRegistryConnector, ServiceRegistryError};
use crate::domain::{RegistrationId, ServiceRecord};

/// Hash holding every published record.
pub const DEFAULT_RECORDS_KEY: &str = "records";

type RedisPool = bb8::Pool<RedisConnectionManager>;

/// Registry client backed by a pooled Redis connection.
///
/// [`close`](ServiceRegistry::close) drops the pool; later calls fail with
/// [`ServiceRegistryError::Closed`].
pub struct RedisServiceRegistry {
    pool: Mutex<Option<RedisPool>>,
    key: String,
}

impl RedisServiceRegistry {
    fn new(pool: RedisPool, key: String) -> Self {
        Self {
            pool: Mutex::new(Some(pool)),
            key,
        }
    }

    fn pool(&self) -> Result<RedisPool, ServiceRegistryError> {
        self.pool
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(ServiceRegistryError::closed)
    }

    async fn connection(
        &self,
    ) -> Result<bb8::PooledConnection<'static, RedisConnectionManager>, ServiceRegistryError> {
        self.pool()?
            .get_owned()
            .await
            .map_err(|err| ServiceRegistryError::connection(err.to_string()))
    }
}

fn encode_record(record: &ServiceRecord) -> Result<String, ServiceRegistryError> {
    serde_json::to_string(record)
        .map_err(|err| ServiceRegistryError::rejected(format!("failed to encode record: {err}")))
}

fn map_redis_error(error: redis::RedisError) -> ServiceRegistryError {
    if error.is_io_error() || error.is_connection_dropped() || error.is_timeout() {
        ServiceRegistryError::connection(error.to_string())
    } else {
        ServiceRegistryError::rejected(error.to_string())
    }
}

#[async_trait]
impl ServiceRegistry for RedisServiceRegistry {
    async fn publish(
        &self,
        record: &ServiceRecord,
    ) -> Result<RegistrationId, ServiceRegistryError> {
        let payload = encode_record(record)?;
        let registration = RegistrationId::random();
        let mut conn = self.connection().await?;

        let _: i64 = redis::cmd("HSET")
            .arg(&self.key)
            .arg(registration.as_str())
            .arg(payload)
            .query_async(&mut *conn)
            .await
            .map_err(map_redis_error)?;
        debug!(%registration, key = %self.key, "record stored in redis");
        Ok(registration)
    }

    async fn unpublish(&self, registration: &RegistrationId) -> Result<(), ServiceRegistryError> {
        let mut conn = self.connection().await?;

        let removed: i64 = redis::cmd("HDEL")
            .arg(&self.key)
            .arg(registration.as_str())
            .query_async(&mut *conn)
            .await
            .map_err(map_redis_error)?;
        if removed == 0 {
            return Err(ServiceRegistryError::rejected(format!(
                "unknown registration {registration}"
            )));
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), ServiceRegistryError> {
        // Connections checked out by in-flight calls close when returned.
        let pool = self.pool.lock().unwrap_or_else(PoisonError::into_inner).take();
        if pool.is_some() {
            info!(key = %self.key, "redis registry pool dropped");
        }
        Ok(())
    }
}

/// Builds [`RedisServiceRegistry`] clients from a Redis URL.
#[derive(Debug, Clone)]
pub struct RedisRegistryConnector {
    url: String,
    key: String,
}

impl RedisRegistryConnector {
    /// Connector for `url`, storing records under [`DEFAULT_RECORDS_KEY`].
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            key: DEFAULT_RECORDS_KEY.to_owned(),
        }
    }

    /// Override the hash key.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }
}

#[async_trait]
impl ServiceRegistryConnector for RedisRegistryConnector {
    async fn connect(&self) -> Result<Arc<dyn ServiceRegistry>, ServiceRegistryError> {
        let manager = RedisConnectionManager::new(self.url.as_str())
            .map_err(|err| ServiceRegistryError::connection(err.to_string()))?;
        let pool = bb8::Pool::builder()
            .build(manager)
            .await
            .map_err(|err| ServiceRegistryError::connection(err.to_string()))?;

        Ok(Arc::new(RedisServiceRegistry::new(pool, self.key.clone())))
    }
}
