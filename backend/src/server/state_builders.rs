//! Builders selecting adapters for the configured environment.
//!
//! Each builder falls back to a process-local adapter when its backing
//! service is not configured, so the binary runs standalone in development.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use actix_web::web;
use color_eyre::eyre::{Result, WrapErr, bail};
use mockable::DefaultClock;
use tracing::{info, warn};

use user_service::domain::UserAccountService;
use user_service::domain::ports::{ServiceRegistryConnector, TokenIssuer, UserStore};
use user_service::inbound::http::state::HttpState;
use user_service::outbound::persistence::{
    DbPool, DieselUserStore, InMemoryUserStore, PoolSettings, run_pending_migrations,
};
use user_service::outbound::registry::{InProcessRegistryConnector, RedisRegistryConnector};
use user_service::outbound::token::JwtTokenIssuer;

use super::config::read_token_secret;

/// Migrate and pool the database when a URL is given, otherwise keep users
/// in memory.
pub(crate) async fn build_user_store(
    database_url: Option<&str>,
    checkout_timeout: Duration,
) -> Result<Arc<dyn UserStore>> {
    let Some(url) = database_url else {
        warn!("no database configured; users are kept in memory");
        return Ok(Arc::new(InMemoryUserStore::new()));
    };

    let applied = run_pending_migrations(url)
        .await
        .wrap_err("failed to apply database migrations")?;
    info!(applied, "database migrations applied");

    let pool = DbPool::connect(&PoolSettings::new(url, checkout_timeout))
        .await
        .wrap_err("failed to build database pool")?;
    Ok(Arc::new(DieselUserStore::new(pool)))
}

/// Redis-backed registry when a URL is given, otherwise in-process.
pub(crate) fn build_registry_connector(
    registry_url: Option<&str>,
) -> Arc<dyn ServiceRegistryConnector> {
    match registry_url {
        Some(url) => Arc::new(RedisRegistryConnector::new(url)),
        None => {
            warn!("no registry configured; using the in-process registry");
            Arc::new(InProcessRegistryConnector::new())
        }
    }
}

/// Token issuer keyed from a secret file. Debug builds fall back to a
/// random per-process key; release builds refuse to start without one.
pub(crate) fn build_token_issuer(
    secret_file: Option<&Path>,
    ttl: Duration,
) -> Result<Arc<dyn TokenIssuer>> {
    let clock = Arc::new(DefaultClock);
    let issuer = match secret_file {
        Some(path) => {
            let secret = read_token_secret(path)?;
            JwtTokenIssuer::new(&secret, ttl, clock)?
        }
        None if cfg!(debug_assertions) => {
            warn!("using an ephemeral token signing key (dev only)");
            JwtTokenIssuer::ephemeral(ttl, clock)?
        }
        None => bail!("a token secret file is required in release builds"),
    };
    info!(fingerprint = issuer.fingerprint(), "token signing key loaded");
    Ok(Arc::new(issuer))
}

/// Shared HTTP state around the account service.
pub(crate) fn build_http_state(
    store: Arc<dyn UserStore>,
    tokens: Arc<dyn TokenIssuer>,
    request_timeout: Duration,
) -> web::Data<HttpState> {
    let accounts = UserAccountService::new(store, tokens).with_request_timeout(request_timeout);
    web::Data::new(HttpState::new(Arc::new(accounts)))
}
