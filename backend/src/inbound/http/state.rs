//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on the [`UserAccounts`] driving port and remain testable without
//! I/O.

use std::sync::Arc;

use crate::domain::ports::UserAccounts;

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub accounts: Arc<dyn UserAccounts>,
}

impl HttpState {
    /// Construct state around an account service.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    ///
    /// use user_service::domain::UserAccountService;
    /// use user_service::inbound::http::state::HttpState;
    /// use user_service::outbound::persistence::InMemoryUserStore;
    /// use user_service::outbound::token::JwtTokenIssuer;
    ///
    /// let issuer = JwtTokenIssuer::ephemeral(
    ///     std::time::Duration::from_secs(60),
    ///     Arc::new(mockable::DefaultClock),
    /// )
    /// .expect("random signing key");
    /// let service = UserAccountService::new(Arc::new(InMemoryUserStore::new()), Arc::new(issuer));
    /// let state = HttpState::new(Arc::new(service));
    /// let _accounts = state.accounts.clone();
    /// ```
    pub fn new(accounts: Arc<dyn UserAccounts>) -> Self {
        Self { accounts }
    }
}
