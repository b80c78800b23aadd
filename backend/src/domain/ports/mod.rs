//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driven ports (`UserStore`, `TokenIssuer`, `ServiceRegistry`) describe the
//! infrastructure the domain calls out to; each exposes a typed error so
//! adapters map their failures into predictable variants. The driving port
//! (`UserAccounts`) is what inbound adapters call.

mod macros;
pub(crate) use macros::define_port_error;

mod service_registry;
mod token_issuer;
mod user_accounts;
mod user_store;

#[cfg(test)]
pub use service_registry::{MockServiceRegistry, MockServiceRegistryConnector};
pub use service_registry::{ServiceRegistry, ServiceRegistryConnector, ServiceRegistryError};
#[cfg(test)]
pub use token_issuer::MockTokenIssuer;
pub use token_issuer::{TokenIssuer, TokenIssuerError};
#[cfg(test)]
pub use user_accounts::MockUserAccounts;
pub use user_accounts::UserAccounts;
#[cfg(test)]
pub use user_store::MockUserStore;
pub use user_store::{StoredUser, UserStore, UserStoreError};
