//! Port for signing bearer tokens.

use crate::domain::{AuthToken, TokenClaims};

use super::define_port_error;

define_port_error! {
    /// Errors raised by token issuer adapters.
    pub enum TokenIssuerError {
        /// The claims could not be encoded or signed.
        Signing { message: String } => "token signing failed: {message}",
    }
}

/// Produces signed tokens for verified identities.
#[cfg_attr(test, mockall::automock)]
pub trait TokenIssuer: Send + Sync {
    /// Sign `claims` into a bearer token.
    fn issue(&self, claims: &TokenClaims) -> Result<AuthToken, TokenIssuerError>;
}
