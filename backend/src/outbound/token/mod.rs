//! Token issuer adapters.

mod jwt_token_issuer;

pub use jwt_token_issuer::{DEFAULT_TOKEN_TTL, JwtTokenIssuer};
