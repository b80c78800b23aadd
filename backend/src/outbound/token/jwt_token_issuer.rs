//! HS256 JSON Web Token issuer.
//!
//! Tokens carry the domain claims plus `iat`/`exp`; nothing is recorded
//! server-side, so logout has nothing to revoke.

use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use mockable::Clock;
use rand::RngCore;
use serde::Serialize;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::domain::ports::{TokenIssuer, TokenIssuerError};
use crate::domain::{AuthToken, TokenClaims};

/// Default token lifetime.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(3600);

const EPHEMERAL_KEY_LEN: usize = 32;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EncodedClaims<'a> {
    sub: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    first_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_name: Option<&'a str>,
    iat: i64,
    exp: i64,
}

/// Signs tokens with a shared HMAC secret.
pub struct JwtTokenIssuer {
    key: EncodingKey,
    fingerprint: String,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl JwtTokenIssuer {
    /// Build an issuer from secret bytes.
    ///
    /// # Errors
    ///
    /// Fails when the secret is empty.
    pub fn new(
        secret: &[u8],
        ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, TokenIssuerError> {
        if secret.is_empty() {
            return Err(TokenIssuerError::signing("token secret must not be empty"));
        }
        Ok(Self {
            key: EncodingKey::from_secret(secret),
            fingerprint: fingerprint(secret),
            ttl,
            clock,
        })
    }

    /// Issuer with a random secret that dies with the process.
    pub fn ephemeral(ttl: Duration, clock: Arc<dyn Clock>) -> Result<Self, TokenIssuerError> {
        let mut secret = Zeroizing::new([0_u8; EPHEMERAL_KEY_LEN]);
        rand::thread_rng().fill_bytes(&mut secret[..]);
        Self::new(&secret[..], ttl, clock)
    }

    /// Short SHA-256 fingerprint of the secret, safe to log.
    pub fn fingerprint(&self) -> &str {
        self.fingerprint.as_str()
    }
}

fn fingerprint(secret: &[u8]) -> String {
    let digest = Sha256::digest(secret);
    hex::encode(digest.get(..8).unwrap_or(&digest))
}

impl TokenIssuer for JwtTokenIssuer {
    fn issue(&self, claims: &TokenClaims) -> Result<AuthToken, TokenIssuerError> {
        let iat = self.clock.utc().timestamp();
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let encoded = EncodedClaims {
            sub: claims.sub.as_str(),
            first_name: claims.first_name.as_deref(),
            last_name: claims.last_name.as_deref(),
            iat,
            exp: iat.saturating_add(ttl),
        };

        encode(&Header::new(Algorithm::HS256), &encoded, &self.key)
            .map(AuthToken::new)
            .map_err(|err| TokenIssuerError::signing(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MutableClock;
    use chrono::{TimeZone, Utc};
    use jsonwebtoken::{DecodingKey, Validation, decode};
    use rstest::{fixture, rstest};
    use serde_json::Value;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    #[fixture]
    fn clock() -> Arc<MutableClock> {
        let now = Utc
            .with_ymd_and_hms(2026, 3, 1, 9, 0, 0)
            .single()
            .expect("valid timestamp");
        Arc::new(MutableClock::new(now))
    }

    fn decode_claims(token: &AuthToken) -> Value {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        decode::<Value>(token.as_str(), &DecodingKey::from_secret(SECRET), &validation)
            .expect("token verifies")
            .claims
    }

    #[rstest]
    fn issued_tokens_carry_identity_and_expiry(clock: Arc<MutableClock>) {
        let issuer = JwtTokenIssuer::new(SECRET, Duration::from_secs(600), clock.clone())
            .expect("issuer");
        let claims = TokenClaims {
            sub: "alice".to_owned(),
            first_name: Some("Alice".to_owned()),
            last_name: None,
        };

        let token = issuer.issue(&claims).expect("token");
        let decoded = decode_claims(&token);

        let iat = clock.utc().timestamp();
        assert_eq!(decoded["sub"], "alice");
        assert_eq!(decoded["firstName"], "Alice");
        assert!(decoded.get("lastName").is_none());
        assert_eq!(decoded["iat"], iat);
        assert_eq!(decoded["exp"], iat + 600);
    }

    #[rstest]
    fn empty_secrets_are_rejected(clock: Arc<MutableClock>) {
        assert!(JwtTokenIssuer::new(b"", DEFAULT_TOKEN_TTL, clock).is_err());
    }

    #[rstest]
    fn ephemeral_issuers_use_distinct_keys(clock: Arc<MutableClock>) {
        let first = JwtTokenIssuer::ephemeral(DEFAULT_TOKEN_TTL, clock.clone()).expect("issuer");
        let second = JwtTokenIssuer::ephemeral(DEFAULT_TOKEN_TTL, clock).expect("issuer");
        assert_ne!(first.fingerprint(), second.fingerprint());
    }

    #[rstest]
    fn fingerprint_is_stable_and_short(clock: Arc<MutableClock>) {
        let issuer = JwtTokenIssuer::new(SECRET, DEFAULT_TOKEN_TTL, clock).expect("issuer");
        assert_eq!(issuer.fingerprint(), fingerprint(SECRET));
        assert_eq!(issuer.fingerprint().len(), 16);
    }
}
