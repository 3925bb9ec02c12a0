//! Bearer tokens.
//!
//! Tokens are HS256 JWTs whose `sub` is the account id. The signing secret
//! lives in an [`AuthKeys`] value built from settings and handed to the
//! server state.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing bearer token")]
    Missing,
    #[error("token has expired")]
    Expired,
    #[error("invalid token")]
    Invalid,
    #[error("signing secret must not be empty")]
    EmptySecret,
    #[error("failed to sign token: {0}")]
    Signing(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Account id.
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct AuthKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl std::fmt::Debug for AuthKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthKeys")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl AuthKeys {
    pub fn new(secret: &str, ttl: Duration) -> Result<Self, AuthError> {
        if secret.is_empty() {
            return Err(AuthError::EmptySecret);
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        })
    }

    /// Issues a token for `account_id`, valid for the configured ttl.
    pub fn issue(&self, account_id: i64) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        self.sign(&Claims {
            sub: account_id.to_string(),
            iat: now,
            exp: now.saturating_add(ttl),
        })
    }

    /// Verifies signature and expiry, returning the account id.
    pub fn verify(&self, token: &str) -> Result<i64, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation).map_err(
            |err| match err.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::Invalid,
            },
        )?;
        data.claims.sub.parse().map_err(|_| AuthError::Invalid)
    }

    fn sign(&self, claims: &Claims) -> Result<String, AuthError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|err| AuthError::Signing(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> AuthKeys {
        AuthKeys::new("test-secret", Duration::from_secs(3600)).unwrap()
    }

    #[test]
    fn issued_token_verifies() {
        let keys = keys();
        let token = keys.issue(42).unwrap();
        assert_eq!(keys.verify(&token), Ok(42));
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let other = AuthKeys::new("other-secret", Duration::from_secs(3600)).unwrap();
        let token = other.issue(42).unwrap();
        assert_eq!(keys().verify(&token), Err(AuthError::Invalid));
    }

    #[test]
    fn expired_token_is_rejected() {
        let keys = keys();
        let now = Utc::now().timestamp();
        let token = keys
            .sign(&Claims {
                sub: "42".to_string(),
                iat: now - 7200,
                exp: now - 3600,
            })
            .unwrap();
        assert_eq!(keys.verify(&token), Err(AuthError::Expired));
    }

    #[test]
    fn garbage_is_rejected() {
        assert_eq!(keys().verify("not.a.jwt"), Err(AuthError::Invalid));
    }

    #[test]
    fn empty_secret_is_refused() {
        assert!(matches!(
            AuthKeys::new("", Duration::from_secs(1)),
            Err(AuthError::EmptySecret)
        ));
    }
}
