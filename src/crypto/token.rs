/// Session token issuing and verification
///
/// Tokens are HS256 JWTs with the account id as `sub` and the account role as
/// a custom `role` claim. There is no refresh flow and no revocation list: a
/// token stays valid until `exp`.
use crate::{
    account::Role,
    config::AuthConfig,
    error::{ClinicError, ClinicResult},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Identity recovered from a valid token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifiedToken {
    pub account_id: i64,
    pub role: Role,
}

/// Token verification failures
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token has expired")]
    Expired,

    #[error("Invalid token: {0}")]
    Invalid(String),
}

impl From<TokenError> for ClinicError {
    fn from(err: TokenError) -> Self {
        ClinicError::Authentication(err.to_string())
    }
}

/// Issues and verifies session tokens
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            ttl: Duration::seconds(config.token_ttl),
        }
    }

    /// Lifetime of tokens handed out by the login endpoint
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a signed token for an account
    pub fn issue(&self, account_id: i64, role: Role, ttl: Duration) -> ClinicResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: account_id.to_string(),
            role,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| ClinicError::Internal(format!("Failed to generate token: {}", e)))
    }

    /// Verify signature and expiry, returning the embedded identity
    pub fn verify(&self, token: &str) -> Result<VerifiedToken, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            tracing::warn!("Token verification failed: {}", e);
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature => {
                    TokenError::Invalid("signature mismatch".to_string())
                }
                _ => TokenError::Invalid(e.to_string()),
            }
        })?;

        let account_id = data
            .claims
            .sub
            .parse::<i64>()
            .map_err(|_| TokenError::Invalid("subject is not an account id".to_string()))?;

        Ok(VerifiedToken {
            account_id,
            role: data.claims.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(&test_config().authentication)
    }

    #[test]
    fn test_issue_and_verify() {
        let issuer = issuer();
        let token = issuer
            .issue(42, Role::Psychologist, issuer.ttl())
            .unwrap();

        let verified = issuer.verify(&token).unwrap();
        assert_eq!(verified.account_id, 42);
        assert_eq!(verified.role, Role::Psychologist);
    }

    #[test]
    fn test_expired_token() {
        let issuer = issuer();
        let token = issuer
            .issue(1, Role::Patient, Duration::seconds(-10))
            .unwrap();

        assert_eq!(issuer.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let issuer = issuer();
        let mut other_config = test_config().authentication;
        other_config.jwt_secret = "another-secret-key-that-is-long-enough".to_string();
        let other = TokenIssuer::new(&other_config);

        let token = other.issue(1, Role::Patient, other.ttl()).unwrap();
        assert!(matches!(issuer.verify(&token), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn test_garbage_is_invalid() {
        let issuer = issuer();
        assert!(matches!(issuer.verify("not.a.token"), Err(TokenError::Invalid(_))));
        assert!(matches!(issuer.verify(""), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn test_default_lifetime_is_one_day() {
        let issuer = issuer();
        assert_eq!(issuer.ttl(), Duration::days(1));
    }

    #[test]
    fn test_token_error_maps_to_authentication() {
        let err: ClinicError = TokenError::Expired.into();
        assert!(matches!(err, ClinicError::Authentication(_)));
    }
}
