//! Bearer token issuance and verification (HS256 JWT).

use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::auth_service::AuthError;
use crate::config::AuthConfig;

/// JWT claims embedded in every bearer token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// User id
    pub sub: i32,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: chrono::Duration,
}

impl TokenService {
    #[must_use]
    pub fn new(secret: &str, ttl_days: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: chrono::Duration::days(ttl_days),
        }
    }

    #[must_use]
    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(&config.jwt_secret, config.token_ttl_days)
    }

    pub fn issue(&self, user_id: i32) -> Result<String, AuthError> {
        let now = chrono::Utc::now();
        self.issue_at(user_id, now.timestamp(), (now + self.ttl).timestamp())
    }

    fn issue_at(&self, user_id: i32, iat: i64, exp: i64) -> Result<String, AuthError> {
        let claims = Claims {
            sub: user_id,
            iat,
            exp,
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AuthError::Internal(format!("Failed to sign token: {e}")))
    }

    /// Returns the user id of a well-formed, correctly signed, unexpired token.
    pub fn verify(&self, token: &str) -> Result<i32, AuthError> {
        if token.trim().is_empty() {
            return Err(AuthError::InvalidToken);
        }

        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims.sub)
            .map_err(|e| {
                tracing::debug!(error = %e, "Rejected bearer token");
                AuthError::InvalidToken
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new("test-secret-that-is-long-enough-for-hmac", 7)
    }

    #[test]
    fn test_issued_token_round_trips_user_id() {
        let tokens = service();
        let token = tokens.issue(42).unwrap();
        assert_eq!(tokens.verify(&token).unwrap(), 42);
    }

    #[test]
    fn test_token_lifetime_is_seven_days() {
        let tokens = service();
        let token = tokens.issue(1).unwrap();
        let data = decode::<Claims>(&token, &tokens.decoding, &Validation::default()).unwrap();
        assert_eq!(data.claims.exp - data.claims.iat, 7 * 24 * 60 * 60);
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let tokens = service();
        let now = chrono::Utc::now().timestamp();
        let token = tokens.issue_at(1, now - 8 * 86_400, now - 86_400).unwrap();
        assert!(matches!(tokens.verify(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_token_from_another_secret_is_rejected() {
        let token = TokenService::new("some-other-secret", 7).issue(1).unwrap();
        assert!(matches!(service().verify(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_garbage_and_empty_tokens_are_rejected() {
        assert!(matches!(service().verify(""), Err(AuthError::InvalidToken)));
        assert!(matches!(service().verify("not.a.jwt"), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_each_token_gets_a_unique_id() {
        let tokens = service();
        assert_ne!(tokens.issue(1).unwrap(), tokens.issue(1).unwrap());
    }
}
