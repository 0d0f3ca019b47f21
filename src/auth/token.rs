use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use tracing::{debug, instrument};

use super::types::AuthClaims;
use crate::shared::AppError;

/// Configuration for JWT token operations
#[derive(Clone)]
pub struct TokenConfig {
    secret: String,
}

impl TokenConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Issues a token for `auth_id`. Used by tooling and tests; production
    /// tokens come from the identity provider.
    #[instrument(skip(self))]
    pub fn create_token(&self, auth_id: &str, ttl: Duration) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = AuthClaims {
            sub: auth_id.to_string(),
            exp: (now + ttl).timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_ref()),
        )
        .map_err(|e| {
            debug!(error = %e, "Failed to encode JWT token");
            AppError::Internal
        })
    }

    /// Validates a JWT token and returns the claims if valid
    #[instrument(skip(self, token))]
    pub fn validate_token(&self, token: &str) -> Result<AuthClaims, AppError> {
        decode::<AuthClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_ref()),
            &Validation::default(),
        )
        .map(|data| {
            debug!(auth_id = %data.claims.sub, exp = data.claims.exp, "JWT token decoded successfully");
            data.claims
        })
        .map_err(|e| {
            debug!(error = %e, "Failed to decode JWT token");
            AppError::Unauthorized("Invalid or expired token".to_string())
        })
    }
}
