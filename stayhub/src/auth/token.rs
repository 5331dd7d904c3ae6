//! HS256 tokens for the `Jwt` header.

use super::AuthError;
use crate::config::AuthConfig;
use crate::types::UserId;
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Claims carried by a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Primary key of the authenticated user
    pub pk: i64,
    /// Issued-at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

/// Sign a token for `user`, valid for `config.token_ttl` seconds from `now`.
///
/// # Errors
///
/// [`AuthError::Crypto`] if encoding fails.
pub fn issue_token(
    user: UserId,
    config: &AuthConfig,
    now: DateTime<Utc>,
) -> Result<String, AuthError> {
    let iat = now.timestamp();
    let ttl = i64::try_from(config.token_ttl).unwrap_or(i64::MAX);
    let claims = Claims {
        pk: user.get(),
        iat,
        exp: iat.saturating_add(ttl),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AuthError::Crypto(format!("JWT encode: {e}")))
}

/// Verify a token's signature and expiry and return its claims.
///
/// # Errors
///
/// [`AuthError::TokenExpired`] or [`AuthError::TokenInvalid`].
pub fn decode_token(token: &str, config: &AuthConfig) -> Result<Claims, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_required_spec_claims(&["exp"]);

    jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::TokenInvalid(e.to_string()),
    })
}
