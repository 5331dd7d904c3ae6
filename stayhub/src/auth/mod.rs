//! Authentication: password hashing, signed tokens and request extractors.
//!
//! Clients authenticate with a `Jwt: <token>` header carrying an HS256 token
//! issued by `POST /api/v1/users/log-in`. For local development the
//! `Trust-Me: <username>` header can be enabled through
//! `AUTH_ALLOW_TRUST_ME_HEADER`.

pub mod middleware;
pub mod password;
pub mod token;

use stayhub_web::AppError;

pub use middleware::{CurrentUser, JWT_HEADER, MaybeUser, TRUST_ME_HEADER};
pub use password::{hash_password, verify_password};
pub use token::{Claims, decode_token, issue_token};

/// Authentication failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Unknown user or wrong password
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// The token's `exp` has passed
    #[error("Token expired")]
    TokenExpired,

    /// Bad signature, malformed token or missing claims
    #[error("Invalid token: {0}")]
    TokenInvalid(String),

    /// Hashing or signing failed
    #[error("Crypto error: {0}")]
    Crypto(String),
}

impl From<AuthError> for AppError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::Crypto(_) => {
                Self::internal("Authentication failed").with_source(error.into())
            },
            other => Self::unauthorized(other.to_string()),
        }
    }
}
