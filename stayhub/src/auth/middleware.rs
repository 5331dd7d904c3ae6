//! Axum extractors resolving the calling user.
//!
//! - [`CurrentUser`]: requires a valid credential (401 otherwise)
//! - [`MaybeUser`]: anonymous callers pass as `None`, but a credential that
//!   is present and invalid is still rejected
//!
//! # Usage
//!
//! ```rust,ignore
//! async fn create_room(
//!     CurrentUser(user): CurrentUser,
//!     State(state): State<AppState>,
//!     JsonBody(request): JsonBody<CreateRoomRequest>,
//! ) -> Result<Json<RoomDetail>, AppError> { ... }
//! ```

use super::token::decode_token;
use crate::persistence::StoreError;
use crate::server::state::AppState;
use crate::types::{User, UserId};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use stayhub_web::AppError;

/// Header carrying a signed token.
pub const JWT_HEADER: &str = "Jwt";

/// Development-only header naming the user to act as.
pub const TRUST_ME_HEADER: &str = "Trust-Me";

/// Authenticated caller.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Caller, if any credential was sent.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

impl MaybeUser {
    /// Key of the caller, if authenticated.
    #[must_use]
    pub fn pk(&self) -> Option<UserId> {
        self.0.as_ref().map(|user| user.pk)
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Result<Option<&'a str>, AppError> {
    parts
        .headers
        .get(name)
        .map(|value| {
            value
                .to_str()
                .map_err(|_| AppError::unauthorized(format!("Malformed {name} header")))
        })
        .transpose()
}

/// Map a failed user lookup; a vanished user is an authentication failure.
fn lookup_failed(error: StoreError) -> AppError {
    match error {
        StoreError::NotFound { .. } => AppError::unauthorized("User not found"),
        other => other.into(),
    }
}

async fn authenticate(parts: &Parts, state: &AppState) -> Result<Option<User>, AppError> {
    let auth = &state.config.auth;

    if let Some(token) = header(parts, JWT_HEADER)?.filter(|t| !t.is_empty()) {
        let claims = decode_token(token, auth)?;
        let user = state
            .repositories
            .users
            .user(UserId::new(claims.pk))
            .await
            .map_err(lookup_failed)?;
        return Ok(Some(user));
    }

    if auth.allow_trust_me_header {
        if let Some(username) = header(parts, TRUST_ME_HEADER)?.filter(|u| !u.is_empty()) {
            tracing::debug!(%username, "Authenticating through Trust-Me header");
            let user = state
                .repositories
                .users
                .user_by_username(username)
                .await
                .map_err(|error| match error {
                    StoreError::NotFound { .. } => {
                        AppError::unauthorized(format!("No user {username}"))
                    },
                    other => other.into(),
                })?;
            return Ok(Some(user));
        }
    }

    Ok(None)
}

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        authenticate(parts, state).await.map(Self)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        authenticate(parts, state)
            .await?
            .map(Self)
            .ok_or_else(|| AppError::unauthorized("Authentication credentials were not provided"))
    }
}
