//! User endpoints.
//!
//! - POST /api/v1/users - Sign up
//! - GET/PUT /api/v1/users/me - Own profile (requires auth)
//! - PUT /api/v1/users/change-password (requires auth)
//! - POST /api/v1/users/log-in - Exchange credentials for a token
//! - GET /api/v1/users/:username - Public profile

use crate::auth::{hash_password, issue_token, verify_password, AuthError, CurrentUser};
use crate::persistence::StoreError;
use crate::server::state::AppState;
use crate::types::{NewUser, PublicUser, User};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use stayhub_web::{AppError, JsonBody};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Sign-up request.
#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    /// Unique login name
    pub username: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Contact email
    #[serde(default)]
    pub email: String,
    /// Host flag
    #[serde(default)]
    pub is_host: bool,
    /// Plain-text password
    pub password: String,
}

/// Partial profile update.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    /// New login name
    pub username: Option<String>,
    /// New display name
    pub name: Option<String>,
    /// New email
    pub email: Option<String>,
    /// New host flag
    pub is_host: Option<bool>,
}

/// Password change request.
#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    /// Current password
    pub old_password: String,
    /// Replacement password
    pub new_password: String,
}

/// Log-in request.
#[derive(Debug, Deserialize)]
pub struct LogInRequest {
    /// Login name
    pub username: String,
    /// Password
    pub password: String,
}

/// Token issued on log-in; send it back in the `Jwt` header.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Signed token
    pub token: String,
}

fn require(field: &'static str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::invalid_field(field, "This field may not be blank."));
    }
    Ok(())
}

// ============================================================================
// Handlers
// ============================================================================

/// Create an account.
pub async fn sign_up(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<SignUpRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    require("username", &request.username)?;
    require("password", &request.password)?;

    let user = state
        .repositories
        .users
        .create_user(NewUser {
            username: request.username,
            name: request.name,
            email: request.email,
            is_host: request.is_host,
            password_hash: hash_password(&request.password)?,
        })
        .await?;
    tracing::info!(user = %user.pk, username = %user.username, "User signed up");

    Ok((StatusCode::CREATED, Json(user)))
}

/// The caller's own profile.
pub async fn me(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}

/// Update the caller's profile.
pub async fn update_me(
    CurrentUser(mut user): CurrentUser,
    State(state): State<AppState>,
    JsonBody(request): JsonBody<UpdateProfileRequest>,
) -> Result<Json<User>, AppError> {
    if let Some(username) = request.username {
        require("username", &username)?;
        user.username = username;
    }
    if let Some(name) = request.name {
        user.name = name;
    }
    if let Some(email) = request.email {
        user.email = email;
    }
    if let Some(is_host) = request.is_host {
        user.is_host = is_host;
    }

    Ok(Json(state.repositories.users.update_user(user).await?))
}

/// Replace the caller's password after checking the current one.
pub async fn change_password(
    CurrentUser(mut user): CurrentUser,
    State(state): State<AppState>,
    JsonBody(request): JsonBody<ChangePasswordRequest>,
) -> Result<StatusCode, AppError> {
    require("new_password", &request.new_password)?;
    if !verify_password(&request.old_password, &user.password_hash)? {
        return Err(AppError::bad_request("Wrong password")
            .with_field("old_password", "Wrong password"));
    }

    user.password_hash = hash_password(&request.new_password)?;
    state.repositories.users.update_user(user).await?;
    Ok(StatusCode::OK)
}

/// Exchange username and password for a token.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8000/api/v1/users/log-in \
///   -H "Content-Type: application/json" \
///   -d '{"username": "mina", "password": "secret"}'
/// # {"token":"eyJ0eXAiOiJKV1Qi..."}
/// ```
pub async fn log_in(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<LogInRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let user = match state
        .repositories
        .users
        .user_by_username(&request.username)
        .await
    {
        Ok(user) => user,
        Err(StoreError::NotFound { .. }) => return Err(AuthError::InvalidCredentials.into()),
        Err(other) => return Err(other.into()),
    };

    if !verify_password(&request.password, &user.password_hash)? {
        tracing::info!(username = %request.username, "Rejected log-in");
        return Err(AuthError::InvalidCredentials.into());
    }

    let token = issue_token(user.pk, &state.config.auth, Utc::now())?;
    Ok(Json(TokenResponse { token }))
}

/// Public profile by login name.
pub async fn public_profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<PublicUser>, AppError> {
    let user = state.repositories.users.user_by_username(&username).await?;
    Ok(Json((&user).into()))
}
