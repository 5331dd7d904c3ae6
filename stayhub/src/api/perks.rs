//! Perk endpoints.
//!
//! - GET/POST /api/v1/perks
//! - GET/PUT/DELETE /api/v1/perks/:pk

use crate::auth::CurrentUser;
use crate::server::state::AppState;
use crate::types::{Perk, PerkDraft, PerkId};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use stayhub_web::{AppError, JsonBody};

/// Partial perk update.
#[derive(Debug, Deserialize)]
pub struct UpdatePerkRequest {
    /// New name
    pub name: Option<String>,
    /// New details
    pub details: Option<String>,
    /// New explanation
    pub explanation: Option<String>,
}

/// List all perks.
pub async fn list_perks(State(state): State<AppState>) -> Result<Json<Vec<Perk>>, AppError> {
    Ok(Json(state.repositories.catalog.perks().await?))
}

/// Create a perk.
pub async fn create_perk(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
    JsonBody(draft): JsonBody<PerkDraft>,
) -> Result<(StatusCode, Json<Perk>), AppError> {
    if draft.name.trim().is_empty() {
        return Err(AppError::invalid_field("name", "This field may not be blank."));
    }

    let perk = state.repositories.catalog.create_perk(draft).await?;
    Ok((StatusCode::CREATED, Json(perk)))
}

/// Get one perk.
pub async fn get_perk(
    State(state): State<AppState>,
    Path(pk): Path<PerkId>,
) -> Result<Json<Perk>, AppError> {
    Ok(Json(state.repositories.catalog.perk(pk).await?))
}

/// Update a perk.
pub async fn update_perk(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
    Path(pk): Path<PerkId>,
    JsonBody(request): JsonBody<UpdatePerkRequest>,
) -> Result<Json<Perk>, AppError> {
    let mut perk = state.repositories.catalog.perk(pk).await?;
    if let Some(name) = request.name {
        perk.name = name;
    }
    if let Some(details) = request.details {
        perk.details = details;
    }
    if let Some(explanation) = request.explanation {
        perk.explanation = explanation;
    }

    Ok(Json(state.repositories.catalog.update_perk(perk).await?))
}

/// Delete a perk; experiences lose it.
pub async fn delete_perk(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
    Path(pk): Path<PerkId>,
) -> Result<StatusCode, AppError> {
    state.repositories.catalog.delete_perk(pk).await?;
    Ok(StatusCode::NO_CONTENT)
}
