//! Category endpoints.
//!
//! - GET /api/v1/categories - List categories
//! - POST /api/v1/categories - Create a category (requires auth)
//! - GET /api/v1/categories/:pk - Category details
//! - PUT /api/v1/categories/:pk - Partial update (requires auth)
//! - DELETE /api/v1/categories/:pk - Delete; listings keep existing uncategorised (requires auth)

use crate::auth::CurrentUser;
use crate::server::state::AppState;
use crate::types::{Category, CategoryDraft, CategoryId, CategoryKind};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use stayhub_web::{AppError, JsonBody};

// ============================================================================
// Request Types
// ============================================================================

/// Partial category update.
#[derive(Debug, Deserialize)]
pub struct UpdateCategoryRequest {
    /// New name
    pub name: Option<String>,
    /// New kind
    pub kind: Option<CategoryKind>,
}

// ============================================================================
// Handlers
// ============================================================================

/// List all categories.
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<Category>>, AppError> {
    Ok(Json(state.repositories.catalog.categories().await?))
}

/// Create a category.
pub async fn create_category(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
    JsonBody(draft): JsonBody<CategoryDraft>,
) -> Result<(StatusCode, Json<Category>), AppError> {
    if draft.name.trim().is_empty() {
        return Err(AppError::invalid_field("name", "This field may not be blank."));
    }

    let category = state.repositories.catalog.create_category(draft).await?;
    tracing::info!(category = %category.pk, "Category created");
    Ok((StatusCode::CREATED, Json(category)))
}

/// Get one category.
pub async fn get_category(
    State(state): State<AppState>,
    Path(pk): Path<CategoryId>,
) -> Result<Json<Category>, AppError> {
    Ok(Json(state.repositories.catalog.category(pk).await?))
}

/// Update a category; omitted fields keep their value.
pub async fn update_category(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
    Path(pk): Path<CategoryId>,
    JsonBody(request): JsonBody<UpdateCategoryRequest>,
) -> Result<Json<Category>, AppError> {
    let mut category = state.repositories.catalog.category(pk).await?;
    if let Some(name) = request.name {
        category.name = name;
    }
    if let Some(kind) = request.kind {
        category.kind = kind;
    }

    Ok(Json(state.repositories.catalog.update_category(category).await?))
}

/// Delete a category.
pub async fn delete_category(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
    Path(pk): Path<CategoryId>,
) -> Result<StatusCode, AppError> {
    state.repositories.catalog.delete_category(pk).await?;
    tracing::info!(category = %pk, "Category deleted");
    Ok(StatusCode::NO_CONTENT)
}
