//! Amenity endpoints.
//!
//! - GET/POST /api/v1/amenities
//! - GET/PUT/DELETE /api/v1/amenities/:pk

use crate::auth::CurrentUser;
use crate::server::state::AppState;
use crate::types::{Amenity, AmenityDraft, AmenityId};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use stayhub_web::{AppError, JsonBody};

/// Partial amenity update. An explicit `"description": null` clears it.
#[derive(Debug, Deserialize)]
pub struct UpdateAmenityRequest {
    /// New name
    pub name: Option<String>,
    /// New description
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
}

/// Distinguish an absent field from an explicit `null`.
fn present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// List all amenities.
pub async fn list_amenities(
    State(state): State<AppState>,
) -> Result<Json<Vec<Amenity>>, AppError> {
    Ok(Json(state.repositories.catalog.amenities().await?))
}

/// Create an amenity.
pub async fn create_amenity(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
    JsonBody(draft): JsonBody<AmenityDraft>,
) -> Result<(StatusCode, Json<Amenity>), AppError> {
    if draft.name.trim().is_empty() {
        return Err(AppError::invalid_field("name", "This field may not be blank."));
    }

    let amenity = state.repositories.catalog.create_amenity(draft).await?;
    Ok((StatusCode::CREATED, Json(amenity)))
}

/// Get one amenity.
pub async fn get_amenity(
    State(state): State<AppState>,
    Path(pk): Path<AmenityId>,
) -> Result<Json<Amenity>, AppError> {
    Ok(Json(state.repositories.catalog.amenity(pk).await?))
}

/// Update an amenity.
pub async fn update_amenity(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
    Path(pk): Path<AmenityId>,
    JsonBody(request): JsonBody<UpdateAmenityRequest>,
) -> Result<Json<Amenity>, AppError> {
    let mut amenity = state.repositories.catalog.amenity(pk).await?;
    if let Some(name) = request.name {
        amenity.name = name;
    }
    if let Some(description) = request.description {
        amenity.description = description;
    }

    Ok(Json(state.repositories.catalog.update_amenity(amenity).await?))
}

/// Delete an amenity; rooms lose it.
pub async fn delete_amenity(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
    Path(pk): Path<AmenityId>,
) -> Result<StatusCode, AppError> {
    state.repositories.catalog.delete_amenity(pk).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_null_description_differs_from_absent() {
        let absent: UpdateAmenityRequest = serde_json::from_str(r#"{"name":"Wifi"}"#).unwrap();
        assert_eq!(absent.description, None);

        let cleared: UpdateAmenityRequest =
            serde_json::from_str(r#"{"description":null}"#).unwrap();
        assert_eq!(cleared.description, Some(None));
    }
}
