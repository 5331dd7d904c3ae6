//! Wishlist endpoints. All require authentication and only ever show the
//! caller's own wishlists; someone else's wishlist reads as not found.
//!
//! - GET/POST /api/v1/wishlists
//! - GET/PUT/DELETE /api/v1/wishlists/:pk
//! - PUT /api/v1/wishlists/:pk/rooms/:room_pk (toggle)
//! - PUT /api/v1/wishlists/:pk/experiences/:ex_pk (toggle)

use super::experiences::{self, ExperienceListItem};
use super::rooms::{self, RoomListItem};
use crate::auth::CurrentUser;
use crate::persistence::StoreError;
use crate::server::state::AppState;
use crate::types::{ExperienceId, RoomId, User, Wishlist, WishlistId};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use stayhub_web::{AppError, JsonBody};

/// Request to create or rename a wishlist.
#[derive(Debug, Deserialize)]
pub struct WishlistRequest {
    /// Name
    pub name: String,
}

/// A wishlist with its saved listings.
#[derive(Debug, Serialize)]
pub struct WishlistResponse {
    /// Primary key
    pub pk: WishlistId,
    /// Name
    pub name: String,
    /// Saved rooms
    pub rooms: Vec<RoomListItem>,
    /// Saved experiences
    pub experiences: Vec<ExperienceListItem>,
}

async fn response(
    state: &AppState,
    wishlist: Wishlist,
    user: &User,
) -> Result<WishlistResponse, AppError> {
    let mut saved_rooms = Vec::with_capacity(wishlist.rooms.len());
    for pk in wishlist.rooms {
        let room = state.repositories.rooms.room(pk).await?;
        saved_rooms.push(rooms::list_item(state, room, Some(user.pk)).await?);
    }

    let mut saved_experiences = Vec::with_capacity(wishlist.experiences.len());
    for pk in wishlist.experiences {
        let experience = state.repositories.experiences.experience(pk).await?;
        saved_experiences.push(experiences::list_item(state, experience, Some(user.pk)).await?);
    }

    Ok(WishlistResponse {
        pk: wishlist.pk,
        name: wishlist.name,
        rooms: saved_rooms,
        experiences: saved_experiences,
    })
}

/// Load one of the caller's wishlists.
async fn own_wishlist(state: &AppState, pk: WishlistId, user: &User) -> Result<Wishlist, AppError> {
    let wishlist = state.repositories.wishlists.wishlist(pk).await?;
    if wishlist.user != user.pk {
        return Err(StoreError::not_found("Wishlist", pk).into());
    }
    Ok(wishlist)
}

fn validate_name(name: &str) -> Result<(), AppError> {
    if name.trim().is_empty() {
        return Err(AppError::invalid_field("name", "This field may not be blank."));
    }
    Ok(())
}

/// The caller's wishlists.
pub async fn list_wishlists(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<WishlistResponse>>, AppError> {
    let wishlists = state.repositories.wishlists.wishlists(user.pk).await?;
    let mut responses = Vec::with_capacity(wishlists.len());
    for wishlist in wishlists {
        responses.push(response(&state, wishlist, &user).await?);
    }
    Ok(Json(responses))
}

/// Create an empty wishlist.
pub async fn create_wishlist(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    JsonBody(request): JsonBody<WishlistRequest>,
) -> Result<(StatusCode, Json<WishlistResponse>), AppError> {
    validate_name(&request.name)?;
    let wishlist = state
        .repositories
        .wishlists
        .create_wishlist(user.pk, request.name)
        .await?;
    Ok((StatusCode::CREATED, Json(response(&state, wishlist, &user).await?)))
}

/// One of the caller's wishlists.
pub async fn get_wishlist(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(pk): Path<WishlistId>,
) -> Result<Json<WishlistResponse>, AppError> {
    let wishlist = own_wishlist(&state, pk, &user).await?;
    Ok(Json(response(&state, wishlist, &user).await?))
}

/// Rename a wishlist.
pub async fn rename_wishlist(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(pk): Path<WishlistId>,
    JsonBody(request): JsonBody<WishlistRequest>,
) -> Result<Json<WishlistResponse>, AppError> {
    own_wishlist(&state, pk, &user).await?;
    validate_name(&request.name)?;
    let wishlist = state
        .repositories
        .wishlists
        .rename_wishlist(pk, request.name)
        .await?;
    Ok(Json(response(&state, wishlist, &user).await?))
}

/// Delete a wishlist.
pub async fn delete_wishlist(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(pk): Path<WishlistId>,
) -> Result<StatusCode, AppError> {
    own_wishlist(&state, pk, &user).await?;
    state.repositories.wishlists.delete_wishlist(pk).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Add the room if absent, remove it otherwise.
pub async fn toggle_room(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path((pk, room)): Path<(WishlistId, RoomId)>,
) -> Result<Json<WishlistResponse>, AppError> {
    own_wishlist(&state, pk, &user).await?;
    let wishlist = state.repositories.wishlists.toggle_room(pk, room).await?;
    Ok(Json(response(&state, wishlist, &user).await?))
}

/// Add the experience if absent, remove it otherwise.
pub async fn toggle_experience(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path((pk, experience)): Path<(WishlistId, ExperienceId)>,
) -> Result<Json<WishlistResponse>, AppError> {
    own_wishlist(&state, pk, &user).await?;
    let wishlist = state
        .repositories
        .wishlists
        .toggle_experience(pk, experience)
        .await?;
    Ok(Json(response(&state, wishlist, &user).await?))
}
