//! Media endpoints.
//!
//! - DELETE /api/v1/medias/photos/:pk (room owner or experience host)
//! - DELETE /api/v1/medias/videos/:pk (experience host)

use super::ensure_owner;
use crate::auth::CurrentUser;
use crate::server::state::AppState;
use crate::types::{Listing, PhotoId, VideoId};
use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use stayhub_web::AppError;

/// Delete a photo; only the administrator of its listing may.
pub async fn delete_photo(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(pk): Path<PhotoId>,
) -> Result<StatusCode, AppError> {
    let repositories = &state.repositories;
    let photo = repositories.media.photo(pk).await?;
    let administrator = match photo.listing {
        Listing::Room(room) => repositories.rooms.room(room).await?.owner,
        Listing::Experience(experience) => {
            repositories.experiences.experience(experience).await?.host
        },
    };
    ensure_owner(administrator, &user)?;

    repositories.media.delete_photo(pk).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete a video; only the experience host may.
pub async fn delete_video(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(pk): Path<VideoId>,
) -> Result<StatusCode, AppError> {
    let repositories = &state.repositories;
    let video = repositories.media.video(pk).await?;
    let host = repositories.experiences.experience(video.experience).await?.host;
    ensure_owner(host, &user)?;

    repositories.media.delete_video(pk).await?;
    Ok(StatusCode::NO_CONTENT)
}
