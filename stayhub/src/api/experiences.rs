//! Experience endpoints.
//!
//! - GET/POST /api/v1/experiences
//! - GET/PUT/DELETE /api/v1/experiences/:pk (PUT/DELETE host only)
//! - GET /api/v1/experiences/:pk/perks
//! - GET/POST /api/v1/experiences/:pk/reviews?page=
//! - POST /api/v1/experiences/:pk/photos (host only)
//! - PUT /api/v1/experiences/:pk/video (host only)
//! - GET/POST /api/v1/experiences/:pk/bookings
//! - PUT/DELETE /api/v1/experiences/:pk/bookings/:bk_pk

use super::{add_review, category_of_kind, ensure_owner, list_reviews, ReviewResponse};
use crate::auth::{CurrentUser, MaybeUser};
use crate::bookings::ExperienceRevision;
use crate::persistence::StoreError;
use crate::server::state::AppState;
use crate::types::{
    BookingId, Category, CategoryId, CategoryKind, Experience, ExperienceDraft, ExperienceId,
    Listing, NewExperience, Perk, PerkId, Photo, PhotoDraft, PublicBooking, PublicUser,
    ReviewDraft, UserId, Video,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use stayhub_web::{AppError, CorrelationId, JsonBody, PageQuery};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request to create an experience.
#[derive(Debug, Deserialize)]
pub struct CreateExperienceRequest {
    /// Listing fields
    #[serde(flatten)]
    pub experience: ExperienceDraft,
    /// Category of kind `experiences`
    pub category: Option<CategoryId>,
    /// Perks; one unknown key aborts the whole create
    #[serde(default)]
    pub perks: Vec<PerkId>,
}

/// Partial experience update.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateExperienceRequest {
    /// Name
    pub name: Option<String>,
    /// Country
    pub country: Option<String>,
    /// City
    pub city: Option<String>,
    /// Price per guest
    pub price: Option<i32>,
    /// Meeting address
    pub address: Option<String>,
    /// Daily start time
    pub start: Option<NaiveTime>,
    /// Daily end time
    pub end: Option<NaiveTime>,
    /// Description
    pub description: Option<String>,
    /// Slot capacity
    pub experience_max_team: Option<i32>,
    /// Category of kind `experiences`
    pub category: Option<CategoryId>,
    /// Replacement perk set
    pub perks: Option<Vec<PerkId>>,
}

/// Request to set the experience video.
#[derive(Debug, Deserialize)]
pub struct VideoRequest {
    /// File URL
    pub file: String,
}

/// Experience summary in lists.
#[derive(Debug, Serialize)]
pub struct ExperienceListItem {
    /// Primary key
    pub pk: ExperienceId,
    /// Name
    pub name: String,
    /// Country
    pub country: String,
    /// City
    pub city: String,
    /// Price per guest
    pub price: i32,
    /// Daily start time
    pub start: NaiveTime,
    /// Daily end time
    pub end: NaiveTime,
    /// Mean review rating
    pub rating: Option<f64>,
    /// Whether the caller hosts it
    pub is_host: bool,
}

/// Full experience view.
#[derive(Debug, Serialize)]
pub struct ExperienceDetail {
    /// Primary key
    pub pk: ExperienceId,
    /// Name
    pub name: String,
    /// Country
    pub country: String,
    /// City
    pub city: String,
    /// Price per guest
    pub price: i32,
    /// Meeting address
    pub address: String,
    /// Daily start time
    pub start: NaiveTime,
    /// Daily end time
    pub end: NaiveTime,
    /// Description
    pub description: String,
    /// Slot capacity
    pub experience_max_team: i32,
    /// Host's public profile
    pub host: PublicUser,
    /// Category, if still present
    pub category: Option<Category>,
    /// Perks
    pub perks: Vec<Perk>,
    /// Photos
    pub photos: Vec<Photo>,
    /// Video
    pub video: Option<Video>,
    /// Mean review rating
    pub rating: Option<f64>,
    /// Whether the caller hosts it
    pub is_host: bool,
    /// Whether it is in one of the caller's wishlists
    pub is_liked: bool,
}

/// Request to book an experience slot.
#[derive(Debug, Deserialize)]
pub struct CreateExperienceBookingRequest {
    /// Slot start
    pub experience_time: DateTime<Utc>,
    /// Number of guests
    pub guests: i32,
}

/// Partial experience booking revision.
#[derive(Debug, Default, Deserialize)]
pub struct ReviseExperienceBookingRequest {
    /// New slot
    pub experience_time: Option<DateTime<Utc>>,
    /// New guest count
    pub guests: Option<i32>,
}

// ============================================================================
// Views
// ============================================================================

/// Summarise `experience` for `caller`.
pub(crate) async fn list_item(
    state: &AppState,
    experience: Experience,
    caller: Option<UserId>,
) -> Result<ExperienceListItem, AppError> {
    let rating = state
        .repositories
        .reviews
        .average_rating(Listing::Experience(experience.pk))
        .await?;

    Ok(ExperienceListItem {
        pk: experience.pk,
        is_host: caller == Some(experience.host),
        name: experience.name,
        country: experience.country,
        city: experience.city,
        price: experience.price,
        start: experience.start,
        end: experience.end,
        rating,
    })
}

async fn detail(
    state: &AppState,
    experience: Experience,
    caller: Option<UserId>,
) -> Result<ExperienceDetail, AppError> {
    let repositories = &state.repositories;
    let listing = Listing::Experience(experience.pk);

    let host = repositories.users.user(experience.host).await?;
    let category = match experience.category {
        Some(pk) => match repositories.catalog.category(pk).await {
            Ok(category) => Some(category),
            Err(StoreError::NotFound { .. }) => None,
            Err(other) => return Err(other.into()),
        },
        None => None,
    };
    let perks = repositories.experiences.experience_perks(experience.pk).await?;
    let photos = repositories.media.photos(listing).await?;
    let video = repositories.media.experience_video(experience.pk).await?;
    let rating = repositories.reviews.average_rating(listing).await?;
    let is_liked = match caller {
        Some(user) => repositories.wishlists.is_liked(user, listing).await?,
        None => false,
    };

    Ok(ExperienceDetail {
        pk: experience.pk,
        name: experience.name,
        country: experience.country,
        city: experience.city,
        price: experience.price,
        address: experience.address,
        start: experience.start,
        end: experience.end,
        description: experience.description,
        experience_max_team: experience.experience_max_team,
        host: (&host).into(),
        category,
        perks,
        photos,
        video,
        rating,
        is_host: caller == Some(experience.host),
        is_liked,
    })
}

fn validate_listing(price: i32, max_team: i32) -> Result<(), AppError> {
    if price < 0 {
        return Err(AppError::invalid_field(
            "price",
            "Ensure this value is greater than or equal to 0.",
        ));
    }
    if max_team < 1 {
        return Err(AppError::invalid_field(
            "experience_max_team",
            "Ensure this value is greater than or equal to 1.",
        ));
    }
    Ok(())
}

// ============================================================================
// Handlers
// ============================================================================

/// List all experiences.
pub async fn list_experiences(
    caller: MaybeUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<ExperienceListItem>>, AppError> {
    let experiences = state.repositories.experiences.experiences().await?;
    let mut items = Vec::with_capacity(experiences.len());
    for experience in experiences {
        items.push(list_item(&state, experience, caller.pk()).await?);
    }
    Ok(Json(items))
}

/// Create an experience hosted by the caller, with its perks, all or nothing.
pub async fn create_experience(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    JsonBody(request): JsonBody<CreateExperienceRequest>,
) -> Result<(StatusCode, Json<ExperienceDetail>), AppError> {
    let draft = request.experience;
    validate_listing(draft.price, draft.experience_max_team)?;
    let category =
        category_of_kind(&state, request.category, CategoryKind::Experiences).await?;

    let experience = state
        .repositories
        .experiences
        .create_experience(NewExperience {
            draft,
            host: user.pk,
            category,
            perks: request.perks,
        })
        .await?;
    tracing::info!(experience = %experience.pk, host = %user.pk, "Experience created");

    Ok((
        StatusCode::CREATED,
        Json(detail(&state, experience, Some(user.pk)).await?),
    ))
}

/// Get one experience.
pub async fn get_experience(
    caller: MaybeUser,
    State(state): State<AppState>,
    Path(pk): Path<ExperienceId>,
) -> Result<Json<ExperienceDetail>, AppError> {
    let experience = state.repositories.experiences.experience(pk).await?;
    Ok(Json(detail(&state, experience, caller.pk()).await?))
}

/// Update an experience; host only.
pub async fn update_experience(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(pk): Path<ExperienceId>,
    JsonBody(request): JsonBody<UpdateExperienceRequest>,
) -> Result<Json<ExperienceDetail>, AppError> {
    let mut experience = state.repositories.experiences.experience(pk).await?;
    ensure_owner(experience.host, &user)?;

    if request.category.is_some() {
        experience.category = Some(
            category_of_kind(&state, request.category, CategoryKind::Experiences).await?,
        );
    }
    if let Some(perks) = request.perks {
        experience.perks = perks;
    }
    if let Some(name) = request.name {
        experience.name = name;
    }
    if let Some(country) = request.country {
        experience.country = country;
    }
    if let Some(city) = request.city {
        experience.city = city;
    }
    if let Some(price) = request.price {
        experience.price = price;
    }
    if let Some(address) = request.address {
        experience.address = address;
    }
    if let Some(start) = request.start {
        experience.start = start;
    }
    if let Some(end) = request.end {
        experience.end = end;
    }
    if let Some(description) = request.description {
        experience.description = description;
    }
    if let Some(max_team) = request.experience_max_team {
        experience.experience_max_team = max_team;
    }
    validate_listing(experience.price, experience.experience_max_team)?;

    let experience = state
        .repositories
        .experiences
        .update_experience(experience)
        .await?;
    Ok(Json(detail(&state, experience, Some(user.pk)).await?))
}

/// Delete an experience with its bookings, media and reviews; host only.
pub async fn delete_experience(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(pk): Path<ExperienceId>,
) -> Result<StatusCode, AppError> {
    let experience = state.repositories.experiences.experience(pk).await?;
    ensure_owner(experience.host, &user)?;

    state.repositories.experiences.delete_experience(pk).await?;
    tracing::info!(experience = %pk, "Experience deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Perks of an experience.
pub async fn experience_perks(
    State(state): State<AppState>,
    Path(pk): Path<ExperienceId>,
) -> Result<Json<Vec<Perk>>, AppError> {
    Ok(Json(state.repositories.experiences.experience_perks(pk).await?))
}

/// One page of an experience's reviews, newest first.
pub async fn experience_reviews(
    State(state): State<AppState>,
    Path(pk): Path<ExperienceId>,
    query: PageQuery,
) -> Result<Json<Vec<ReviewResponse>>, AppError> {
    state.repositories.experiences.experience(pk).await?;
    Ok(Json(list_reviews(&state, Listing::Experience(pk), query).await?))
}

/// Review an experience.
pub async fn create_experience_review(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(pk): Path<ExperienceId>,
    JsonBody(draft): JsonBody<ReviewDraft>,
) -> Result<(StatusCode, Json<ReviewResponse>), AppError> {
    let review = add_review(&state, Listing::Experience(pk), &user, draft).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

/// Attach a photo; host only.
pub async fn create_experience_photo(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(pk): Path<ExperienceId>,
    JsonBody(draft): JsonBody<PhotoDraft>,
) -> Result<(StatusCode, Json<Photo>), AppError> {
    let experience = state.repositories.experiences.experience(pk).await?;
    ensure_owner(experience.host, &user)?;
    if draft.file.trim().is_empty() {
        return Err(AppError::invalid_field("file", "This field may not be blank."));
    }

    let photo = state
        .repositories
        .media
        .add_photo(Listing::Experience(pk), draft)
        .await?;
    Ok((StatusCode::CREATED, Json(photo)))
}

/// Set the experience video, replacing any previous one; host only.
pub async fn put_experience_video(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(pk): Path<ExperienceId>,
    JsonBody(request): JsonBody<VideoRequest>,
) -> Result<Json<Video>, AppError> {
    let experience = state.repositories.experiences.experience(pk).await?;
    ensure_owner(experience.host, &user)?;
    if request.file.trim().is_empty() {
        return Err(AppError::invalid_field("file", "This field may not be blank."));
    }

    Ok(Json(state.repositories.media.put_video(pk, request.file).await?))
}

/// Upcoming bookings of an experience (slot start now or later).
pub async fn experience_bookings(
    State(state): State<AppState>,
    Path(pk): Path<ExperienceId>,
) -> Result<Json<Vec<PublicBooking>>, AppError> {
    let bookings = state.bookings.upcoming(Listing::Experience(pk)).await?;
    Ok(Json(bookings.iter().map(PublicBooking::from).collect()))
}

/// Book an experience slot.
pub async fn create_experience_booking(
    CurrentUser(user): CurrentUser,
    CorrelationId(correlation_id): CorrelationId,
    State(state): State<AppState>,
    Path(pk): Path<ExperienceId>,
    JsonBody(request): JsonBody<CreateExperienceBookingRequest>,
) -> Result<(StatusCode, Json<PublicBooking>), AppError> {
    let booking = state
        .bookings
        .book_experience(pk, user.pk, request.experience_time, request.guests)
        .await?;
    tracing::info!(booking = %booking.pk, experience = %pk, %correlation_id, "Experience booked");
    Ok((StatusCode::CREATED, Json(PublicBooking::from(&booking))))
}

/// Revise one's own experience booking.
pub async fn revise_experience_booking(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path((pk, booking)): Path<(ExperienceId, BookingId)>,
    JsonBody(request): JsonBody<ReviseExperienceBookingRequest>,
) -> Result<Json<PublicBooking>, AppError> {
    let revision = ExperienceRevision {
        experience_time: request.experience_time,
        guests: request.guests,
    };
    let booking = state
        .bookings
        .revise_experience_booking(pk, user.pk, booking, revision)
        .await?;
    Ok(Json(PublicBooking::from(&booking)))
}

/// Cancel an experience booking, as its owner or the host.
pub async fn cancel_experience_booking(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path((pk, booking)): Path<(ExperienceId, BookingId)>,
) -> Result<StatusCode, AppError> {
    state
        .bookings
        .cancel(Listing::Experience(pk), user.pk, booking)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
