//! Room endpoints.
//!
//! - GET/POST /api/v1/rooms
//! - GET/PUT/DELETE /api/v1/rooms/:pk (PUT/DELETE owner only)
//! - GET /api/v1/rooms/:pk/amenities?page=
//! - GET/POST /api/v1/rooms/:pk/reviews?page=
//! - POST /api/v1/rooms/:pk/photos (owner only)
//! - GET/POST/DELETE /api/v1/rooms/:pk/bookings
//! - PUT/DELETE /api/v1/rooms/:pk/bookings/:bk_pk

use super::{
    add_review, category_of_kind, ensure_owner, list_reviews, page, ReviewResponse,
};
use crate::auth::{CurrentUser, MaybeUser};
use crate::bookings::RoomRevision;
use crate::persistence::StoreError;
use crate::server::state::AppState;
use crate::types::{
    Amenity, AmenityId, BookingId, Category, CategoryId, CategoryKind, Listing, NewRoom, Photo,
    PhotoDraft, PublicBooking, PublicUser, ReviewDraft, Room, RoomDraft, RoomId, RoomKind, UserId,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use stayhub_web::{AppError, CorrelationId, JsonBody, PageQuery};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request to create a room.
#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    /// Listing fields
    #[serde(flatten)]
    pub room: RoomDraft,
    /// Category of kind `rooms`
    pub category: Option<CategoryId>,
    /// Amenities; one unknown key aborts the whole create
    #[serde(default)]
    pub amenities: Vec<AmenityId>,
}

/// Partial room update.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateRoomRequest {
    /// Name
    pub name: Option<String>,
    /// Country
    pub country: Option<String>,
    /// City
    pub city: Option<String>,
    /// Price per night
    pub price: Option<i32>,
    /// Number of rooms
    pub rooms: Option<i32>,
    /// Number of toilets
    pub toilets: Option<i32>,
    /// Description
    pub description: Option<String>,
    /// Street address
    pub address: Option<String>,
    /// Pets allowed
    pub pet_friendly: Option<bool>,
    /// Room kind
    pub kind: Option<RoomKind>,
    /// Category of kind `rooms`
    pub category: Option<CategoryId>,
    /// Replacement amenity set
    pub amenities: Option<Vec<AmenityId>>,
}

/// Room summary in lists.
#[derive(Debug, Serialize)]
pub struct RoomListItem {
    /// Primary key
    pub pk: RoomId,
    /// Name
    pub name: String,
    /// Country
    pub country: String,
    /// City
    pub city: String,
    /// Price per night
    pub price: i32,
    /// Mean review rating
    pub rating: Option<f64>,
    /// Whether the caller owns the room
    pub is_owner: bool,
    /// Photos
    pub photos: Vec<Photo>,
}

/// Full room view.
#[derive(Debug, Serialize)]
pub struct RoomDetail {
    /// Primary key
    pub pk: RoomId,
    /// Name
    pub name: String,
    /// Country
    pub country: String,
    /// City
    pub city: String,
    /// Price per night
    pub price: i32,
    /// Number of rooms
    pub rooms: i32,
    /// Number of toilets
    pub toilets: i32,
    /// Description
    pub description: String,
    /// Street address
    pub address: String,
    /// Pets allowed
    pub pet_friendly: bool,
    /// Room kind
    pub kind: RoomKind,
    /// Owner's public profile
    pub owner: PublicUser,
    /// Category, if still present
    pub category: Option<Category>,
    /// Amenities
    pub amenities: Vec<Amenity>,
    /// Photos
    pub photos: Vec<Photo>,
    /// Mean review rating
    pub rating: Option<f64>,
    /// Whether the caller owns the room
    pub is_owner: bool,
    /// Whether the room is in one of the caller's wishlists
    pub is_liked: bool,
}

/// Request to book a room.
#[derive(Debug, Deserialize)]
pub struct CreateRoomBookingRequest {
    /// First day
    pub check_in: NaiveDate,
    /// Last day
    pub check_out: NaiveDate,
    /// Number of guests
    pub guests: i32,
}

/// Partial room booking revision.
#[derive(Debug, Default, Deserialize)]
pub struct ReviseRoomBookingRequest {
    /// New first day
    pub check_in: Option<NaiveDate>,
    /// New last day
    pub check_out: Option<NaiveDate>,
    /// New guest count
    pub guests: Option<i32>,
}

// ============================================================================
// Views
// ============================================================================

/// Summarise `room` for `caller`.
pub(crate) async fn list_item(
    state: &AppState,
    room: Room,
    caller: Option<UserId>,
) -> Result<RoomListItem, AppError> {
    let listing = Listing::Room(room.pk);
    let rating = state.repositories.reviews.average_rating(listing).await?;
    let photos = state.repositories.media.photos(listing).await?;

    Ok(RoomListItem {
        pk: room.pk,
        is_owner: caller == Some(room.owner),
        name: room.name,
        country: room.country,
        city: room.city,
        price: room.price,
        rating,
        photos,
    })
}

async fn detail(
    state: &AppState,
    room: Room,
    caller: Option<UserId>,
) -> Result<RoomDetail, AppError> {
    let repositories = &state.repositories;
    let listing = Listing::Room(room.pk);

    let owner = repositories.users.user(room.owner).await?;
    let category = match room.category {
        Some(pk) => match repositories.catalog.category(pk).await {
            Ok(category) => Some(category),
            Err(StoreError::NotFound { .. }) => None,
            Err(other) => return Err(other.into()),
        },
        None => None,
    };
    let amenities = repositories
        .catalog
        .amenities()
        .await?
        .into_iter()
        .filter(|amenity| room.amenities.contains(&amenity.pk))
        .collect();
    let photos = repositories.media.photos(listing).await?;
    let rating = repositories.reviews.average_rating(listing).await?;
    let is_liked = match caller {
        Some(user) => repositories.wishlists.is_liked(user, listing).await?,
        None => false,
    };

    Ok(RoomDetail {
        pk: room.pk,
        name: room.name,
        country: room.country,
        city: room.city,
        price: room.price,
        rooms: room.rooms,
        toilets: room.toilets,
        description: room.description,
        address: room.address,
        pet_friendly: room.pet_friendly,
        kind: room.kind,
        owner: (&owner).into(),
        category,
        amenities,
        photos,
        rating,
        is_owner: caller == Some(room.owner),
        is_liked,
    })
}

fn validate_counts(price: i32, rooms: i32, toilets: i32) -> Result<(), AppError> {
    for (field, value) in [("price", price), ("rooms", rooms), ("toilets", toilets)] {
        if value < 0 {
            return Err(AppError::invalid_field(
                field,
                "Ensure this value is greater than or equal to 0.",
            ));
        }
    }
    Ok(())
}

// ============================================================================
// Handlers
// ============================================================================

/// List all rooms.
pub async fn list_rooms(
    caller: MaybeUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<RoomListItem>>, AppError> {
    let rooms = state.repositories.rooms.rooms().await?;
    let mut items = Vec::with_capacity(rooms.len());
    for room in rooms {
        items.push(list_item(&state, room, caller.pk()).await?);
    }
    Ok(Json(items))
}

/// Create a room owned by the caller, with its amenities, all or nothing.
pub async fn create_room(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    JsonBody(request): JsonBody<CreateRoomRequest>,
) -> Result<(StatusCode, Json<RoomDetail>), AppError> {
    let draft = request.room;
    validate_counts(draft.price, draft.rooms, draft.toilets)?;
    let category = category_of_kind(&state, request.category, CategoryKind::Rooms).await?;

    let room = state
        .repositories
        .rooms
        .create_room(NewRoom {
            draft,
            owner: user.pk,
            category,
            amenities: request.amenities,
        })
        .await?;
    tracing::info!(room = %room.pk, owner = %user.pk, "Room created");

    Ok((StatusCode::CREATED, Json(detail(&state, room, Some(user.pk)).await?)))
}

/// Get one room.
pub async fn get_room(
    caller: MaybeUser,
    State(state): State<AppState>,
    Path(pk): Path<RoomId>,
) -> Result<Json<RoomDetail>, AppError> {
    let room = state.repositories.rooms.room(pk).await?;
    Ok(Json(detail(&state, room, caller.pk()).await?))
}

/// Update a room; owner only.
pub async fn update_room(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(pk): Path<RoomId>,
    JsonBody(request): JsonBody<UpdateRoomRequest>,
) -> Result<Json<RoomDetail>, AppError> {
    let mut room = state.repositories.rooms.room(pk).await?;
    ensure_owner(room.owner, &user)?;

    if request.category.is_some() {
        room.category =
            Some(category_of_kind(&state, request.category, CategoryKind::Rooms).await?);
    }
    if let Some(amenities) = request.amenities {
        room.amenities = amenities;
    }
    if let Some(name) = request.name {
        room.name = name;
    }
    if let Some(country) = request.country {
        room.country = country;
    }
    if let Some(city) = request.city {
        room.city = city;
    }
    if let Some(price) = request.price {
        room.price = price;
    }
    if let Some(rooms) = request.rooms {
        room.rooms = rooms;
    }
    if let Some(toilets) = request.toilets {
        room.toilets = toilets;
    }
    if let Some(description) = request.description {
        room.description = description;
    }
    if let Some(address) = request.address {
        room.address = address;
    }
    if let Some(pet_friendly) = request.pet_friendly {
        room.pet_friendly = pet_friendly;
    }
    if let Some(kind) = request.kind {
        room.kind = kind;
    }
    validate_counts(room.price, room.rooms, room.toilets)?;

    let room = state.repositories.rooms.update_room(room).await?;
    Ok(Json(detail(&state, room, Some(user.pk)).await?))
}

/// Delete a room with its bookings, photos and reviews; owner only.
pub async fn delete_room(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(pk): Path<RoomId>,
) -> Result<StatusCode, AppError> {
    let room = state.repositories.rooms.room(pk).await?;
    ensure_owner(room.owner, &user)?;

    state.repositories.rooms.delete_room(pk).await?;
    tracing::info!(room = %pk, "Room deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// One page of a room's amenities.
pub async fn room_amenities(
    State(state): State<AppState>,
    Path(pk): Path<RoomId>,
    query: PageQuery,
) -> Result<Json<Vec<Amenity>>, AppError> {
    let amenities = state
        .repositories
        .rooms
        .room_amenities(pk, page(&state, query))
        .await?;
    Ok(Json(amenities))
}

/// One page of a room's reviews, newest first.
pub async fn room_reviews(
    State(state): State<AppState>,
    Path(pk): Path<RoomId>,
    query: PageQuery,
) -> Result<Json<Vec<ReviewResponse>>, AppError> {
    state.repositories.rooms.room(pk).await?;
    Ok(Json(list_reviews(&state, Listing::Room(pk), query).await?))
}

/// Review a room.
pub async fn create_room_review(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(pk): Path<RoomId>,
    JsonBody(draft): JsonBody<ReviewDraft>,
) -> Result<(StatusCode, Json<ReviewResponse>), AppError> {
    let review = add_review(&state, Listing::Room(pk), &user, draft).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

/// Attach a photo; owner only.
pub async fn create_room_photo(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(pk): Path<RoomId>,
    JsonBody(draft): JsonBody<PhotoDraft>,
) -> Result<(StatusCode, Json<Photo>), AppError> {
    let room = state.repositories.rooms.room(pk).await?;
    ensure_owner(room.owner, &user)?;
    if draft.file.trim().is_empty() {
        return Err(AppError::invalid_field("file", "This field may not be blank."));
    }

    let photo = state
        .repositories
        .media
        .add_photo(Listing::Room(pk), draft)
        .await?;
    Ok((StatusCode::CREATED, Json(photo)))
}

/// Upcoming bookings of a room (`check_out` today or later).
pub async fn room_bookings(
    State(state): State<AppState>,
    Path(pk): Path<RoomId>,
) -> Result<Json<Vec<PublicBooking>>, AppError> {
    let bookings = state.bookings.upcoming(Listing::Room(pk)).await?;
    Ok(Json(bookings.iter().map(PublicBooking::from).collect()))
}

/// Book a room.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8000/api/v1/rooms/1/bookings \
///   -H "Jwt: <token>" \
///   -H "Content-Type: application/json" \
///   -d '{"check_in": "2024-06-01", "check_out": "2024-06-05", "guests": 2}'
/// ```
pub async fn create_room_booking(
    CurrentUser(user): CurrentUser,
    CorrelationId(correlation_id): CorrelationId,
    State(state): State<AppState>,
    Path(pk): Path<RoomId>,
    JsonBody(request): JsonBody<CreateRoomBookingRequest>,
) -> Result<(StatusCode, Json<PublicBooking>), AppError> {
    let booking = state
        .bookings
        .book_room(
            pk,
            user.pk,
            request.check_in,
            request.check_out,
            request.guests,
        )
        .await?;
    tracing::info!(booking = %booking.pk, room = %pk, %correlation_id, "Room booked");
    Ok((StatusCode::CREATED, Json(PublicBooking::from(&booking))))
}

/// Delete every upcoming booking of a room; owner only.
pub async fn clear_room_bookings(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(pk): Path<RoomId>,
) -> Result<StatusCode, AppError> {
    state.bookings.clear_upcoming_room_bookings(pk, user.pk).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Revise one's own room booking.
pub async fn revise_room_booking(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path((pk, booking)): Path<(RoomId, BookingId)>,
    JsonBody(request): JsonBody<ReviseRoomBookingRequest>,
) -> Result<Json<PublicBooking>, AppError> {
    let revision = RoomRevision {
        check_in: request.check_in,
        check_out: request.check_out,
        guests: request.guests,
    };
    let booking = state
        .bookings
        .revise_room_booking(pk, user.pk, booking, revision)
        .await?;
    Ok(Json(PublicBooking::from(&booking)))
}

/// Cancel a room booking, as its owner or the room's owner.
pub async fn cancel_room_booking(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path((pk, booking)): Path<(RoomId, BookingId)>,
) -> Result<StatusCode, AppError> {
    state
        .bookings
        .cancel(Listing::Room(pk), user.pk, booking)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
