//! Router configuration for Stayhub.
//!
//! Builds the complete Axum router with all endpoints.

use super::health::{health_check, readiness_check};
use super::state::AppState;
use crate::api::{amenities, categories, experiences, medias, perks, rooms, users, wishlists};
use axum::{
    routing::{delete, get, post, put},
    Router,
};

/// Build the complete Axum router.
///
/// Health checks live at the root; the JSON API is nested under `/api/v1`.
/// Tracing and correlation-id layers are added by the binary.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Catalog
        .route(
            "/categories",
            get(categories::list_categories).post(categories::create_category),
        )
        .route(
            "/categories/:pk",
            get(categories::get_category)
                .put(categories::update_category)
                .delete(categories::delete_category),
        )
        .route(
            "/amenities",
            get(amenities::list_amenities).post(amenities::create_amenity),
        )
        .route(
            "/amenities/:pk",
            get(amenities::get_amenity)
                .put(amenities::update_amenity)
                .delete(amenities::delete_amenity),
        )
        .route("/perks", get(perks::list_perks).post(perks::create_perk))
        .route(
            "/perks/:pk",
            get(perks::get_perk)
                .put(perks::update_perk)
                .delete(perks::delete_perk),
        )
        // Rooms
        .route("/rooms", get(rooms::list_rooms).post(rooms::create_room))
        .route(
            "/rooms/:pk",
            get(rooms::get_room)
                .put(rooms::update_room)
                .delete(rooms::delete_room),
        )
        .route("/rooms/:pk/amenities", get(rooms::room_amenities))
        .route(
            "/rooms/:pk/reviews",
            get(rooms::room_reviews).post(rooms::create_room_review),
        )
        .route("/rooms/:pk/photos", post(rooms::create_room_photo))
        .route(
            "/rooms/:pk/bookings",
            get(rooms::room_bookings)
                .post(rooms::create_room_booking)
                .delete(rooms::clear_room_bookings),
        )
        .route(
            "/rooms/:pk/bookings/:bk_pk",
            put(rooms::revise_room_booking).delete(rooms::cancel_room_booking),
        )
        // Experiences
        .route(
            "/experiences",
            get(experiences::list_experiences).post(experiences::create_experience),
        )
        .route(
            "/experiences/:pk",
            get(experiences::get_experience)
                .put(experiences::update_experience)
                .delete(experiences::delete_experience),
        )
        .route("/experiences/:pk/perks", get(experiences::experience_perks))
        .route(
            "/experiences/:pk/reviews",
            get(experiences::experience_reviews).post(experiences::create_experience_review),
        )
        .route(
            "/experiences/:pk/photos",
            post(experiences::create_experience_photo),
        )
        .route("/experiences/:pk/video", put(experiences::put_experience_video))
        .route(
            "/experiences/:pk/bookings",
            get(experiences::experience_bookings).post(experiences::create_experience_booking),
        )
        .route(
            "/experiences/:pk/bookings/:bk_pk",
            put(experiences::revise_experience_booking)
                .delete(experiences::cancel_experience_booking),
        )
        // Media
        .route("/medias/photos/:pk", delete(medias::delete_photo))
        .route("/medias/videos/:pk", delete(medias::delete_video))
        // Wishlists
        .route(
            "/wishlists",
            get(wishlists::list_wishlists).post(wishlists::create_wishlist),
        )
        .route(
            "/wishlists/:pk",
            get(wishlists::get_wishlist)
                .put(wishlists::rename_wishlist)
                .delete(wishlists::delete_wishlist),
        )
        .route("/wishlists/:pk/rooms/:room_pk", put(wishlists::toggle_room))
        .route(
            "/wishlists/:pk/experiences/:ex_pk",
            put(wishlists::toggle_experience),
        )
        // Users
        .route("/users", post(users::sign_up))
        .route("/users/me", get(users::me).put(users::update_me))
        .route("/users/change-password", put(users::change_password))
        .route("/users/log-in", post(users::log_in))
        .route("/users/:username", get(users::public_profile));

    Router::new()
        // Health checks (no authentication)
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .nest("/api/v1", api_routes)
        .with_state(state)
}
