//! Repository traits and their storage backends.
//!
//! Handlers and the booking service only see the traits below. Two backends
//! implement all of them:
//!
//! - [`postgres::PostgresStore`]: sqlx over `PostgreSQL`, with embedded
//!   migrations
//! - [`memory::MemoryStore`]: in-process tables for development and tests
//!
//! # Booking writes
//!
//! `create_booking` and `update_booking` re-run the conflict checker inside
//! the write (row lock in `PostgreSQL`, one mutex guard in memory), so two
//! concurrent requests cannot both pass the check and both commit.

pub mod memory;
pub mod postgres;

use crate::types::{
    Amenity, AmenityDraft, AmenityId, Booking, BookingId, Category, CategoryDraft, CategoryId,
    Experience, ExperienceId, Listing, NewBooking, NewExperience, NewRoom, NewUser, Perk,
    PerkDraft, PerkId, Photo, PhotoDraft, PhotoId, Review, ReviewDraft, Room, RoomId, User,
    UserId, Video, VideoId, Wishlist, WishlistId,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::fmt::Display;
use std::sync::Arc;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

/// Errors raised by repositories.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The addressed record does not exist
    #[error("{resource} with id {id} not found")]
    NotFound {
        /// Record type
        resource: &'static str,
        /// Requested key
        id: String,
    },

    /// A referenced record (amenity, perk, ...) does not exist
    #[error("{resource} with id {id} does not exist")]
    InvalidReference {
        /// Record type
        resource: &'static str,
        /// Referenced key
        id: i64,
    },

    /// A unique value is already taken
    #[error("{field} is already taken")]
    Duplicate {
        /// Offending field
        field: &'static str,
    },

    /// A room booking overlaps an existing one
    #[error("Those (or some) of those dates are already taken")]
    DateOverlap,

    /// An experience slot is full
    #[error("All {max_team} teams are already booked at this time")]
    CapacityExceeded {
        /// Slot capacity
        max_team: i32,
    },

    /// Backend failure
    #[error("Database error: {0}")]
    Database(String),
}

impl StoreError {
    /// `NotFound` for `resource` with key `id`.
    pub fn not_found(resource: &'static str, id: impl Display) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }
}

/// Result type for repository operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// A window into a paginated list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// Items skipped
    pub offset: i64,
    /// Items returned at most
    pub limit: i64,
}

impl Page {
    /// Page `number` (1-based) of `size` items.
    #[must_use]
    pub fn new(number: u32, size: u32) -> Self {
        let number = i64::from(number.max(1));
        let size = i64::from(size);
        Self {
            offset: (number - 1) * size,
            limit: size,
        }
    }

    /// Slice `items` to this page.
    #[must_use]
    pub fn apply<T>(self, items: Vec<T>) -> Vec<T> {
        let offset = usize::try_from(self.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(self.limit).unwrap_or(usize::MAX);
        items.into_iter().skip(offset).take(limit).collect()
    }
}

/// User accounts.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user; `Duplicate { field: "username" }` if the name is taken.
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;
    /// Fetch by primary key.
    async fn user(&self, pk: UserId) -> StoreResult<User>;
    /// Fetch by login name.
    async fn user_by_username(&self, username: &str) -> StoreResult<User>;
    /// Overwrite profile fields and password hash.
    async fn update_user(&self, user: User) -> StoreResult<User>;
}

/// Categories, amenities and perks.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// All categories.
    async fn categories(&self) -> StoreResult<Vec<Category>>;
    /// One category.
    async fn category(&self, pk: CategoryId) -> StoreResult<Category>;
    /// Insert a category.
    async fn create_category(&self, draft: CategoryDraft) -> StoreResult<Category>;
    /// Overwrite a category.
    async fn update_category(&self, category: Category) -> StoreResult<Category>;
    /// Delete a category; listings keep existing without one.
    async fn delete_category(&self, pk: CategoryId) -> StoreResult<()>;

    /// All amenities.
    async fn amenities(&self) -> StoreResult<Vec<Amenity>>;
    /// One amenity.
    async fn amenity(&self, pk: AmenityId) -> StoreResult<Amenity>;
    /// Insert an amenity.
    async fn create_amenity(&self, draft: AmenityDraft) -> StoreResult<Amenity>;
    /// Overwrite an amenity.
    async fn update_amenity(&self, amenity: Amenity) -> StoreResult<Amenity>;
    /// Delete an amenity and detach it from rooms.
    async fn delete_amenity(&self, pk: AmenityId) -> StoreResult<()>;

    /// All perks.
    async fn perks(&self) -> StoreResult<Vec<Perk>>;
    /// One perk.
    async fn perk(&self, pk: PerkId) -> StoreResult<Perk>;
    /// Insert a perk.
    async fn create_perk(&self, draft: PerkDraft) -> StoreResult<Perk>;
    /// Overwrite a perk.
    async fn update_perk(&self, perk: Perk) -> StoreResult<Perk>;
    /// Delete a perk and detach it from experiences.
    async fn delete_perk(&self, pk: PerkId) -> StoreResult<()>;
}

/// Rooms and their amenities.
#[async_trait]
pub trait RoomRepository: Send + Sync {
    /// All rooms.
    async fn rooms(&self) -> StoreResult<Vec<Room>>;
    /// One room.
    async fn room(&self, pk: RoomId) -> StoreResult<Room>;
    /// Insert a room with its amenities, all or nothing.
    async fn create_room(&self, room: NewRoom) -> StoreResult<Room>;
    /// Overwrite a room, replacing its amenities, all or nothing.
    async fn update_room(&self, room: Room) -> StoreResult<Room>;
    /// Delete a room with its bookings, photos and reviews.
    async fn delete_room(&self, pk: RoomId) -> StoreResult<()>;
    /// One page of a room's amenities.
    async fn room_amenities(&self, pk: RoomId, page: Page) -> StoreResult<Vec<Amenity>>;
}

/// Experiences and their perks.
#[async_trait]
pub trait ExperienceRepository: Send + Sync {
    /// All experiences.
    async fn experiences(&self) -> StoreResult<Vec<Experience>>;
    /// One experience.
    async fn experience(&self, pk: ExperienceId) -> StoreResult<Experience>;
    /// Insert an experience with its perks, all or nothing.
    async fn create_experience(&self, experience: NewExperience) -> StoreResult<Experience>;
    /// Overwrite an experience, replacing its perks, all or nothing.
    async fn update_experience(&self, experience: Experience) -> StoreResult<Experience>;
    /// Delete an experience with its bookings, media and reviews.
    async fn delete_experience(&self, pk: ExperienceId) -> StoreResult<()>;
    /// Perks of an experience.
    async fn experience_perks(&self, pk: ExperienceId) -> StoreResult<Vec<Perk>>;
}

/// Photos and videos.
#[async_trait]
pub trait MediaRepository: Send + Sync {
    /// Attach a photo to a listing.
    async fn add_photo(&self, listing: Listing, draft: PhotoDraft) -> StoreResult<Photo>;
    /// Photos of a listing.
    async fn photos(&self, listing: Listing) -> StoreResult<Vec<Photo>>;
    /// One photo.
    async fn photo(&self, pk: PhotoId) -> StoreResult<Photo>;
    /// Delete a photo.
    async fn delete_photo(&self, pk: PhotoId) -> StoreResult<()>;
    /// Set the experience's video, replacing any previous one.
    async fn put_video(&self, experience: ExperienceId, file: String) -> StoreResult<Video>;
    /// One video.
    async fn video(&self, pk: VideoId) -> StoreResult<Video>;
    /// Video of an experience, if any.
    async fn experience_video(&self, experience: ExperienceId) -> StoreResult<Option<Video>>;
    /// Delete a video.
    async fn delete_video(&self, pk: VideoId) -> StoreResult<()>;
}

/// Reviews.
#[async_trait]
pub trait ReviewRepository: Send + Sync {
    /// Add a review by `user`.
    async fn add_review(
        &self,
        listing: Listing,
        user: UserId,
        draft: ReviewDraft,
    ) -> StoreResult<Review>;
    /// One page of a listing's reviews, newest first.
    async fn reviews(&self, listing: Listing, page: Page) -> StoreResult<Vec<Review>>;
    /// Mean rating, `None` without reviews.
    async fn average_rating(&self, listing: Listing) -> StoreResult<Option<f64>>;
}

/// Wishlists.
#[async_trait]
pub trait WishlistRepository: Send + Sync {
    /// Wishlists owned by `user`.
    async fn wishlists(&self, user: UserId) -> StoreResult<Vec<Wishlist>>;
    /// One wishlist.
    async fn wishlist(&self, pk: WishlistId) -> StoreResult<Wishlist>;
    /// Create an empty wishlist.
    async fn create_wishlist(&self, user: UserId, name: String) -> StoreResult<Wishlist>;
    /// Rename a wishlist.
    async fn rename_wishlist(&self, pk: WishlistId, name: String) -> StoreResult<Wishlist>;
    /// Delete a wishlist.
    async fn delete_wishlist(&self, pk: WishlistId) -> StoreResult<()>;
    /// Add the room if absent, remove it otherwise.
    async fn toggle_room(&self, pk: WishlistId, room: RoomId) -> StoreResult<Wishlist>;
    /// Add the experience if absent, remove it otherwise.
    async fn toggle_experience(
        &self,
        pk: WishlistId,
        experience: ExperienceId,
    ) -> StoreResult<Wishlist>;
    /// Whether the listing is in any of the user's wishlists.
    async fn is_liked(&self, user: UserId, listing: Listing) -> StoreResult<bool>;
}

/// Bookings.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// All bookings of a listing.
    async fn bookings_for(&self, listing: Listing) -> StoreResult<Vec<Booking>>;
    /// One booking.
    async fn booking(&self, pk: BookingId) -> StoreResult<Booking>;
    /// Insert a booking after re-checking overlap or capacity.
    async fn create_booking(&self, booking: NewBooking) -> StoreResult<Booking>;
    /// Overwrite a booking after re-checking overlap or capacity, excluding
    /// the booking itself.
    async fn update_booking(&self, booking: Booking) -> StoreResult<Booking>;
    /// Delete a booking.
    async fn delete_booking(&self, pk: BookingId) -> StoreResult<()>;
    /// Delete the room's bookings with `check_out >= today`.
    async fn delete_upcoming_room_bookings(&self, room: RoomId, today: NaiveDate)
    -> StoreResult<u64>;
}

/// Liveness of the backend.
#[async_trait]
pub trait StoreHealth: Send + Sync {
    /// Backend name for readiness reports.
    fn backend(&self) -> &'static str;
    /// Round-trip to the backend.
    async fn ping(&self) -> StoreResult<()>;
}

/// Every repository, as shared trait objects.
#[derive(Clone)]
pub struct Repositories {
    /// Users
    pub users: Arc<dyn UserRepository>,
    /// Categories, amenities, perks
    pub catalog: Arc<dyn CatalogRepository>,
    /// Rooms
    pub rooms: Arc<dyn RoomRepository>,
    /// Experiences
    pub experiences: Arc<dyn ExperienceRepository>,
    /// Photos and videos
    pub media: Arc<dyn MediaRepository>,
    /// Reviews
    pub reviews: Arc<dyn ReviewRepository>,
    /// Wishlists
    pub wishlists: Arc<dyn WishlistRepository>,
    /// Bookings
    pub bookings: Arc<dyn BookingRepository>,
    /// Backend health
    pub health: Arc<dyn StoreHealth>,
}

impl Repositories {
    /// Serve every repository from one backend.
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: UserRepository
            + CatalogRepository
            + RoomRepository
            + ExperienceRepository
            + MediaRepository
            + ReviewRepository
            + WishlistRepository
            + BookingRepository
            + StoreHealth
            + 'static,
    {
        Self {
            users: store.clone(),
            catalog: store.clone(),
            rooms: store.clone(),
            experiences: store.clone(),
            media: store.clone(),
            reviews: store.clone(),
            wishlists: store.clone(),
            bookings: store.clone(),
            health: store,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_window() {
        assert_eq!(Page::new(1, 3), Page { offset: 0, limit: 3 });
        assert_eq!(Page::new(3, 3), Page { offset: 6, limit: 3 });
        assert_eq!(Page::new(0, 3), Page { offset: 0, limit: 3 });
        assert_eq!(Page::new(2, 2).apply(vec![1, 2, 3, 4, 5]), vec![3, 4]);
        assert!(Page::new(9, 2).apply(vec![1, 2]).is_empty());
    }
}
