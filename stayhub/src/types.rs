//! Domain types for the Stayhub booking backend.
//!
//! Identifiers, catalog records (categories, amenities, perks), listings
//! (rooms and experiences), media, reviews, wishlists and bookings.
//!
//! A booking is a [`Reservation`] of exactly one kind: a room stay
//! (`check_in`..=`check_out`) or an experience slot (`experience_time`).
//! The flat, nullable shape only exists at the HTTP edge
//! ([`PublicBooking`]).

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wrap a raw primary key
            #[must_use]
            pub const fn new(pk: i64) -> Self {
                Self(pk)
            }

            /// The raw primary key
            #[must_use]
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

record_id!(
    /// Primary key of a user
    UserId
);
record_id!(
    /// Primary key of a category
    CategoryId
);
record_id!(
    /// Primary key of an amenity
    AmenityId
);
record_id!(
    /// Primary key of a perk
    PerkId
);
record_id!(
    /// Primary key of a room
    RoomId
);
record_id!(
    /// Primary key of an experience
    ExperienceId
);
record_id!(
    /// Primary key of a photo
    PhotoId
);
record_id!(
    /// Primary key of a video
    VideoId
);
record_id!(
    /// Primary key of a review
    ReviewId
);
record_id!(
    /// Primary key of a wishlist
    WishlistId
);
record_id!(
    /// Primary key of a booking
    BookingId
);

// ============================================================================
// Users
// ============================================================================

/// A registered user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct User {
    /// Primary key
    pub pk: UserId,
    /// Unique login name
    pub username: String,
    /// Display name
    pub name: String,
    /// Contact email
    pub email: String,
    /// Whether the user hosts rooms or experiences
    pub is_host: bool,
    /// Argon2id PHC string
    #[serde(skip)]
    pub password_hash: String,
}

/// Data for a new user.
#[derive(Clone, Debug)]
pub struct NewUser {
    /// Unique login name
    pub username: String,
    /// Display name
    pub name: String,
    /// Contact email
    pub email: String,
    /// Host flag
    pub is_host: bool,
    /// Argon2id PHC string
    pub password_hash: String,
}

/// Public profile of a user (no email, no hash).
#[derive(Clone, Debug, Serialize)]
pub struct PublicUser {
    /// Primary key
    pub pk: UserId,
    /// Login name
    pub username: String,
    /// Display name
    pub name: String,
    /// Host flag
    pub is_host: bool,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            pk: user.pk,
            username: user.username.clone(),
            name: user.name.clone(),
            is_host: user.is_host,
        }
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// What a category classifies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryKind {
    /// Room categories
    Rooms,
    /// Experience categories
    Experiences,
}

impl CategoryKind {
    /// Stored representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rooms => "rooms",
            Self::Experiences => "experiences",
        }
    }
}

impl FromStr for CategoryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rooms" => Ok(Self::Rooms),
            "experiences" => Ok(Self::Experiences),
            other => Err(format!("unknown category kind: {other}")),
        }
    }
}

/// A category of rooms or experiences.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Category {
    /// Primary key
    pub pk: CategoryId,
    /// Name
    pub name: String,
    /// Rooms or experiences
    pub kind: CategoryKind,
}

/// Category fields supplied by clients.
#[derive(Clone, Debug, Deserialize)]
pub struct CategoryDraft {
    /// Name
    pub name: String,
    /// Rooms or experiences
    pub kind: CategoryKind,
}

/// A room amenity (wifi, kitchen, ...).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Amenity {
    /// Primary key
    pub pk: AmenityId,
    /// Name
    pub name: String,
    /// Optional description
    pub description: Option<String>,
}

/// Amenity fields supplied by clients.
#[derive(Clone, Debug, Deserialize)]
pub struct AmenityDraft {
    /// Name
    pub name: String,
    /// Optional description
    #[serde(default)]
    pub description: Option<String>,
}

/// Something included in an experience.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Perk {
    /// Primary key
    pub pk: PerkId,
    /// Name
    pub name: String,
    /// Details
    pub details: String,
    /// Explanation
    pub explanation: String,
}

/// Perk fields supplied by clients.
#[derive(Clone, Debug, Deserialize)]
pub struct PerkDraft {
    /// Name
    pub name: String,
    /// Details
    #[serde(default)]
    pub details: String,
    /// Explanation
    #[serde(default)]
    pub explanation: String,
}

// ============================================================================
// Listings
// ============================================================================

/// How much of the place the guest gets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomKind {
    /// Whole place
    EntirePlace,
    /// Private room in a shared place
    PrivateRoom,
    /// Shared room
    SharedRoom,
}

impl RoomKind {
    /// Stored representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EntirePlace => "entire_place",
            Self::PrivateRoom => "private_room",
            Self::SharedRoom => "shared_room",
        }
    }
}

impl FromStr for RoomKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "entire_place" => Ok(Self::EntirePlace),
            "private_room" => Ok(Self::PrivateRoom),
            "shared_room" => Ok(Self::SharedRoom),
            other => Err(format!("unknown room kind: {other}")),
        }
    }
}

/// A bookable room.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Room {
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
    /// Owner
    pub owner: UserId,
    /// Category (kind `rooms`)
    pub category: Option<CategoryId>,
    /// Amenities
    pub amenities: Vec<AmenityId>,
}

/// Room fields chosen by the owner.
#[derive(Clone, Debug, Deserialize)]
pub struct RoomDraft {
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
    #[serde(default)]
    pub description: String,
    /// Street address
    pub address: String,
    /// Pets allowed
    #[serde(default)]
    pub pet_friendly: bool,
    /// Room kind
    pub kind: RoomKind,
}

/// A new room with its owner and relations.
#[derive(Clone, Debug)]
pub struct NewRoom {
    /// Listing fields
    pub draft: RoomDraft,
    /// Owner
    pub owner: UserId,
    /// Category
    pub category: CategoryId,
    /// Amenities
    pub amenities: Vec<AmenityId>,
}

/// A bookable experience.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Experience {
    /// Primary key
    pub pk: ExperienceId,
    /// Name
    pub name: String,
    /// Country
    pub country: String,
    /// City
    pub city: String,
    /// Host
    pub host: UserId,
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
    /// Category (kind `experiences`)
    pub category: Option<CategoryId>,
    /// Perks
    pub perks: Vec<PerkId>,
    /// Bookings allowed at one exact time slot
    pub experience_max_team: i32,
}

/// Experience fields chosen by the host.
#[derive(Clone, Debug, Deserialize)]
pub struct ExperienceDraft {
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
    #[serde(default)]
    pub description: String,
    /// Slot capacity
    pub experience_max_team: i32,
}

/// A new experience with its host and relations.
#[derive(Clone, Debug)]
pub struct NewExperience {
    /// Listing fields
    pub draft: ExperienceDraft,
    /// Host
    pub host: UserId,
    /// Category
    pub category: CategoryId,
    /// Perks
    pub perks: Vec<PerkId>,
}

/// The listing a photo or review belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Listing {
    /// A room
    Room(RoomId),
    /// An experience
    Experience(ExperienceId),
}

// ============================================================================
// Media & reviews
// ============================================================================

/// A photo of a room or experience. `file` is a URL to external storage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Photo {
    /// Primary key
    pub pk: PhotoId,
    /// File URL
    pub file: String,
    /// Caption
    pub description: String,
    /// Owning listing
    #[serde(skip)]
    pub listing: Listing,
}

/// Photo fields supplied by clients.
#[derive(Clone, Debug, Deserialize)]
pub struct PhotoDraft {
    /// File URL
    pub file: String,
    /// Caption
    #[serde(default)]
    pub description: String,
}

/// The video of an experience.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Video {
    /// Primary key
    pub pk: VideoId,
    /// File URL
    pub file: String,
    /// Owning experience
    pub experience: ExperienceId,
}

/// A guest review.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Review {
    /// Primary key
    pub pk: ReviewId,
    /// Author
    pub user: UserId,
    /// Text
    pub payload: String,
    /// 1 to 5
    pub rating: i32,
    /// Reviewed listing
    #[serde(skip)]
    pub listing: Listing,
}

/// Review fields supplied by clients.
#[derive(Clone, Debug, Deserialize)]
pub struct ReviewDraft {
    /// Text
    pub payload: String,
    /// 1 to 5
    pub rating: i32,
}

// ============================================================================
// Wishlists
// ============================================================================

/// A user's saved rooms and experiences.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Wishlist {
    /// Primary key
    pub pk: WishlistId,
    /// Name
    pub name: String,
    /// Owner
    pub user: UserId,
    /// Saved rooms
    pub rooms: Vec<RoomId>,
    /// Saved experiences
    pub experiences: Vec<ExperienceId>,
}

// ============================================================================
// Bookings
// ============================================================================

/// What a booking reserves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reservation {
    /// A room for the closed date range `check_in..=check_out`
    Room {
        /// Booked room
        room: RoomId,
        /// First day
        check_in: NaiveDate,
        /// Last day (inclusive for conflict checks)
        check_out: NaiveDate,
    },
    /// An experience at one exact instant
    Experience {
        /// Booked experience
        experience: ExperienceId,
        /// Slot start
        experience_time: DateTime<Utc>,
    },
}

impl Reservation {
    /// Listing this reservation is for.
    #[must_use]
    pub const fn listing(&self) -> Listing {
        match self {
            Self::Room { room, .. } => Listing::Room(*room),
            Self::Experience { experience, .. } => Listing::Experience(*experience),
        }
    }
}

/// A stored booking.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Booking {
    /// Primary key
    pub pk: BookingId,
    /// Booking owner
    pub user: UserId,
    /// Number of guests
    pub guests: i32,
    /// Room stay or experience slot
    pub reservation: Reservation,
}

/// A booking not yet stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewBooking {
    /// Booking owner
    pub user: UserId,
    /// Number of guests
    pub guests: i32,
    /// Room stay or experience slot
    pub reservation: Reservation,
}

/// Booking as returned over HTTP; the other kind's fields are `null`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicBooking {
    /// Primary key
    pub pk: BookingId,
    /// Room stay start
    pub check_in: Option<NaiveDate>,
    /// Room stay end
    pub check_out: Option<NaiveDate>,
    /// Experience slot
    pub experience_time: Option<DateTime<Utc>>,
    /// Number of guests
    pub guests: i32,
}

impl From<&Booking> for PublicBooking {
    fn from(booking: &Booking) -> Self {
        let (check_in, check_out, experience_time) = match booking.reservation {
            Reservation::Room {
                check_in,
                check_out,
                ..
            } => (Some(check_in), Some(check_out), None),
            Reservation::Experience {
                experience_time, ..
            } => (None, None, Some(experience_time)),
        };

        Self {
            pk: booking.pk,
            check_in,
            check_out,
            experience_time,
            guests: booking.guests,
        }
    }
}
