//! Booking rule violations.

use crate::persistence::StoreError;
use stayhub_web::NON_FIELD_ERRORS;

/// Why a booking was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BookingError {
    /// `check_in` or `check_out` is before today
    #[error("Can't book in the past!")]
    PastDate {
        /// `check_in` or `check_out`
        field: &'static str,
    },

    /// `check_out` is not after `check_in`
    #[error("Check in should be earlier than check out")]
    InvalidRange,

    /// The stay shares at least one day with another booking of the room
    #[error("Those (or some) of those dates are already taken")]
    DateOverlap,

    /// `experience_time` is before now
    #[error("Can't book in the past!")]
    PastTime,

    /// The experience slot already holds `max_team` bookings
    #[error("This time slot is fully booked ({max_team} teams)")]
    CapacityExceeded {
        /// Slot capacity
        max_team: i32,
    },

    /// Fewer than one guest
    #[error("A booking needs at least one guest")]
    InvalidGuests,

    /// Listing or booking does not exist (or belongs elsewhere)
    #[error("{resource} with id {id} not found")]
    NotFound {
        /// Record type
        resource: &'static str,
        /// Requested key
        id: String,
    },

    /// The caller may not change this booking
    #[error("You can't change this booking")]
    Permission,

    /// Storage failed while reading or writing
    #[error("Storage error: {0}")]
    Storage(String),
}

impl BookingError {
    /// `NotFound` for `resource` with key `id`.
    pub fn not_found(resource: &'static str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    /// Request field the error is reported under.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::PastDate { field } => *field,
            Self::PastTime | Self::CapacityExceeded { .. } => "experience_time",
            Self::InvalidGuests => "guests",
            Self::InvalidRange
            | Self::DateOverlap
            | Self::NotFound { .. }
            | Self::Permission
            | Self::Storage(_) => NON_FIELD_ERRORS,
        }
    }

    /// True for rule violations on the submitted values.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::PastDate { .. } | Self::InvalidRange | Self::PastTime | Self::InvalidGuests
        )
    }

    /// True when another booking holds the requested dates or slot.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::DateOverlap | Self::CapacityExceeded { .. })
    }
}

impl From<StoreError> for BookingError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound { resource, id } => Self::NotFound { resource, id },
            StoreError::InvalidReference { resource, id } => Self::not_found(resource, id),
            StoreError::DateOverlap => Self::DateOverlap,
            StoreError::CapacityExceeded { max_team } => Self::CapacityExceeded { max_team },
            StoreError::Duplicate { .. } | StoreError::Database(_) => {
                Self::Storage(error.to_string())
            },
        }
    }
}
