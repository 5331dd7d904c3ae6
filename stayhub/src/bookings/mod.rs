//! Bookings of rooms and experiences.
//!
//! - [`checker`]: pure conflict and validity rules
//! - [`reducer`]: booking commands evaluated against a listing's bookings
//! - [`service`]: loads a listing, runs one command on a fresh store, returns
//!   the outcome

pub mod checker;
pub mod error;
pub mod reducer;
pub mod service;

pub use error::BookingError;
pub use reducer::{
    BookedListing, BookingAction, BookingEnvironment, BookingOutcome, BookingReducer,
    BookingState,
};
pub use service::{BookingService, ExperienceRevision, RoomRevision};
