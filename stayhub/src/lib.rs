//! # Stayhub
//!
//! Vacation-rental and experience booking backend: categories, rooms,
//! amenities, experiences, perks, photos and videos, reviews, wishlists,
//! users and bookings, served as JSON over HTTP.
//!
//! # Architecture
//!
//! ```text
//!   HTTP (axum)           api::*  ──►  persistence::Repositories (CRUD)
//!        │                   │
//!        │                   └──►  bookings::BookingService
//!        │                               │  fresh Store per request
//!        ▼                               ▼
//!   auth extractors             BookingReducer  ──  checker (pure rules)
//!                                        │
//!                                        ▼ Effect::Future
//!                               BookingRepository (re-checks under lock)
//! ```
//!
//! ## Booking rules
//!
//! - Room stays are closed date ranges: two stays of one room conflict when
//!   they share any day, boundaries included
//! - Dates before the local calendar day (configured UTC offset) are rejected
//! - An experience slot is an exact instant; it holds at most
//!   `experience_max_team` bookings
//!
//! Every rule is checked twice: by the reducer against a snapshot, and again
//! by the repository inside the write, so concurrent requests cannot both
//! commit a conflicting booking.

pub mod api;
pub mod auth;
pub mod bookings;
pub mod config;
pub mod error;
pub mod persistence;
pub mod server;
pub mod types;

pub use config::Config;
pub use server::{AppState, build_router};
