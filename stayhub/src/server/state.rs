//! Application state for the Stayhub HTTP server.
//!
//! Contains all shared resources needed by HTTP handlers:
//! - Repositories (one storage backend behind trait objects)
//! - Booking service (runs booking commands through the reducer)
//! - Configuration

use crate::bookings::BookingService;
use crate::config::Config;
use crate::persistence::Repositories;
use axum::extract::FromRef;
use stayhub_core::environment::Clock;
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
///
/// Cloned (cheaply via `Arc`) for each request.
#[derive(Clone)]
pub struct AppState {
    /// Storage
    pub repositories: Repositories,
    /// Booking commands and queries
    pub bookings: BookingService,
    /// Loaded configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Wire the booking service over `repositories`, reading booking time
    /// from `clock`.
    #[must_use]
    pub fn new(repositories: Repositories, config: Config, clock: Arc<dyn Clock>) -> Self {
        let bookings =
            BookingService::new(&repositories, clock, config.bookings.local_offset);

        Self {
            repositories,
            bookings,
            config: Arc::new(config),
        }
    }

    /// Configured page size for paginated lists.
    #[must_use]
    pub fn page_size(&self) -> u32 {
        self.config.bookings.page_size
    }
}

impl FromRef<AppState> for Repositories {
    fn from_ref(state: &AppState) -> Self {
        state.repositories.clone()
    }
}

impl FromRef<AppState> for BookingService {
    fn from_ref(state: &AppState) -> Self {
        state.bookings.clone()
    }
}
