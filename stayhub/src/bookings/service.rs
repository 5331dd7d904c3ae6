//! Booking service.
//!
//! Each call loads the listing and its bookings, builds a short-lived
//! [`Store`] around the [`BookingReducer`], sends one command and reads the
//! outcome back from state.

use super::error::BookingError;
use super::reducer::{
    BookedListing, BookingAction, BookingEnvironment, BookingOutcome, BookingReducer,
    BookingState,
};
use crate::persistence::{BookingRepository, ExperienceRepository, Repositories, RoomRepository};
use crate::types::{Booking, BookingId, ExperienceId, Listing, Reservation, RoomId, UserId};
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use stayhub_core::environment::Clock;
use stayhub_runtime::Store;
use std::sync::Arc;

/// Changes to a room booking; `None` keeps the stored value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RoomRevision {
    /// New first day
    pub check_in: Option<NaiveDate>,
    /// New last day
    pub check_out: Option<NaiveDate>,
    /// New number of guests
    pub guests: Option<i32>,
}

/// Changes to an experience booking; `None` keeps the stored value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExperienceRevision {
    /// New slot start
    pub experience_time: Option<DateTime<Utc>>,
    /// New number of guests
    pub guests: Option<i32>,
}

/// Entry point for booking commands and queries.
#[derive(Clone)]
pub struct BookingService {
    rooms: Arc<dyn RoomRepository>,
    experiences: Arc<dyn ExperienceRepository>,
    bookings: Arc<dyn BookingRepository>,
    clock: Arc<dyn Clock>,
    local_offset: FixedOffset,
}

impl BookingService {
    /// Service over `repositories`, reading time from `clock`.
    #[must_use]
    pub fn new(
        repositories: &Repositories,
        clock: Arc<dyn Clock>,
        local_offset: FixedOffset,
    ) -> Self {
        Self {
            rooms: Arc::clone(&repositories.rooms),
            experiences: Arc::clone(&repositories.experiences),
            bookings: Arc::clone(&repositories.bookings),
            clock,
            local_offset,
        }
    }

    fn environment(&self) -> BookingEnvironment {
        BookingEnvironment::new(
            Arc::clone(&self.clock),
            self.local_offset,
            Arc::clone(&self.bookings),
        )
    }

    async fn booked_listing(&self, listing: Listing) -> Result<BookedListing, BookingError> {
        Ok(match listing {
            Listing::Room(pk) => {
                let room = self.rooms.room(pk).await?;
                BookedListing::Room {
                    pk,
                    owner: room.owner,
                }
            },
            Listing::Experience(pk) => {
                let experience = self.experiences.experience(pk).await?;
                BookedListing::Experience {
                    pk,
                    host: experience.host,
                    max_team: experience.experience_max_team,
                }
            },
        })
    }

    /// Run one command against the listing and return its outcome.
    #[tracing::instrument(skip(self, action), fields(listing = ?listing))]
    async fn dispatch(
        &self,
        listing: Listing,
        action: BookingAction,
    ) -> Result<BookingOutcome, BookingError> {
        let booked = self.booked_listing(listing).await?;
        let existing = self.bookings.bookings_for(listing).await?;
        let store = Store::new(
            BookingState::new(booked, existing),
            BookingReducer::new(),
            self.environment(),
        );

        store
            .send(action)
            .await
            .map_err(|e| BookingError::Storage(e.to_string()))?;

        let outcome = store.state(|state| state.outcome.clone()).await;
        match &outcome {
            Some(BookingOutcome::Confirmed(booking)) => {
                metrics::counter!("stayhub.bookings.confirmed").increment(1);
                tracing::info!(booking = %booking.pk, "Booking confirmed");
            },
            Some(BookingOutcome::Cancelled(booking)) => {
                metrics::counter!("stayhub.bookings.cancelled").increment(1);
                tracing::info!(%booking, "Booking cancelled");
            },
            Some(BookingOutcome::Rejected(error)) => {
                metrics::counter!("stayhub.bookings.rejected").increment(1);
                tracing::info!(%error, "Booking rejected");
            },
            None => {},
        }

        outcome.ok_or_else(|| BookingError::Storage("booking command settled without outcome".into()))
    }

    fn confirmed(outcome: BookingOutcome) -> Result<Booking, BookingError> {
        match outcome {
            BookingOutcome::Confirmed(booking) => Ok(booking),
            BookingOutcome::Rejected(error) => Err(error),
            BookingOutcome::Cancelled(pk) => Err(BookingError::Storage(format!(
                "booking {pk} was cancelled instead of stored"
            ))),
        }
    }

    /// Book `room` for `check_in..=check_out`.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown room, or the first booking rule violated.
    pub async fn book_room(
        &self,
        room: RoomId,
        user: UserId,
        check_in: NaiveDate,
        check_out: NaiveDate,
        guests: i32,
    ) -> Result<Booking, BookingError> {
        let action = BookingAction::BookRoom {
            user,
            check_in,
            check_out,
            guests,
        };
        Self::confirmed(self.dispatch(Listing::Room(room), action).await?)
    }

    /// Revise a room booking owned by `user`.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Permission`, or the first booking rule violated.
    pub async fn revise_room_booking(
        &self,
        room: RoomId,
        user: UserId,
        booking: BookingId,
        revision: RoomRevision,
    ) -> Result<Booking, BookingError> {
        let action = BookingAction::ReviseRoomBooking {
            user,
            booking,
            check_in: revision.check_in,
            check_out: revision.check_out,
            guests: revision.guests,
        };
        Self::confirmed(self.dispatch(Listing::Room(room), action).await?)
    }

    /// Book the `experience` slot at `experience_time`.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown experience, or the first booking rule violated.
    pub async fn book_experience(
        &self,
        experience: ExperienceId,
        user: UserId,
        experience_time: DateTime<Utc>,
        guests: i32,
    ) -> Result<Booking, BookingError> {
        let action = BookingAction::BookExperience {
            user,
            experience_time,
            guests,
        };
        Self::confirmed(
            self.dispatch(Listing::Experience(experience), action)
                .await?,
        )
    }

    /// Revise an experience booking owned by `user`.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Permission`, or the first booking rule violated.
    pub async fn revise_experience_booking(
        &self,
        experience: ExperienceId,
        user: UserId,
        booking: BookingId,
        revision: ExperienceRevision,
    ) -> Result<Booking, BookingError> {
        let action = BookingAction::ReviseExperienceBooking {
            user,
            booking,
            experience_time: revision.experience_time,
            guests: revision.guests,
        };
        Self::confirmed(
            self.dispatch(Listing::Experience(experience), action)
                .await?,
        )
    }

    /// Cancel a booking of `listing`, as its owner or the listing's administrator.
    ///
    /// # Errors
    ///
    /// `NotFound` or `Permission`.
    pub async fn cancel(
        &self,
        listing: Listing,
        user: UserId,
        booking: BookingId,
    ) -> Result<(), BookingError> {
        match self
            .dispatch(listing, BookingAction::CancelBooking { user, booking })
            .await?
        {
            BookingOutcome::Cancelled(_) => Ok(()),
            BookingOutcome::Rejected(error) => Err(error),
            BookingOutcome::Confirmed(booking) => Err(BookingError::Storage(format!(
                "booking {} was stored instead of cancelled",
                booking.pk
            ))),
        }
    }

    /// Bookings of `listing` that are not over yet, earliest first.
    ///
    /// Room stays count until their `check_out` day (local calendar);
    /// experience slots until their start instant.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown listing, `Storage` on backend failure.
    pub async fn upcoming(&self, listing: Listing) -> Result<Vec<Booking>, BookingError> {
        self.booked_listing(listing).await?;
        let today = self.clock.today(self.local_offset);
        let now = self.clock.now();

        let mut upcoming: Vec<Booking> = self
            .bookings
            .bookings_for(listing)
            .await?
            .into_iter()
            .filter(|booking| match booking.reservation {
                Reservation::Room { check_out, .. } => check_out >= today,
                Reservation::Experience {
                    experience_time, ..
                } => experience_time >= now,
            })
            .collect();
        upcoming.sort_by_key(|booking| match booking.reservation {
            Reservation::Room { check_in, .. } => (Some(check_in), None),
            Reservation::Experience {
                experience_time, ..
            } => (None, Some(experience_time)),
        });
        Ok(upcoming)
    }

    /// Delete every upcoming booking of `room`; only its owner may.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown room, `Permission` for anyone but the owner.
    pub async fn clear_upcoming_room_bookings(
        &self,
        room: RoomId,
        user: UserId,
    ) -> Result<u64, BookingError> {
        let owner = self.rooms.room(room).await?.owner;
        if owner != user {
            return Err(BookingError::Permission);
        }

        let today = self.clock.today(self.local_offset);
        let deleted = self
            .bookings
            .delete_upcoming_room_bookings(room, today)
            .await?;
        tracing::info!(%room, deleted, "Cleared upcoming room bookings");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::persistence::{CatalogRepository, MemoryStore, UserRepository};
    use crate::types::{
        CategoryDraft, CategoryKind, ExperienceDraft, NewExperience, NewRoom, NewUser, RoomDraft,
        RoomKind,
    };
    use chrono::{Duration, NaiveTime, Offset};
    use stayhub_testing::test_clock;

    struct Fixture {
        service: BookingService,
        owner: UserId,
        guest: UserId,
        room: RoomId,
        experience: ExperienceId,
    }

    async fn user(store: &MemoryStore, username: &str) -> UserId {
        store
            .create_user(NewUser {
                username: username.into(),
                name: username.into(),
                email: format!("{username}@example.com"),
                is_host: true,
                password_hash: String::new(),
            })
            .await
            .unwrap()
            .pk
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let owner = user(&store, "host").await;
        let guest = user(&store, "guest").await;

        let rooms = store
            .create_category(CategoryDraft {
                name: "Cabins".into(),
                kind: CategoryKind::Rooms,
            })
            .await
            .unwrap();
        let tours = store
            .create_category(CategoryDraft {
                name: "Tours".into(),
                kind: CategoryKind::Experiences,
            })
            .await
            .unwrap();

        let room = store
            .create_room(NewRoom {
                draft: RoomDraft {
                    name: "Lake cabin".into(),
                    country: "Korea".into(),
                    city: "Seoul".into(),
                    price: 100,
                    rooms: 2,
                    toilets: 1,
                    description: String::new(),
                    address: "1 Lake road".into(),
                    pet_friendly: true,
                    kind: RoomKind::EntirePlace,
                },
                owner,
                category: rooms.pk,
                amenities: vec![],
            })
            .await
            .unwrap()
            .pk;

        let experience = store
            .create_experience(NewExperience {
                draft: ExperienceDraft {
                    name: "Night market".into(),
                    country: "Korea".into(),
                    city: "Seoul".into(),
                    price: 30,
                    address: "Market square".into(),
                    start: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
                    end: NaiveTime::from_hms_opt(21, 0, 0).unwrap(),
                    description: String::new(),
                    experience_max_team: 2,
                },
                host: owner,
                category: tours.pk,
                perks: vec![],
            })
            .await
            .unwrap()
            .pk;

        let service = BookingService::new(
            &Repositories::from_store(store),
            Arc::new(test_clock()),
            Utc.fix(),
        );

        Fixture {
            service,
            owner,
            guest,
            room,
            experience,
        }
    }

    fn date(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, month, day).unwrap()
    }

    #[tokio::test]
    async fn test_book_overlap_and_adjacent_stays() {
        let f = fixture().await;

        let first = f
            .service
            .book_room(f.room, f.guest, date(6, 1), date(6, 5), 2)
            .await
            .unwrap();
        assert_eq!(first.user, f.guest);

        assert_eq!(
            f.service
                .book_room(f.room, f.guest, date(6, 5), date(6, 8), 2)
                .await,
            Err(BookingError::DateOverlap)
        );
        assert!(
            f.service
                .book_room(f.room, f.guest, date(6, 6), date(6, 8), 2)
                .await
                .is_ok()
        );
        assert_eq!(f.service.upcoming(Listing::Room(f.room)).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_stays_cannot_both_commit() {
        let f = fixture().await;

        let (a, b) = tokio::join!(
            f.service.book_room(f.room, f.guest, date(6, 1), date(6, 5), 1),
            f.service.book_room(f.room, f.owner, date(6, 3), date(6, 7), 1),
        );

        assert_eq!(usize::from(a.is_ok()) + usize::from(b.is_ok()), 1);
        assert_eq!(f.service.upcoming(Listing::Room(f.room)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_experience_capacity_and_revision() {
        let f = fixture().await;
        let at = test_clock().now() + Duration::days(1);

        let first = f
            .service
            .book_experience(f.experience, f.guest, at, 2)
            .await
            .unwrap();
        f.service
            .book_experience(f.experience, f.owner, at, 2)
            .await
            .unwrap();
        assert_eq!(
            f.service.book_experience(f.experience, f.guest, at, 1).await,
            Err(BookingError::CapacityExceeded { max_team: 2 })
        );

        let revised = f
            .service
            .revise_experience_booking(
                f.experience,
                f.guest,
                first.pk,
                ExperienceRevision {
                    guests: Some(4),
                    ..ExperienceRevision::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(revised.guests, 4);
        assert_eq!(revised.reservation, first.reservation);
    }

    #[tokio::test]
    async fn test_booking_of_another_listing_is_not_found() {
        let f = fixture().await;
        let stay = f
            .service
            .book_room(f.room, f.guest, date(6, 1), date(6, 2), 1)
            .await
            .unwrap();

        let result = f
            .service
            .cancel(Listing::Experience(f.experience), f.guest, stay.pk)
            .await;
        assert!(matches!(result, Err(BookingError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_cancel_and_clear_permissions() {
        let f = fixture().await;
        let stay = f
            .service
            .book_room(f.room, f.guest, date(6, 1), date(6, 2), 1)
            .await
            .unwrap();
        f.service
            .book_room(f.room, f.guest, date(7, 1), date(7, 2), 1)
            .await
            .unwrap();

        assert_eq!(
            f.service.clear_upcoming_room_bookings(f.room, f.guest).await,
            Err(BookingError::Permission)
        );
        f.service
            .cancel(Listing::Room(f.room), f.owner, stay.pk)
            .await
            .unwrap();
        assert_eq!(
            f.service.clear_upcoming_room_bookings(f.room, f.owner).await,
            Ok(1)
        );
        assert!(f.service.upcoming(Listing::Room(f.room)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_room_is_not_found() {
        let f = fixture().await;
        assert_eq!(
            f.service
                .book_room(RoomId::new(999), f.guest, date(6, 1), date(6, 2), 1)
                .await,
            Err(BookingError::not_found("Room", 999))
        );
    }
}
