//! Booking reducer.
//!
//! Evaluates booking commands for one listing against a snapshot of that
//! listing's bookings. Commands that break a rule are rejected on the spot
//! with no effects; accepted commands return a single effect that writes
//! through the [`BookingRepository`] and feeds the result back as an event.
//!
//! ```text
//! BookRoom / BookExperience ─┐                    ┌─> BookingConfirmed
//! Revise*Booking ────────────┼─ checker ─ persist ┤
//! CancelBooking ─────────────┘      │             └─> BookingCancelled
//!                                   └──────────────> BookingRejected
//! ```

use super::checker;
use super::error::BookingError;
use crate::persistence::BookingRepository;
use crate::types::{
    Booking, BookingId, ExperienceId, Listing, NewBooking, Reservation, RoomId, UserId,
};
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use stayhub_core::{SmallVec, effect::Effect, environment::Clock, reducer::Reducer, smallvec};
use std::sync::Arc;

// ============================================================================
// Actions (Commands + Events)
// ============================================================================

/// Commands and events of the booking reducer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BookingAction {
    // Commands
    /// Book the room for `check_in..=check_out`
    BookRoom {
        /// Booking owner
        user: UserId,
        /// First day
        check_in: NaiveDate,
        /// Last day
        check_out: NaiveDate,
        /// Number of guests
        guests: i32,
    },

    /// Change dates or guests of a room booking; `None` keeps the stored value
    ReviseRoomBooking {
        /// Acting user (must own the booking)
        user: UserId,
        /// Booking to revise
        booking: BookingId,
        /// New first day
        check_in: Option<NaiveDate>,
        /// New last day
        check_out: Option<NaiveDate>,
        /// New number of guests
        guests: Option<i32>,
    },

    /// Book the experience slot starting at `experience_time`
    BookExperience {
        /// Booking owner
        user: UserId,
        /// Slot start
        experience_time: DateTime<Utc>,
        /// Number of guests
        guests: i32,
    },

    /// Change slot or guests of an experience booking; `None` keeps the stored value
    ReviseExperienceBooking {
        /// Acting user (must own the booking)
        user: UserId,
        /// Booking to revise
        booking: BookingId,
        /// New slot start
        experience_time: Option<DateTime<Utc>>,
        /// New number of guests
        guests: Option<i32>,
    },

    /// Delete a booking (owner or listing administrator)
    CancelBooking {
        /// Acting user
        user: UserId,
        /// Booking to delete
        booking: BookingId,
    },

    // Events
    /// A booking was stored
    BookingConfirmed {
        /// Stored booking
        booking: Booking,
    },

    /// A booking was deleted
    BookingCancelled {
        /// Deleted booking
        booking: BookingId,
    },

    /// A command was refused
    BookingRejected {
        /// Reason
        error: BookingError,
    },
}

// ============================================================================
// State
// ============================================================================

/// The listing a booking store works on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BookedListing {
    /// A room and its owner
    Room {
        /// Room
        pk: RoomId,
        /// Owner
        owner: UserId,
    },
    /// An experience, its host and slot capacity
    Experience {
        /// Experience
        pk: ExperienceId,
        /// Host
        host: UserId,
        /// Bookings allowed per exact slot
        max_team: i32,
    },
}

impl BookedListing {
    /// User allowed to cancel any booking of the listing.
    #[must_use]
    pub const fn administrator(&self) -> UserId {
        match self {
            Self::Room { owner, .. } => *owner,
            Self::Experience { host, .. } => *host,
        }
    }

    /// The listing key.
    #[must_use]
    pub const fn listing(&self) -> Listing {
        match self {
            Self::Room { pk, .. } => Listing::Room(*pk),
            Self::Experience { pk, .. } => Listing::Experience(*pk),
        }
    }

    fn not_found(&self, resource: &'static str) -> BookingError {
        match self {
            Self::Room { pk, .. } => BookingError::not_found(resource, pk),
            Self::Experience { pk, .. } => BookingError::not_found(resource, pk),
        }
    }
}

/// Result of the last command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BookingOutcome {
    /// Booking stored
    Confirmed(Booking),
    /// Booking deleted
    Cancelled(BookingId),
    /// Command refused
    Rejected(BookingError),
}

/// A listing and the read view of its bookings.
#[derive(Clone, Debug)]
pub struct BookingState {
    /// Listing being booked
    pub listing: BookedListing,
    /// Existing bookings of the listing
    pub bookings: Vec<Booking>,
    /// Outcome of the last command, `None` while in flight
    pub outcome: Option<BookingOutcome>,
}

impl BookingState {
    /// State for `listing` with its current bookings.
    #[must_use]
    pub const fn new(listing: BookedListing, bookings: Vec<Booking>) -> Self {
        Self {
            listing,
            bookings,
            outcome: None,
        }
    }

    /// The listing's booking `pk`, if it exists.
    #[must_use]
    pub fn booking(&self, pk: BookingId) -> Option<&Booking> {
        let listing = self.listing.listing();
        self.bookings
            .iter()
            .find(|booking| booking.pk == pk && booking.reservation.listing() == listing)
    }
}

// ============================================================================
// Environment
// ============================================================================

/// Dependencies of the booking reducer.
#[derive(Clone)]
pub struct BookingEnvironment {
    /// Source of `now` and the local `today`
    pub clock: Arc<dyn Clock>,
    /// Offset defining the local calendar day
    pub local_offset: FixedOffset,
    /// Where accepted commands are written
    pub bookings: Arc<dyn BookingRepository>,
}

impl BookingEnvironment {
    /// Creates a new `BookingEnvironment`
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        local_offset: FixedOffset,
        bookings: Arc<dyn BookingRepository>,
    ) -> Self {
        Self {
            clock,
            local_offset,
            bookings,
        }
    }

    fn today(&self) -> NaiveDate {
        self.clock.today(self.local_offset)
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer for bookings of one listing.
#[derive(Clone, Debug, Default)]
pub struct BookingReducer;

type Effects = SmallVec<[Effect<BookingAction>; 4]>;

impl BookingReducer {
    /// Creates a new `BookingReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn reject(state: &mut BookingState, error: BookingError) -> Effects {
        tracing::debug!(%error, "Booking rejected");
        Self::apply_event(state, &BookingAction::BookingRejected { error });
        SmallVec::new()
    }

    fn room_of(state: &BookingState) -> Result<RoomId, BookingError> {
        match state.listing {
            BookedListing::Room { pk, .. } => Ok(pk),
            BookedListing::Experience { .. } => Err(state.listing.not_found("Room")),
        }
    }

    fn experience_of(state: &BookingState) -> Result<(ExperienceId, i32), BookingError> {
        match state.listing {
            BookedListing::Experience { pk, max_team, .. } => Ok((pk, max_team)),
            BookedListing::Room { .. } => Err(state.listing.not_found("Experience")),
        }
    }

    /// The booking `pk`, owned by `user`.
    fn owned_booking(
        state: &BookingState,
        user: UserId,
        pk: BookingId,
    ) -> Result<Booking, BookingError> {
        let booking = state
            .booking(pk)
            .ok_or_else(|| BookingError::not_found("Booking", pk))?;
        if booking.user != user {
            return Err(BookingError::Permission);
        }
        Ok(booking.clone())
    }

    fn validate_room_command(
        state: &BookingState,
        action: &BookingAction,
        env: &BookingEnvironment,
    ) -> Result<Persist, BookingError> {
        let room = Self::room_of(state)?;
        let today = env.today();

        match *action {
            BookingAction::BookRoom {
                user,
                check_in,
                check_out,
                guests,
            } => {
                checker::check_room_stay(
                    &state.bookings,
                    room,
                    check_in,
                    check_out,
                    guests,
                    today,
                    None,
                )?;
                Ok(Persist::Create(NewBooking {
                    user,
                    guests,
                    reservation: Reservation::Room {
                        room,
                        check_in,
                        check_out,
                    },
                }))
            },
            BookingAction::ReviseRoomBooking {
                user,
                booking,
                check_in,
                check_out,
                guests,
            } => {
                let mut stored = Self::owned_booking(state, user, booking)?;
                let Reservation::Room {
                    check_in: stored_in,
                    check_out: stored_out,
                    ..
                } = stored.reservation
                else {
                    return Err(BookingError::not_found("Booking", booking));
                };

                let check_in = check_in.unwrap_or(stored_in);
                let check_out = check_out.unwrap_or(stored_out);
                let guests = guests.unwrap_or(stored.guests);
                checker::check_room_stay(
                    &state.bookings,
                    room,
                    check_in,
                    check_out,
                    guests,
                    today,
                    Some(booking),
                )?;

                stored.guests = guests;
                stored.reservation = Reservation::Room {
                    room,
                    check_in,
                    check_out,
                };
                Ok(Persist::Update(stored))
            },
            _ => Err(BookingError::Storage(format!(
                "not a room booking command: {action:?}"
            ))),
        }
    }

    fn validate_experience_command(
        state: &BookingState,
        action: &BookingAction,
        env: &BookingEnvironment,
    ) -> Result<Persist, BookingError> {
        let (experience, max_team) = Self::experience_of(state)?;
        let now = env.clock.now();

        match *action {
            BookingAction::BookExperience {
                user,
                experience_time,
                guests,
            } => {
                checker::check_experience_slot(
                    &state.bookings,
                    experience,
                    max_team,
                    experience_time,
                    guests,
                    now,
                    None,
                )?;
                Ok(Persist::Create(NewBooking {
                    user,
                    guests,
                    reservation: Reservation::Experience {
                        experience,
                        experience_time,
                    },
                }))
            },
            BookingAction::ReviseExperienceBooking {
                user,
                booking,
                experience_time,
                guests,
            } => {
                let mut stored = Self::owned_booking(state, user, booking)?;
                let Reservation::Experience {
                    experience_time: stored_time,
                    ..
                } = stored.reservation
                else {
                    return Err(BookingError::not_found("Booking", booking));
                };

                let experience_time = experience_time.unwrap_or(stored_time);
                let guests = guests.unwrap_or(stored.guests);
                checker::check_experience_slot(
                    &state.bookings,
                    experience,
                    max_team,
                    experience_time,
                    guests,
                    now,
                    Some(booking),
                )?;

                stored.guests = guests;
                stored.reservation = Reservation::Experience {
                    experience,
                    experience_time,
                };
                Ok(Persist::Update(stored))
            },
            _ => Err(BookingError::Storage(format!(
                "not an experience booking command: {action:?}"
            ))),
        }
    }

    fn validate_cancel(
        state: &BookingState,
        user: UserId,
        pk: BookingId,
    ) -> Result<Persist, BookingError> {
        let booking = state
            .booking(pk)
            .ok_or_else(|| BookingError::not_found("Booking", pk))?;
        if booking.user != user && state.listing.administrator() != user {
            return Err(BookingError::Permission);
        }
        Ok(Persist::Delete(pk))
    }

    /// Applies an event to state
    fn apply_event(state: &mut BookingState, action: &BookingAction) {
        match action {
            BookingAction::BookingConfirmed { booking } => {
                match state.bookings.iter_mut().find(|b| b.pk == booking.pk) {
                    Some(existing) => existing.clone_from(booking),
                    None => state.bookings.push(booking.clone()),
                }
                state.outcome = Some(BookingOutcome::Confirmed(booking.clone()));
            },
            BookingAction::BookingCancelled { booking } => {
                state.bookings.retain(|b| b.pk != *booking);
                state.outcome = Some(BookingOutcome::Cancelled(*booking));
            },
            BookingAction::BookingRejected { error } => {
                state.outcome = Some(BookingOutcome::Rejected(error.clone()));
            },

            // Commands don't modify state
            BookingAction::BookRoom { .. }
            | BookingAction::ReviseRoomBooking { .. }
            | BookingAction::BookExperience { .. }
            | BookingAction::ReviseExperienceBooking { .. }
            | BookingAction::CancelBooking { .. } => {},
        }
    }
}

/// The write an accepted command needs.
enum Persist {
    Create(NewBooking),
    Update(Booking),
    Delete(BookingId),
}

impl Persist {
    fn into_effect(self, repository: Arc<dyn BookingRepository>) -> Effect<BookingAction> {
        Effect::future(async move {
            let result = match self {
                Self::Create(booking) => repository
                    .create_booking(booking)
                    .await
                    .map(|booking| BookingAction::BookingConfirmed { booking }),
                Self::Update(booking) => repository
                    .update_booking(booking)
                    .await
                    .map(|booking| BookingAction::BookingConfirmed { booking }),
                Self::Delete(pk) => repository
                    .delete_booking(pk)
                    .await
                    .map(|()| BookingAction::BookingCancelled { booking: pk }),
            };

            Some(result.unwrap_or_else(|error| {
                tracing::warn!(%error, "Booking write refused by storage");
                BookingAction::BookingRejected {
                    error: error.into(),
                }
            }))
        })
    }
}

impl Reducer for BookingReducer {
    type State = BookingState;
    type Action = BookingAction;
    type Environment = BookingEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> Effects {
        let validated = match &action {
            BookingAction::BookRoom { .. } | BookingAction::ReviseRoomBooking { .. } => {
                state.outcome = None;
                Self::validate_room_command(state, &action, env)
            },
            BookingAction::BookExperience { .. }
            | BookingAction::ReviseExperienceBooking { .. } => {
                state.outcome = None;
                Self::validate_experience_command(state, &action, env)
            },
            BookingAction::CancelBooking { user, booking } => {
                state.outcome = None;
                Self::validate_cancel(state, *user, *booking)
            },
            BookingAction::BookingConfirmed { .. }
            | BookingAction::BookingCancelled { .. }
            | BookingAction::BookingRejected { .. } => {
                Self::apply_event(state, &action);
                return SmallVec::new();
            },
        };

        match validated {
            Ok(persist) => smallvec![persist.into_effect(Arc::clone(&env.bookings))],
            Err(error) => Self::reject(state, error),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::persistence::MemoryStore;
    use chrono::{Duration, Offset, TimeZone};
    use stayhub_testing::{FixedClock, ReducerTest, assertions, test_clock};

    const ROOM: RoomId = RoomId::new(1);
    const EXPERIENCE: ExperienceId = ExperienceId::new(2);
    const OWNER: UserId = UserId::new(10);
    const GUEST: UserId = UserId::new(20);
    const STRANGER: UserId = UserId::new(30);

    fn test_env() -> BookingEnvironment {
        BookingEnvironment::new(
            Arc::new(test_clock()),
            Utc.fix(),
            Arc::new(MemoryStore::new()),
        )
    }

    fn date(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, month, day).unwrap()
    }

    fn room_state(bookings: Vec<Booking>) -> BookingState {
        BookingState::new(BookedListing::Room { pk: ROOM, owner: OWNER }, bookings)
    }

    fn experience_state(bookings: Vec<Booking>) -> BookingState {
        BookingState::new(
            BookedListing::Experience {
                pk: EXPERIENCE,
                host: OWNER,
                max_team: 2,
            },
            bookings,
        )
    }

    fn stay(pk: i64, check_in: NaiveDate, check_out: NaiveDate) -> Booking {
        Booking {
            pk: BookingId::new(pk),
            user: GUEST,
            guests: 2,
            reservation: Reservation::Room {
                room: ROOM,
                check_in,
                check_out,
            },
        }
    }

    fn slot(pk: i64, experience_time: DateTime<Utc>) -> Booking {
        Booking {
            pk: BookingId::new(pk),
            user: GUEST,
            guests: 2,
            reservation: Reservation::Experience {
                experience: EXPERIENCE,
                experience_time,
            },
        }
    }

    fn rejected_with(expected: BookingError) -> impl FnOnce(&BookingState) {
        move |state| assert_eq!(state.outcome, Some(BookingOutcome::Rejected(expected)))
    }

    #[test]
    fn test_book_room_yields_one_persisting_effect() {
        ReducerTest::new(BookingReducer::new())
            .with_env(test_env())
            .given_state(room_state(vec![stay(1, date(6, 1), date(6, 5))]))
            .when_action(BookingAction::BookRoom {
                user: GUEST,
                check_in: date(6, 6),
                check_out: date(6, 8),
                guests: 2,
            })
            .then_state(|state| assert!(state.outcome.is_none()))
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_future_effect(effects);
            })
            .run();
    }

    #[test]
    fn test_overlapping_stay_is_rejected_without_effects() {
        ReducerTest::new(BookingReducer::new())
            .with_env(test_env())
            .given_state(room_state(vec![stay(1, date(6, 1), date(6, 5))]))
            .when_action(BookingAction::BookRoom {
                user: GUEST,
                check_in: date(6, 5),
                check_out: date(6, 8),
                guests: 2,
            })
            .then_state(rejected_with(BookingError::DateOverlap))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_past_check_in_is_rejected() {
        // test_clock() is 2024-05-20
        ReducerTest::new(BookingReducer::new())
            .with_env(test_env())
            .given_state(room_state(vec![]))
            .when_action(BookingAction::BookRoom {
                user: GUEST,
                check_in: date(5, 19),
                check_out: date(5, 22),
                guests: 1,
            })
            .then_state(rejected_with(BookingError::PastDate { field: "check_in" }))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_local_offset_moves_today() {
        // 2024-05-20T20:00Z is already the 21st at +09:00.
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 5, 20, 20, 0, 0).unwrap());
        let env = BookingEnvironment::new(
            Arc::new(clock),
            FixedOffset::east_opt(9 * 3600).unwrap(),
            Arc::new(MemoryStore::new()),
        );

        ReducerTest::new(BookingReducer::new())
            .with_env(env)
            .given_state(room_state(vec![]))
            .when_action(BookingAction::BookRoom {
                user: GUEST,
                check_in: date(5, 20),
                check_out: date(5, 23),
                guests: 1,
            })
            .then_state(rejected_with(BookingError::PastDate { field: "check_in" }))
            .run();
    }

    #[test]
    fn test_revision_excludes_itself() {
        ReducerTest::new(BookingReducer::new())
            .with_env(test_env())
            .given_state(room_state(vec![stay(1, date(6, 1), date(6, 5))]))
            .when_action(BookingAction::ReviseRoomBooking {
                user: GUEST,
                booking: BookingId::new(1),
                check_in: None,
                check_out: Some(date(6, 7)),
                guests: None,
            })
            .then_state(|state| assert!(state.outcome.is_none()))
            .then_effects(assertions::assert_has_future_effect)
            .run();
    }

    #[test]
    fn test_revision_by_non_owner_is_permission_error() {
        ReducerTest::new(BookingReducer::new())
            .with_env(test_env())
            .given_state(room_state(vec![stay(1, date(6, 1), date(6, 5))]))
            .when_action(BookingAction::ReviseRoomBooking {
                user: OWNER,
                booking: BookingId::new(1),
                check_in: None,
                check_out: None,
                guests: Some(4),
            })
            .then_state(rejected_with(BookingError::Permission))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_revising_unknown_booking_is_not_found() {
        ReducerTest::new(BookingReducer::new())
            .with_env(test_env())
            .given_state(room_state(vec![]))
            .when_action(BookingAction::ReviseRoomBooking {
                user: GUEST,
                booking: BookingId::new(99),
                check_in: None,
                check_out: None,
                guests: Some(3),
            })
            .then_state(rejected_with(BookingError::not_found("Booking", 99)))
            .run();
    }

    #[test]
    fn test_room_command_on_experience_is_not_found() {
        ReducerTest::new(BookingReducer::new())
            .with_env(test_env())
            .given_state(experience_state(vec![]))
            .when_action(BookingAction::BookRoom {
                user: GUEST,
                check_in: date(6, 1),
                check_out: date(6, 2),
                guests: 1,
            })
            .then_state(rejected_with(BookingError::not_found("Room", EXPERIENCE)))
            .run();
    }

    #[test]
    fn test_full_experience_slot_is_rejected() {
        let at = test_clock().now() + Duration::days(2);

        ReducerTest::new(BookingReducer::new())
            .with_env(test_env())
            .given_state(experience_state(vec![slot(1, at), slot(2, at)]))
            .when_action(BookingAction::BookExperience {
                user: STRANGER,
                experience_time: at,
                guests: 1,
            })
            .then_state(rejected_with(BookingError::CapacityExceeded { max_team: 2 }))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_experience_one_second_in_the_past_is_rejected() {
        let at = test_clock().now() - Duration::seconds(1);

        ReducerTest::new(BookingReducer::new())
            .with_env(test_env())
            .given_state(experience_state(vec![]))
            .when_action(BookingAction::BookExperience {
                user: GUEST,
                experience_time: at,
                guests: 1,
            })
            .then_state(rejected_with(BookingError::PastTime))
            .run();
    }

    #[test]
    fn test_experience_revision_within_full_slot_is_accepted() {
        let at = test_clock().now() + Duration::days(2);

        ReducerTest::new(BookingReducer::new())
            .with_env(test_env())
            .given_state(experience_state(vec![slot(1, at), slot(2, at)]))
            .when_action(BookingAction::ReviseExperienceBooking {
                user: GUEST,
                booking: BookingId::new(2),
                experience_time: None,
                guests: Some(5),
            })
            .then_effects(assertions::assert_has_future_effect)
            .run();
    }

    #[test]
    fn test_cancel_by_owner_admin_or_stranger() {
        ReducerTest::new(BookingReducer::new())
            .with_env(test_env())
            .given_state(room_state(vec![stay(1, date(6, 1), date(6, 5))]))
            .when_action(BookingAction::CancelBooking {
                user: OWNER,
                booking: BookingId::new(1),
            })
            .then_effects(assertions::assert_has_future_effect)
            .run();

        ReducerTest::new(BookingReducer::new())
            .with_env(test_env())
            .given_state(room_state(vec![stay(1, date(6, 1), date(6, 5))]))
            .when_action(BookingAction::CancelBooking {
                user: STRANGER,
                booking: BookingId::new(1),
            })
            .then_state(rejected_with(BookingError::Permission))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_events_update_the_read_view() {
        let confirmed = stay(7, date(6, 10), date(6, 12));

        ReducerTest::new(BookingReducer::new())
            .with_env(test_env())
            .given_state(room_state(vec![stay(1, date(6, 1), date(6, 5))]))
            .when_action(BookingAction::BookingConfirmed {
                booking: confirmed.clone(),
            })
            .when_action(BookingAction::BookingCancelled {
                booking: BookingId::new(1),
            })
            .then_state(move |state| {
                assert_eq!(state.bookings, vec![confirmed]);
                assert_eq!(
                    state.outcome,
                    Some(BookingOutcome::Cancelled(BookingId::new(1)))
                );
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }
}
