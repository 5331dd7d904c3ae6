//! Booking conflict checker.
//!
//! Pure predicates over a proposed reservation and a read view of the
//! listing's existing bookings. Time is always passed in (`today` for room
//! stays, `now` for experience slots); nothing here reads a clock or storage.
//!
//! Room stays are closed intervals: a stay ending on the 5th conflicts with
//! one starting on the 5th.

use super::error::BookingError;
use crate::types::{Booking, BookingId, ExperienceId, Reservation, RoomId};
use chrono::{DateTime, NaiveDate, Utc};

/// Reject past dates and empty or inverted ranges.
///
/// # Errors
///
/// - [`BookingError::PastDate`] if `check_in` or `check_out` is before `today`
///   (`check_in` is reported first)
/// - [`BookingError::InvalidRange`] if `check_out <= check_in`
pub fn validate_room_dates(
    check_in: NaiveDate,
    check_out: NaiveDate,
    today: NaiveDate,
) -> Result<(), BookingError> {
    if check_in < today {
        return Err(BookingError::PastDate { field: "check_in" });
    }
    if check_out < today {
        return Err(BookingError::PastDate { field: "check_out" });
    }
    if check_out <= check_in {
        return Err(BookingError::InvalidRange);
    }
    Ok(())
}

/// Whether `check_in..=check_out` shares a day with another booking of `room`.
///
/// `excluding` skips the booking being revised.
#[must_use]
pub fn has_room_conflict(
    existing: &[Booking],
    room: RoomId,
    check_in: NaiveDate,
    check_out: NaiveDate,
    excluding: Option<BookingId>,
) -> bool {
    existing
        .iter()
        .filter(|booking| Some(booking.pk) != excluding)
        .any(|booking| match booking.reservation {
            Reservation::Room {
                room: booked,
                check_in: booked_in,
                check_out: booked_out,
            } => booked == room && booked_in <= check_out && booked_out >= check_in,
            Reservation::Experience { .. } => false,
        })
}

/// Reject experience slots before `now` (instant comparison).
///
/// # Errors
///
/// [`BookingError::PastTime`] if `time < now`.
pub fn validate_experience_time(
    time: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(), BookingError> {
    if time < now {
        return Err(BookingError::PastTime);
    }
    Ok(())
}

/// Whether the slot at exactly `time` already holds `max_team` bookings.
///
/// `excluding` skips the booking being revised.
#[must_use]
pub fn has_experience_capacity_conflict(
    existing: &[Booking],
    experience: ExperienceId,
    max_team: i32,
    time: DateTime<Utc>,
    excluding: Option<BookingId>,
) -> bool {
    let taken = existing
        .iter()
        .filter(|booking| Some(booking.pk) != excluding)
        .filter(|booking| {
            matches!(
                booking.reservation,
                Reservation::Experience { experience: booked, experience_time }
                    if booked == experience && experience_time == time
            )
        })
        .count();

    i64::try_from(taken).unwrap_or(i64::MAX) >= i64::from(max_team)
}

/// Reject bookings for fewer than one guest.
///
/// # Errors
///
/// [`BookingError::InvalidGuests`] if `guests < 1`.
pub fn validate_guests(guests: i32) -> Result<(), BookingError> {
    if guests < 1 {
        return Err(BookingError::InvalidGuests);
    }
    Ok(())
}

/// Full check of a room stay: guests, dates, then overlap.
///
/// # Errors
///
/// The first rule the stay violates.
pub fn check_room_stay(
    existing: &[Booking],
    room: RoomId,
    check_in: NaiveDate,
    check_out: NaiveDate,
    guests: i32,
    today: NaiveDate,
    excluding: Option<BookingId>,
) -> Result<(), BookingError> {
    validate_guests(guests)?;
    validate_room_dates(check_in, check_out, today)?;
    if has_room_conflict(existing, room, check_in, check_out, excluding) {
        return Err(BookingError::DateOverlap);
    }
    Ok(())
}

/// Full check of an experience slot: guests, time, then capacity.
///
/// # Errors
///
/// The first rule the slot violates.
pub fn check_experience_slot(
    existing: &[Booking],
    experience: ExperienceId,
    max_team: i32,
    time: DateTime<Utc>,
    guests: i32,
    now: DateTime<Utc>,
    excluding: Option<BookingId>,
) -> Result<(), BookingError> {
    validate_guests(guests)?;
    validate_experience_time(time, now)?;
    if has_experience_capacity_conflict(existing, experience, max_team, time, excluding) {
        return Err(BookingError::CapacityExceeded { max_team });
    }
    Ok(())
}
