use super::{PostgresStore, failed, listing_column, touched};
use crate::bookings::checker;
use crate::persistence::{BookingRepository, StoreError, StoreResult};
use crate::types::{
    Booking, BookingId, ExperienceId, Listing, NewBooking, Reservation, RoomId, UserId,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgConnection;

const BOOKING_COLUMNS: &str =
    "pk, kind, user_id, guests, room_id, check_in, check_out, experience_id, experience_time";

type BookingRow = (
    i64,
    String,
    i64,
    i32,
    Option<i64>,
    Option<NaiveDate>,
    Option<NaiveDate>,
    Option<i64>,
    Option<DateTime<Utc>>,
);

fn into_booking(row: BookingRow) -> StoreResult<Booking> {
    let (pk, kind, user, guests, room, check_in, check_out, experience, experience_time) = row;
    let reservation = match (kind.as_str(), room, check_in, check_out, experience, experience_time) {
        ("room", Some(room), Some(check_in), Some(check_out), None, None) => Reservation::Room {
            room: RoomId::new(room),
            check_in,
            check_out,
        },
        ("experience", None, None, None, Some(experience), Some(experience_time)) => {
            Reservation::Experience {
                experience: ExperienceId::new(experience),
                experience_time,
            }
        },
        _ => {
            return Err(StoreError::Database(format!(
                "booking {pk} has columns of the wrong kind"
            )));
        },
    };

    Ok(Booking {
        pk: BookingId::new(pk),
        user: UserId::new(user),
        guests,
        reservation,
    })
}

/// Flat column values of a reservation.
struct ReservationColumns {
    kind: &'static str,
    room: Option<i64>,
    check_in: Option<NaiveDate>,
    check_out: Option<NaiveDate>,
    experience: Option<i64>,
    experience_time: Option<DateTime<Utc>>,
}

impl From<&Reservation> for ReservationColumns {
    fn from(reservation: &Reservation) -> Self {
        match *reservation {
            Reservation::Room {
                room,
                check_in,
                check_out,
            } => Self {
                kind: "room",
                room: Some(room.get()),
                check_in: Some(check_in),
                check_out: Some(check_out),
                experience: None,
                experience_time: None,
            },
            Reservation::Experience {
                experience,
                experience_time,
            } => Self {
                kind: "experience",
                room: None,
                check_in: None,
                check_out: None,
                experience: Some(experience.get()),
                experience_time: Some(experience_time),
            },
        }
    }
}

async fn bookings_of(conn: &mut PgConnection, listing: Listing) -> StoreResult<Vec<Booking>> {
    let (column, pk) = listing_column(listing);
    let rows: Vec<BookingRow> = sqlx::query_as(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings WHERE {column} = $1 ORDER BY pk"
    ))
    .bind(pk)
    .fetch_all(&mut *conn)
    .await
    .map_err(failed("Failed to list bookings"))?;
    rows.into_iter().map(into_booking).collect()
}

/// Lock the listing row, then re-check overlap or capacity against the
/// committed bookings. Runs inside the write transaction.
async fn lock_and_check(
    conn: &mut PgConnection,
    reservation: &Reservation,
    excluding: Option<BookingId>,
) -> StoreResult<()> {
    match *reservation {
        Reservation::Room {
            room,
            check_in,
            check_out,
        } => {
            let locked: Option<(i64,)> =
                sqlx::query_as("SELECT pk FROM rooms WHERE pk = $1 FOR UPDATE")
                    .bind(room.get())
                    .fetch_optional(&mut *conn)
                    .await
                    .map_err(failed("Failed to lock room"))?;
            if locked.is_none() {
                return Err(StoreError::not_found("Room", room));
            }

            let existing = bookings_of(conn, Listing::Room(room)).await?;
            if checker::has_room_conflict(&existing, room, check_in, check_out, excluding) {
                return Err(StoreError::DateOverlap);
            }
        },
        Reservation::Experience {
            experience,
            experience_time,
        } => {
            let locked: Option<(i32,)> = sqlx::query_as(
                "SELECT experience_max_team FROM experiences WHERE pk = $1 FOR UPDATE",
            )
            .bind(experience.get())
            .fetch_optional(&mut *conn)
            .await
            .map_err(failed("Failed to lock experience"))?;
            let Some((max_team,)) = locked else {
                return Err(StoreError::not_found("Experience", experience));
            };

            let existing = bookings_of(conn, Listing::Experience(experience)).await?;
            if checker::has_experience_capacity_conflict(
                &existing,
                experience,
                max_team,
                experience_time,
                excluding,
            ) {
                return Err(StoreError::CapacityExceeded { max_team });
            }
        },
    }
    Ok(())
}

#[async_trait]
impl BookingRepository for PostgresStore {
    async fn bookings_for(&self, listing: Listing) -> StoreResult<Vec<Booking>> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(failed("Failed to acquire connection"))?;
        bookings_of(&mut conn, listing).await
    }

    async fn booking(&self, pk: BookingId) -> StoreResult<Booking> {
        let row: Option<BookingRow> =
            sqlx::query_as(&format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE pk = $1"))
                .bind(pk.get())
                .fetch_optional(&self.pool)
                .await
                .map_err(failed("Failed to get booking"))?;
        into_booking(row.ok_or_else(|| StoreError::not_found("Booking", pk))?)
    }

    async fn create_booking(&self, booking: NewBooking) -> StoreResult<Booking> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(failed("Failed to start transaction"))?;

        lock_and_check(&mut tx, &booking.reservation, None).await?;

        let columns = ReservationColumns::from(&booking.reservation);
        let row: BookingRow = sqlx::query_as(&format!(
            "INSERT INTO bookings (kind, user_id, guests, room_id, check_in, check_out,
                                   experience_id, experience_time)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {BOOKING_COLUMNS}"
        ))
        .bind(columns.kind)
        .bind(booking.user.get())
        .bind(booking.guests)
        .bind(columns.room)
        .bind(columns.check_in)
        .bind(columns.check_out)
        .bind(columns.experience)
        .bind(columns.experience_time)
        .fetch_one(&mut *tx)
        .await
        .map_err(failed("Failed to create booking"))?;

        tx.commit()
            .await
            .map_err(failed("Failed to commit transaction"))?;
        into_booking(row)
    }

    async fn update_booking(&self, booking: Booking) -> StoreResult<Booking> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(failed("Failed to start transaction"))?;

        lock_and_check(&mut tx, &booking.reservation, Some(booking.pk)).await?;

        let columns = ReservationColumns::from(&booking.reservation);
        let result = sqlx::query(
            "UPDATE bookings
             SET kind = $2, user_id = $3, guests = $4, room_id = $5, check_in = $6,
                 check_out = $7, experience_id = $8, experience_time = $9
             WHERE pk = $1",
        )
        .bind(booking.pk.get())
        .bind(columns.kind)
        .bind(booking.user.get())
        .bind(booking.guests)
        .bind(columns.room)
        .bind(columns.check_in)
        .bind(columns.check_out)
        .bind(columns.experience)
        .bind(columns.experience_time)
        .execute(&mut *tx)
        .await
        .map_err(failed("Failed to update booking"))?;
        touched(result.rows_affected(), "Booking", booking.pk.get())?;

        tx.commit()
            .await
            .map_err(failed("Failed to commit transaction"))?;
        Ok(booking)
    }

    async fn delete_booking(&self, pk: BookingId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM bookings WHERE pk = $1")
            .bind(pk.get())
            .execute(&self.pool)
            .await
            .map_err(failed("Failed to delete booking"))?;
        touched(result.rows_affected(), "Booking", pk.get())
    }

    async fn delete_upcoming_room_bookings(
        &self,
        room: RoomId,
        today: NaiveDate,
    ) -> StoreResult<u64> {
        let result =
            sqlx::query("DELETE FROM bookings WHERE kind = 'room' AND room_id = $1 AND check_out >= $2")
                .bind(room.get())
                .bind(today)
                .execute(&self.pool)
                .await
                .map_err(failed("Failed to delete upcoming bookings"))?;
        Ok(result.rows_affected())
    }
}
