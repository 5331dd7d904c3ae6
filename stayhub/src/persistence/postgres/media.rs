use super::{PostgresStore, failed, listing_column, touched};
use crate::persistence::{MediaRepository, Page, ReviewRepository, StoreError, StoreResult};
use crate::types::{
    ExperienceId, Listing, Photo, PhotoDraft, PhotoId, Review, ReviewDraft, ReviewId, RoomId,
    UserId, Video, VideoId,
};
use async_trait::async_trait;

type PhotoRow = (i64, String, String, Option<i64>, Option<i64>);
type VideoRow = (i64, String, i64);
type ReviewRow = (i64, i64, String, i32, Option<i64>, Option<i64>);

/// The listing of a row with nullable `room_id` / `experience_id` columns.
fn row_listing(room: Option<i64>, experience: Option<i64>) -> StoreResult<Listing> {
    match (room, experience) {
        (Some(room), None) => Ok(Listing::Room(RoomId::new(room))),
        (None, Some(experience)) => Ok(Listing::Experience(ExperienceId::new(experience))),
        _ => Err(StoreError::Database(
            "row is attached to no listing or to both".into(),
        )),
    }
}

fn into_photo((pk, file, description, room, experience): PhotoRow) -> StoreResult<Photo> {
    Ok(Photo {
        pk: PhotoId::new(pk),
        file,
        description,
        listing: row_listing(room, experience)?,
    })
}

fn into_video((pk, file, experience): VideoRow) -> Video {
    Video {
        pk: VideoId::new(pk),
        file,
        experience: ExperienceId::new(experience),
    }
}

fn into_review((pk, user, payload, rating, room, experience): ReviewRow) -> StoreResult<Review> {
    Ok(Review {
        pk: ReviewId::new(pk),
        user: UserId::new(user),
        payload,
        rating,
        listing: row_listing(room, experience)?,
    })
}

impl PostgresStore {
    /// `NotFound` unless the listing exists.
    pub(super) async fn ensure_listing(&self, listing: Listing) -> StoreResult<()> {
        let (table, resource, pk) = match listing {
            Listing::Room(pk) => ("rooms", "Room", pk.get()),
            Listing::Experience(pk) => ("experiences", "Experience", pk.get()),
        };
        let found: Option<(i64,)> = sqlx::query_as(&format!("SELECT pk FROM {table} WHERE pk = $1"))
            .bind(pk)
            .fetch_optional(&self.pool)
            .await
            .map_err(failed("Failed to check listing"))?;
        found
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found(resource, pk))
    }
}

#[async_trait]
impl MediaRepository for PostgresStore {
    async fn add_photo(&self, listing: Listing, draft: PhotoDraft) -> StoreResult<Photo> {
        self.ensure_listing(listing).await?;
        let (column, pk) = listing_column(listing);
        let row: PhotoRow = sqlx::query_as(&format!(
            "INSERT INTO photos (file, description, {column}) VALUES ($1, $2, $3)
             RETURNING pk, file, description, room_id, experience_id"
        ))
        .bind(&draft.file)
        .bind(&draft.description)
        .bind(pk)
        .fetch_one(&self.pool)
        .await
        .map_err(failed("Failed to add photo"))?;
        into_photo(row)
    }

    async fn photos(&self, listing: Listing) -> StoreResult<Vec<Photo>> {
        let (column, pk) = listing_column(listing);
        let rows: Vec<PhotoRow> = sqlx::query_as(&format!(
            "SELECT pk, file, description, room_id, experience_id
             FROM photos WHERE {column} = $1 ORDER BY pk"
        ))
        .bind(pk)
        .fetch_all(&self.pool)
        .await
        .map_err(failed("Failed to list photos"))?;
        rows.into_iter().map(into_photo).collect()
    }

    async fn photo(&self, pk: PhotoId) -> StoreResult<Photo> {
        let row: Option<PhotoRow> = sqlx::query_as(
            "SELECT pk, file, description, room_id, experience_id FROM photos WHERE pk = $1",
        )
        .bind(pk.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(failed("Failed to get photo"))?;
        into_photo(row.ok_or_else(|| StoreError::not_found("Photo", pk))?)
    }

    async fn delete_photo(&self, pk: PhotoId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM photos WHERE pk = $1")
            .bind(pk.get())
            .execute(&self.pool)
            .await
            .map_err(failed("Failed to delete photo"))?;
        touched(result.rows_affected(), "Photo", pk.get())
    }

    async fn put_video(&self, experience: ExperienceId, file: String) -> StoreResult<Video> {
        self.ensure_listing(Listing::Experience(experience)).await?;
        let row: VideoRow = sqlx::query_as(
            "INSERT INTO videos (file, experience_id) VALUES ($1, $2)
             ON CONFLICT (experience_id) DO UPDATE SET file = EXCLUDED.file
             RETURNING pk, file, experience_id",
        )
        .bind(&file)
        .bind(experience.get())
        .fetch_one(&self.pool)
        .await
        .map_err(failed("Failed to store video"))?;
        Ok(into_video(row))
    }

    async fn video(&self, pk: VideoId) -> StoreResult<Video> {
        let row: Option<VideoRow> =
            sqlx::query_as("SELECT pk, file, experience_id FROM videos WHERE pk = $1")
                .bind(pk.get())
                .fetch_optional(&self.pool)
                .await
                .map_err(failed("Failed to get video"))?;
        row.map(into_video)
            .ok_or_else(|| StoreError::not_found("Video", pk))
    }

    async fn experience_video(&self, experience: ExperienceId) -> StoreResult<Option<Video>> {
        let row: Option<VideoRow> =
            sqlx::query_as("SELECT pk, file, experience_id FROM videos WHERE experience_id = $1")
                .bind(experience.get())
                .fetch_optional(&self.pool)
                .await
                .map_err(failed("Failed to get video"))?;
        Ok(row.map(into_video))
    }

    async fn delete_video(&self, pk: VideoId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM videos WHERE pk = $1")
            .bind(pk.get())
            .execute(&self.pool)
            .await
            .map_err(failed("Failed to delete video"))?;
        touched(result.rows_affected(), "Video", pk.get())
    }
}

#[async_trait]
impl ReviewRepository for PostgresStore {
    async fn add_review(
        &self,
        listing: Listing,
        user: UserId,
        draft: ReviewDraft,
    ) -> StoreResult<Review> {
        self.ensure_listing(listing).await?;
        let (column, pk) = listing_column(listing);
        let row: ReviewRow = sqlx::query_as(&format!(
            "INSERT INTO reviews (user_id, payload, rating, {column}) VALUES ($1, $2, $3, $4)
             RETURNING pk, user_id, payload, rating, room_id, experience_id"
        ))
        .bind(user.get())
        .bind(&draft.payload)
        .bind(draft.rating)
        .bind(pk)
        .fetch_one(&self.pool)
        .await
        .map_err(failed("Failed to add review"))?;
        into_review(row)
    }

    async fn reviews(&self, listing: Listing, page: Page) -> StoreResult<Vec<Review>> {
        let (column, pk) = listing_column(listing);
        let rows: Vec<ReviewRow> = sqlx::query_as(&format!(
            "SELECT pk, user_id, payload, rating, room_id, experience_id
             FROM reviews WHERE {column} = $1
             ORDER BY pk DESC
             OFFSET $2 LIMIT $3"
        ))
        .bind(pk)
        .bind(page.offset)
        .bind(page.limit)
        .fetch_all(&self.pool)
        .await
        .map_err(failed("Failed to list reviews"))?;
        rows.into_iter().map(into_review).collect()
    }

    async fn average_rating(&self, listing: Listing) -> StoreResult<Option<f64>> {
        let (column, pk) = listing_column(listing);
        let (average,): (Option<f64>,) = sqlx::query_as(&format!(
            "SELECT AVG(rating)::FLOAT8 FROM reviews WHERE {column} = $1"
        ))
        .bind(pk)
        .fetch_one(&self.pool)
        .await
        .map_err(failed("Failed to average ratings"))?;
        Ok(average)
    }
}
