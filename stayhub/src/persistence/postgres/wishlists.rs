use super::{PostgresStore, failed, listing_column, touched};
use crate::persistence::{StoreError, StoreResult, WishlistRepository};
use crate::types::{ExperienceId, Listing, RoomId, UserId, Wishlist, WishlistId};
use async_trait::async_trait;

impl PostgresStore {
    /// Assemble a wishlist with its saved rooms and experiences.
    async fn load_wishlist(&self, (pk, name, user): (i64, String, i64)) -> StoreResult<Wishlist> {
        let rooms: Vec<(i64,)> =
            sqlx::query_as("SELECT room_id FROM wishlist_rooms WHERE wishlist_id = $1 ORDER BY room_id")
                .bind(pk)
                .fetch_all(&self.pool)
                .await
                .map_err(failed("Failed to load wishlist rooms"))?;
        let experiences: Vec<(i64,)> = sqlx::query_as(
            "SELECT experience_id FROM wishlist_experiences WHERE wishlist_id = $1
             ORDER BY experience_id",
        )
        .bind(pk)
        .fetch_all(&self.pool)
        .await
        .map_err(failed("Failed to load wishlist experiences"))?;

        Ok(Wishlist {
            pk: WishlistId::new(pk),
            name,
            user: UserId::new(user),
            rooms: rooms.into_iter().map(|(room,)| RoomId::new(room)).collect(),
            experiences: experiences
                .into_iter()
                .map(|(experience,)| ExperienceId::new(experience))
                .collect(),
        })
    }

    /// Remove `target` from the link table if present, insert it otherwise.
    async fn toggle_link(
        &self,
        pk: WishlistId,
        table: &'static str,
        column: &'static str,
        target: i64,
    ) -> StoreResult<Wishlist> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(failed("Failed to start transaction"))?;

        let removed = sqlx::query(&format!(
            "DELETE FROM {table} WHERE wishlist_id = $1 AND {column} = $2"
        ))
        .bind(pk.get())
        .bind(target)
        .execute(&mut *tx)
        .await
        .map_err(failed("Failed to update wishlist"))?
        .rows_affected();

        if removed == 0 {
            sqlx::query(&format!(
                "INSERT INTO {table} (wishlist_id, {column}) VALUES ($1, $2)"
            ))
            .bind(pk.get())
            .bind(target)
            .execute(&mut *tx)
            .await
            .map_err(failed("Failed to update wishlist"))?;
        }

        tx.commit()
            .await
            .map_err(failed("Failed to commit transaction"))?;
        self.wishlist(pk).await
    }
}

#[async_trait]
impl WishlistRepository for PostgresStore {
    async fn wishlists(&self, user: UserId) -> StoreResult<Vec<Wishlist>> {
        let rows: Vec<(i64, String, i64)> =
            sqlx::query_as("SELECT pk, name, user_id FROM wishlists WHERE user_id = $1 ORDER BY pk")
                .bind(user.get())
                .fetch_all(&self.pool)
                .await
                .map_err(failed("Failed to list wishlists"))?;

        let mut wishlists = Vec::with_capacity(rows.len());
        for row in rows {
            wishlists.push(self.load_wishlist(row).await?);
        }
        Ok(wishlists)
    }

    async fn wishlist(&self, pk: WishlistId) -> StoreResult<Wishlist> {
        let row: Option<(i64, String, i64)> =
            sqlx::query_as("SELECT pk, name, user_id FROM wishlists WHERE pk = $1")
                .bind(pk.get())
                .fetch_optional(&self.pool)
                .await
                .map_err(failed("Failed to get wishlist"))?;
        self.load_wishlist(row.ok_or_else(|| StoreError::not_found("Wishlist", pk))?)
            .await
    }

    async fn create_wishlist(&self, user: UserId, name: String) -> StoreResult<Wishlist> {
        let (pk, name, user): (i64, String, i64) = sqlx::query_as(
            "INSERT INTO wishlists (name, user_id) VALUES ($1, $2) RETURNING pk, name, user_id",
        )
        .bind(&name)
        .bind(user.get())
        .fetch_one(&self.pool)
        .await
        .map_err(failed("Failed to create wishlist"))?;

        Ok(Wishlist {
            pk: WishlistId::new(pk),
            name,
            user: UserId::new(user),
            rooms: Vec::new(),
            experiences: Vec::new(),
        })
    }

    async fn rename_wishlist(&self, pk: WishlistId, name: String) -> StoreResult<Wishlist> {
        let result = sqlx::query("UPDATE wishlists SET name = $2 WHERE pk = $1")
            .bind(pk.get())
            .bind(&name)
            .execute(&self.pool)
            .await
            .map_err(failed("Failed to rename wishlist"))?;
        touched(result.rows_affected(), "Wishlist", pk.get())?;
        self.wishlist(pk).await
    }

    async fn delete_wishlist(&self, pk: WishlistId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM wishlists WHERE pk = $1")
            .bind(pk.get())
            .execute(&self.pool)
            .await
            .map_err(failed("Failed to delete wishlist"))?;
        touched(result.rows_affected(), "Wishlist", pk.get())
    }

    async fn toggle_room(&self, pk: WishlistId, room: RoomId) -> StoreResult<Wishlist> {
        self.ensure_listing(Listing::Room(room)).await?;
        self.wishlist(pk).await?;
        self.toggle_link(pk, "wishlist_rooms", "room_id", room.get())
            .await
    }

    async fn toggle_experience(
        &self,
        pk: WishlistId,
        experience: ExperienceId,
    ) -> StoreResult<Wishlist> {
        self.ensure_listing(Listing::Experience(experience)).await?;
        self.wishlist(pk).await?;
        self.toggle_link(pk, "wishlist_experiences", "experience_id", experience.get())
            .await
    }

    async fn is_liked(&self, user: UserId, listing: Listing) -> StoreResult<bool> {
        let (column, pk) = listing_column(listing);
        let table = match listing {
            Listing::Room(_) => "wishlist_rooms",
            Listing::Experience(_) => "wishlist_experiences",
        };
        let (liked,): (bool,) = sqlx::query_as(&format!(
            "SELECT EXISTS (
                 SELECT 1 FROM {table} l JOIN wishlists w ON w.pk = l.wishlist_id
                 WHERE w.user_id = $1 AND l.{column} = $2
             )"
        ))
        .bind(user.get())
        .bind(pk)
        .fetch_one(&self.pool)
        .await
        .map_err(failed("Failed to check wishlists"))?;
        Ok(liked)
    }
}
