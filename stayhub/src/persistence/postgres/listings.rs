use super::{PostgresStore, failed, parse_column, touched};
use crate::persistence::{ExperienceRepository, Page, RoomRepository, StoreError, StoreResult};
use crate::types::{
    Amenity, AmenityId, CategoryId, Experience, ExperienceId, NewExperience, NewRoom, Perk,
    PerkId, Room, RoomId, UserId,
};
use async_trait::async_trait;
use chrono::NaiveTime;
use sqlx::PgConnection;
use std::collections::HashMap;

const ROOM_COLUMNS: &str = "pk, name, country, city, price, rooms, toilets, description, \
                            address, pet_friendly, kind, owner_id, category_id";

const EXPERIENCE_COLUMNS: &str = "pk, name, country, city, host_id, price, address, start_time, \
                                  end_time, description, category_id, experience_max_team";

#[derive(sqlx::FromRow)]
struct RoomRow {
    pk: i64,
    name: String,
    country: String,
    city: String,
    price: i32,
    rooms: i32,
    toilets: i32,
    description: String,
    address: String,
    pet_friendly: bool,
    kind: String,
    owner_id: i64,
    category_id: Option<i64>,
}

impl RoomRow {
    fn into_room(self, amenities: Vec<AmenityId>) -> StoreResult<Room> {
        Ok(Room {
            pk: RoomId::new(self.pk),
            name: self.name,
            country: self.country,
            city: self.city,
            price: self.price,
            rooms: self.rooms,
            toilets: self.toilets,
            description: self.description,
            address: self.address,
            pet_friendly: self.pet_friendly,
            kind: parse_column(&self.kind)?,
            owner: UserId::new(self.owner_id),
            category: self.category_id.map(CategoryId::new),
            amenities,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ExperienceRow {
    pk: i64,
    name: String,
    country: String,
    city: String,
    host_id: i64,
    price: i32,
    address: String,
    start_time: NaiveTime,
    end_time: NaiveTime,
    description: String,
    category_id: Option<i64>,
    experience_max_team: i32,
}

impl ExperienceRow {
    fn into_experience(self, perks: Vec<PerkId>) -> Experience {
        Experience {
            pk: ExperienceId::new(self.pk),
            name: self.name,
            country: self.country,
            city: self.city,
            host: UserId::new(self.host_id),
            price: self.price,
            address: self.address,
            start: self.start_time,
            end: self.end_time,
            description: self.description,
            category: self.category_id.map(CategoryId::new),
            perks,
            experience_max_team: self.experience_max_team,
        }
    }
}

/// Fail with `InvalidReference` for the first key missing from `table`.
async fn ensure_exist(
    conn: &mut PgConnection,
    table: &'static str,
    resource: &'static str,
    keys: &[i64],
) -> StoreResult<()> {
    if keys.is_empty() {
        return Ok(());
    }
    let found: Vec<(i64,)> = sqlx::query_as(&format!("SELECT pk FROM {table} WHERE pk = ANY($1)"))
        .bind(keys)
        .fetch_all(&mut *conn)
        .await
        .map_err(failed("Failed to check references"))?;

    match keys.iter().find(|key| !found.iter().any(|(pk,)| pk == *key)) {
        Some(missing) => Err(StoreError::InvalidReference {
            resource,
            id: *missing,
        }),
        None => Ok(()),
    }
}

/// Replace the rows of a link table for `owner`.
async fn replace_links(
    conn: &mut PgConnection,
    table: &'static str,
    owner_column: &'static str,
    target_column: &'static str,
    owner: i64,
    targets: &[i64],
) -> StoreResult<()> {
    sqlx::query(&format!("DELETE FROM {table} WHERE {owner_column} = $1"))
        .bind(owner)
        .execute(&mut *conn)
        .await
        .map_err(failed("Failed to clear links"))?;
    sqlx::query(&format!(
        "INSERT INTO {table} ({owner_column}, {target_column})
         SELECT $1, target FROM UNNEST($2::BIGINT[]) AS target
         ON CONFLICT DO NOTHING"
    ))
    .bind(owner)
    .bind(targets)
    .execute(&mut *conn)
    .await
    .map_err(failed("Failed to store links"))?;
    Ok(())
}

impl PostgresStore {
    async fn room_amenity_ids(&self, room: Option<i64>) -> StoreResult<HashMap<i64, Vec<AmenityId>>> {
        let rows: Vec<(i64, i64)> = sqlx::query_as(
            "SELECT room_id, amenity_id FROM room_amenities
             WHERE $1::BIGINT IS NULL OR room_id = $1
             ORDER BY amenity_id",
        )
        .bind(room)
        .fetch_all(&self.pool)
        .await
        .map_err(failed("Failed to load room amenities"))?;

        let mut links: HashMap<i64, Vec<AmenityId>> = HashMap::new();
        for (room, amenity) in rows {
            links.entry(room).or_default().push(AmenityId::new(amenity));
        }
        Ok(links)
    }

    async fn experience_perk_ids(
        &self,
        experience: Option<i64>,
    ) -> StoreResult<HashMap<i64, Vec<PerkId>>> {
        let rows: Vec<(i64, i64)> = sqlx::query_as(
            "SELECT experience_id, perk_id FROM experience_perks
             WHERE $1::BIGINT IS NULL OR experience_id = $1
             ORDER BY perk_id",
        )
        .bind(experience)
        .fetch_all(&self.pool)
        .await
        .map_err(failed("Failed to load experience perks"))?;

        let mut links: HashMap<i64, Vec<PerkId>> = HashMap::new();
        for (experience, perk) in rows {
            links.entry(experience).or_default().push(PerkId::new(perk));
        }
        Ok(links)
    }
}

#[async_trait]
impl RoomRepository for PostgresStore {
    async fn rooms(&self) -> StoreResult<Vec<Room>> {
        let rows: Vec<RoomRow> =
            sqlx::query_as(&format!("SELECT {ROOM_COLUMNS} FROM rooms ORDER BY pk"))
                .fetch_all(&self.pool)
                .await
                .map_err(failed("Failed to list rooms"))?;
        let mut amenities = self.room_amenity_ids(None).await?;

        rows.into_iter()
            .map(|row| {
                let links = amenities.remove(&row.pk).unwrap_or_default();
                row.into_room(links)
            })
            .collect()
    }

    async fn room(&self, pk: RoomId) -> StoreResult<Room> {
        let row: Option<RoomRow> =
            sqlx::query_as(&format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE pk = $1"))
                .bind(pk.get())
                .fetch_optional(&self.pool)
                .await
                .map_err(failed("Failed to get room"))?;
        let row = row.ok_or_else(|| StoreError::not_found("Room", pk))?;
        let amenities = self
            .room_amenity_ids(Some(pk.get()))
            .await?
            .remove(&pk.get())
            .unwrap_or_default();
        row.into_room(amenities)
    }

    async fn create_room(&self, room: NewRoom) -> StoreResult<Room> {
        let amenities: Vec<i64> = room.amenities.iter().copied().map(AmenityId::get).collect();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(failed("Failed to start transaction"))?;

        ensure_exist(&mut tx, "categories", "Category", &[room.category.get()]).await?;
        ensure_exist(&mut tx, "amenities", "Amenity", &amenities).await?;

        let draft = &room.draft;
        let row: RoomRow = sqlx::query_as(&format!(
            "INSERT INTO rooms (name, country, city, price, rooms, toilets, description,
                                address, pet_friendly, kind, owner_id, category_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             RETURNING {ROOM_COLUMNS}"
        ))
        .bind(&draft.name)
        .bind(&draft.country)
        .bind(&draft.city)
        .bind(draft.price)
        .bind(draft.rooms)
        .bind(draft.toilets)
        .bind(&draft.description)
        .bind(&draft.address)
        .bind(draft.pet_friendly)
        .bind(draft.kind.as_str())
        .bind(room.owner.get())
        .bind(room.category.get())
        .fetch_one(&mut *tx)
        .await
        .map_err(failed("Failed to create room"))?;

        replace_links(&mut tx, "room_amenities", "room_id", "amenity_id", row.pk, &amenities)
            .await?;
        tx.commit()
            .await
            .map_err(failed("Failed to commit transaction"))?;

        tracing::debug!(room = row.pk, "Room created");
        row.into_room(room.amenities)
    }

    async fn update_room(&self, room: Room) -> StoreResult<Room> {
        let amenities: Vec<i64> = room.amenities.iter().copied().map(AmenityId::get).collect();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(failed("Failed to start transaction"))?;

        if let Some(category) = room.category {
            ensure_exist(&mut tx, "categories", "Category", &[category.get()]).await?;
        }
        ensure_exist(&mut tx, "amenities", "Amenity", &amenities).await?;

        let result = sqlx::query(
            "UPDATE rooms
             SET name = $2, country = $3, city = $4, price = $5, rooms = $6, toilets = $7,
                 description = $8, address = $9, pet_friendly = $10, kind = $11,
                 category_id = $12
             WHERE pk = $1",
        )
        .bind(room.pk.get())
        .bind(&room.name)
        .bind(&room.country)
        .bind(&room.city)
        .bind(room.price)
        .bind(room.rooms)
        .bind(room.toilets)
        .bind(&room.description)
        .bind(&room.address)
        .bind(room.pet_friendly)
        .bind(room.kind.as_str())
        .bind(room.category.map(CategoryId::get))
        .execute(&mut *tx)
        .await
        .map_err(failed("Failed to update room"))?;
        touched(result.rows_affected(), "Room", room.pk.get())?;

        replace_links(&mut tx, "room_amenities", "room_id", "amenity_id", room.pk.get(), &amenities)
            .await?;
        tx.commit()
            .await
            .map_err(failed("Failed to commit transaction"))?;
        Ok(room)
    }

    async fn delete_room(&self, pk: RoomId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM rooms WHERE pk = $1")
            .bind(pk.get())
            .execute(&self.pool)
            .await
            .map_err(failed("Failed to delete room"))?;
        touched(result.rows_affected(), "Room", pk.get())
    }

    async fn room_amenities(&self, pk: RoomId, page: Page) -> StoreResult<Vec<Amenity>> {
        self.room(pk).await?;
        let rows: Vec<(i64, String, Option<String>)> = sqlx::query_as(
            "SELECT a.pk, a.name, a.description
             FROM amenities a JOIN room_amenities ra ON ra.amenity_id = a.pk
             WHERE ra.room_id = $1
             ORDER BY a.pk
             OFFSET $2 LIMIT $3",
        )
        .bind(pk.get())
        .bind(page.offset)
        .bind(page.limit)
        .fetch_all(&self.pool)
        .await
        .map_err(failed("Failed to list room amenities"))?;

        Ok(rows
            .into_iter()
            .map(|(pk, name, description)| Amenity {
                pk: AmenityId::new(pk),
                name,
                description,
            })
            .collect())
    }
}

#[async_trait]
impl ExperienceRepository for PostgresStore {
    async fn experiences(&self) -> StoreResult<Vec<Experience>> {
        let rows: Vec<ExperienceRow> = sqlx::query_as(&format!(
            "SELECT {EXPERIENCE_COLUMNS} FROM experiences ORDER BY pk"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(failed("Failed to list experiences"))?;
        let mut perks = self.experience_perk_ids(None).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let links = perks.remove(&row.pk).unwrap_or_default();
                row.into_experience(links)
            })
            .collect())
    }

    async fn experience(&self, pk: ExperienceId) -> StoreResult<Experience> {
        let row: Option<ExperienceRow> = sqlx::query_as(&format!(
            "SELECT {EXPERIENCE_COLUMNS} FROM experiences WHERE pk = $1"
        ))
        .bind(pk.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(failed("Failed to get experience"))?;
        let row = row.ok_or_else(|| StoreError::not_found("Experience", pk))?;
        let perks = self
            .experience_perk_ids(Some(pk.get()))
            .await?
            .remove(&pk.get())
            .unwrap_or_default();
        Ok(row.into_experience(perks))
    }

    async fn create_experience(&self, experience: NewExperience) -> StoreResult<Experience> {
        let perks: Vec<i64> = experience.perks.iter().copied().map(PerkId::get).collect();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(failed("Failed to start transaction"))?;

        ensure_exist(&mut tx, "categories", "Category", &[experience.category.get()]).await?;
        ensure_exist(&mut tx, "perks", "Perk", &perks).await?;

        let draft = &experience.draft;
        let row: ExperienceRow = sqlx::query_as(&format!(
            "INSERT INTO experiences (name, country, city, host_id, price, address, start_time,
                                      end_time, description, category_id, experience_max_team)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING {EXPERIENCE_COLUMNS}"
        ))
        .bind(&draft.name)
        .bind(&draft.country)
        .bind(&draft.city)
        .bind(experience.host.get())
        .bind(draft.price)
        .bind(&draft.address)
        .bind(draft.start)
        .bind(draft.end)
        .bind(&draft.description)
        .bind(experience.category.get())
        .bind(draft.experience_max_team)
        .fetch_one(&mut *tx)
        .await
        .map_err(failed("Failed to create experience"))?;

        replace_links(&mut tx, "experience_perks", "experience_id", "perk_id", row.pk, &perks)
            .await?;
        tx.commit()
            .await
            .map_err(failed("Failed to commit transaction"))?;

        tracing::debug!(experience = row.pk, "Experience created");
        Ok(row.into_experience(experience.perks))
    }

    async fn update_experience(&self, experience: Experience) -> StoreResult<Experience> {
        let perks: Vec<i64> = experience.perks.iter().copied().map(PerkId::get).collect();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(failed("Failed to start transaction"))?;

        if let Some(category) = experience.category {
            ensure_exist(&mut tx, "categories", "Category", &[category.get()]).await?;
        }
        ensure_exist(&mut tx, "perks", "Perk", &perks).await?;

        let result = sqlx::query(
            "UPDATE experiences
             SET name = $2, country = $3, city = $4, price = $5, address = $6,
                 start_time = $7, end_time = $8, description = $9, category_id = $10,
                 experience_max_team = $11
             WHERE pk = $1",
        )
        .bind(experience.pk.get())
        .bind(&experience.name)
        .bind(&experience.country)
        .bind(&experience.city)
        .bind(experience.price)
        .bind(&experience.address)
        .bind(experience.start)
        .bind(experience.end)
        .bind(&experience.description)
        .bind(experience.category.map(CategoryId::get))
        .bind(experience.experience_max_team)
        .execute(&mut *tx)
        .await
        .map_err(failed("Failed to update experience"))?;
        touched(result.rows_affected(), "Experience", experience.pk.get())?;

        replace_links(
            &mut tx,
            "experience_perks",
            "experience_id",
            "perk_id",
            experience.pk.get(),
            &perks,
        )
        .await?;
        tx.commit()
            .await
            .map_err(failed("Failed to commit transaction"))?;
        Ok(experience)
    }

    async fn delete_experience(&self, pk: ExperienceId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM experiences WHERE pk = $1")
            .bind(pk.get())
            .execute(&self.pool)
            .await
            .map_err(failed("Failed to delete experience"))?;
        touched(result.rows_affected(), "Experience", pk.get())
    }

    async fn experience_perks(&self, pk: ExperienceId) -> StoreResult<Vec<Perk>> {
        self.experience(pk).await?;
        let rows: Vec<(i64, String, String, String)> = sqlx::query_as(
            "SELECT p.pk, p.name, p.details, p.explanation
             FROM perks p JOIN experience_perks ep ON ep.perk_id = p.pk
             WHERE ep.experience_id = $1
             ORDER BY p.pk",
        )
        .bind(pk.get())
        .fetch_all(&self.pool)
        .await
        .map_err(failed("Failed to list experience perks"))?;

        Ok(rows
            .into_iter()
            .map(|(pk, name, details, explanation)| Perk {
                pk: PerkId::new(pk),
                name,
                details,
                explanation,
            })
            .collect())
    }
}
