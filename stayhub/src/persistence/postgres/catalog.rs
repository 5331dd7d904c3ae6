use super::{PostgresStore, failed, parse_column, touched};
use crate::persistence::{CatalogRepository, StoreError, StoreResult};
use crate::types::{
    Amenity, AmenityDraft, AmenityId, Category, CategoryDraft, CategoryId, Perk, PerkDraft, PerkId,
};
use async_trait::async_trait;

type CategoryRow = (i64, String, String);
type AmenityRow = (i64, String, Option<String>);
type PerkRow = (i64, String, String, String);

fn into_category((pk, name, kind): CategoryRow) -> StoreResult<Category> {
    Ok(Category {
        pk: CategoryId::new(pk),
        name,
        kind: parse_column(&kind)?,
    })
}

fn into_amenity((pk, name, description): AmenityRow) -> Amenity {
    Amenity {
        pk: AmenityId::new(pk),
        name,
        description,
    }
}

fn into_perk((pk, name, details, explanation): PerkRow) -> Perk {
    Perk {
        pk: PerkId::new(pk),
        name,
        details,
        explanation,
    }
}

#[async_trait]
impl CatalogRepository for PostgresStore {
    async fn categories(&self) -> StoreResult<Vec<Category>> {
        let rows: Vec<CategoryRow> =
            sqlx::query_as("SELECT pk, name, kind FROM categories ORDER BY pk")
                .fetch_all(&self.pool)
                .await
                .map_err(failed("Failed to list categories"))?;
        rows.into_iter().map(into_category).collect()
    }

    async fn category(&self, pk: CategoryId) -> StoreResult<Category> {
        let row: Option<CategoryRow> =
            sqlx::query_as("SELECT pk, name, kind FROM categories WHERE pk = $1")
                .bind(pk.get())
                .fetch_optional(&self.pool)
                .await
                .map_err(failed("Failed to get category"))?;
        into_category(row.ok_or_else(|| StoreError::not_found("Category", pk))?)
    }

    async fn create_category(&self, draft: CategoryDraft) -> StoreResult<Category> {
        let row: CategoryRow = sqlx::query_as(
            "INSERT INTO categories (name, kind) VALUES ($1, $2) RETURNING pk, name, kind",
        )
        .bind(&draft.name)
        .bind(draft.kind.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(failed("Failed to create category"))?;
        into_category(row)
    }

    async fn update_category(&self, category: Category) -> StoreResult<Category> {
        let result = sqlx::query("UPDATE categories SET name = $2, kind = $3 WHERE pk = $1")
            .bind(category.pk.get())
            .bind(&category.name)
            .bind(category.kind.as_str())
            .execute(&self.pool)
            .await
            .map_err(failed("Failed to update category"))?;
        touched(result.rows_affected(), "Category", category.pk.get())?;
        Ok(category)
    }

    async fn delete_category(&self, pk: CategoryId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM categories WHERE pk = $1")
            .bind(pk.get())
            .execute(&self.pool)
            .await
            .map_err(failed("Failed to delete category"))?;
        touched(result.rows_affected(), "Category", pk.get())
    }

    async fn amenities(&self) -> StoreResult<Vec<Amenity>> {
        let rows: Vec<AmenityRow> =
            sqlx::query_as("SELECT pk, name, description FROM amenities ORDER BY pk")
                .fetch_all(&self.pool)
                .await
                .map_err(failed("Failed to list amenities"))?;
        Ok(rows.into_iter().map(into_amenity).collect())
    }

    async fn amenity(&self, pk: AmenityId) -> StoreResult<Amenity> {
        let row: Option<AmenityRow> =
            sqlx::query_as("SELECT pk, name, description FROM amenities WHERE pk = $1")
                .bind(pk.get())
                .fetch_optional(&self.pool)
                .await
                .map_err(failed("Failed to get amenity"))?;
        row.map(into_amenity)
            .ok_or_else(|| StoreError::not_found("Amenity", pk))
    }

    async fn create_amenity(&self, draft: AmenityDraft) -> StoreResult<Amenity> {
        let row: AmenityRow = sqlx::query_as(
            "INSERT INTO amenities (name, description) VALUES ($1, $2)
             RETURNING pk, name, description",
        )
        .bind(&draft.name)
        .bind(&draft.description)
        .fetch_one(&self.pool)
        .await
        .map_err(failed("Failed to create amenity"))?;
        Ok(into_amenity(row))
    }

    async fn update_amenity(&self, amenity: Amenity) -> StoreResult<Amenity> {
        let result = sqlx::query("UPDATE amenities SET name = $2, description = $3 WHERE pk = $1")
            .bind(amenity.pk.get())
            .bind(&amenity.name)
            .bind(&amenity.description)
            .execute(&self.pool)
            .await
            .map_err(failed("Failed to update amenity"))?;
        touched(result.rows_affected(), "Amenity", amenity.pk.get())?;
        Ok(amenity)
    }

    async fn delete_amenity(&self, pk: AmenityId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM amenities WHERE pk = $1")
            .bind(pk.get())
            .execute(&self.pool)
            .await
            .map_err(failed("Failed to delete amenity"))?;
        touched(result.rows_affected(), "Amenity", pk.get())
    }

    async fn perks(&self) -> StoreResult<Vec<Perk>> {
        let rows: Vec<PerkRow> =
            sqlx::query_as("SELECT pk, name, details, explanation FROM perks ORDER BY pk")
                .fetch_all(&self.pool)
                .await
                .map_err(failed("Failed to list perks"))?;
        Ok(rows.into_iter().map(into_perk).collect())
    }

    async fn perk(&self, pk: PerkId) -> StoreResult<Perk> {
        let row: Option<PerkRow> =
            sqlx::query_as("SELECT pk, name, details, explanation FROM perks WHERE pk = $1")
                .bind(pk.get())
                .fetch_optional(&self.pool)
                .await
                .map_err(failed("Failed to get perk"))?;
        row.map(into_perk)
            .ok_or_else(|| StoreError::not_found("Perk", pk))
    }

    async fn create_perk(&self, draft: PerkDraft) -> StoreResult<Perk> {
        let row: PerkRow = sqlx::query_as(
            "INSERT INTO perks (name, details, explanation) VALUES ($1, $2, $3)
             RETURNING pk, name, details, explanation",
        )
        .bind(&draft.name)
        .bind(&draft.details)
        .bind(&draft.explanation)
        .fetch_one(&self.pool)
        .await
        .map_err(failed("Failed to create perk"))?;
        Ok(into_perk(row))
    }

    async fn update_perk(&self, perk: Perk) -> StoreResult<Perk> {
        let result =
            sqlx::query("UPDATE perks SET name = $2, details = $3, explanation = $4 WHERE pk = $1")
                .bind(perk.pk.get())
                .bind(&perk.name)
                .bind(&perk.details)
                .bind(&perk.explanation)
                .execute(&self.pool)
                .await
                .map_err(failed("Failed to update perk"))?;
        touched(result.rows_affected(), "Perk", perk.pk.get())?;
        Ok(perk)
    }

    async fn delete_perk(&self, pk: PerkId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM perks WHERE pk = $1")
            .bind(pk.get())
            .execute(&self.pool)
            .await
            .map_err(failed("Failed to delete perk"))?;
        touched(result.rows_affected(), "Perk", pk.get())
    }
}
