use super::{PostgresStore, failed};
use crate::persistence::{StoreError, StoreResult, UserRepository};
use crate::types::{NewUser, User, UserId};
use async_trait::async_trait;

type UserRow = (i64, String, String, String, bool, String);

const USER_COLUMNS: &str = "pk, username, name, email, is_host, password_hash";

fn into_user((pk, username, name, email, is_host, password_hash): UserRow) -> User {
    User {
        pk: UserId::new(pk),
        username,
        name,
        email,
        is_host,
        password_hash,
    }
}

#[async_trait]
impl UserRepository for PostgresStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let row: UserRow = sqlx::query_as(&format!(
            "INSERT INTO users (username, name, email, is_host, password_hash)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.username)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.is_host)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(failed("Failed to create user"))?;

        tracing::debug!(username = %user.username, "User created");
        Ok(into_user(row))
    }

    async fn user(&self, pk: UserId) -> StoreResult<User> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE pk = $1"))
                .bind(pk.get())
                .fetch_optional(&self.pool)
                .await
                .map_err(failed("Failed to get user"))?;

        row.map(into_user)
            .ok_or_else(|| StoreError::not_found("User", pk))
    }

    async fn user_by_username(&self, username: &str) -> StoreResult<User> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(failed("Failed to get user"))?;

        row.map(into_user)
            .ok_or_else(|| StoreError::not_found("User", username))
    }

    async fn update_user(&self, user: User) -> StoreResult<User> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "UPDATE users
             SET username = $2, name = $3, email = $4, is_host = $5, password_hash = $6
             WHERE pk = $1
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user.pk.get())
        .bind(&user.username)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.is_host)
        .bind(&user.password_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(failed("Failed to update user"))?;

        row.map(into_user)
            .ok_or_else(|| StoreError::not_found("User", user.pk))
    }
}
