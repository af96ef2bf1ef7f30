use sqlx::SqlitePool;
use time::OffsetDateTime;

use crate::error::Result;

use super::User;

const USER_COLUMNS: &str = "id, username, email, password_hash, idp_subject, created";

#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub idp_subject: Option<String>,
}

impl NewUser {
    pub fn named(username: impl Into<String>) -> Self {
        NewUser {
            username: username.into(),
            ..Default::default()
        }
    }
}

/// Fails with a unique-constraint violation when the username (or provider
/// subject) is already taken.
pub async fn create_user(db_pool: &SqlitePool, new_user: NewUser) -> Result<User> {
    let user = sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (username, email, password_hash, idp_subject, created) \
         VALUES (?, ?, ?, ?, ?) RETURNING {USER_COLUMNS}"
    ))
    .bind(&new_user.username)
    .bind(&new_user.email)
    .bind(&new_user.password_hash)
    .bind(&new_user.idp_subject)
    .bind(OffsetDateTime::now_utc())
    .fetch_one(db_pool)
    .await?;

    tracing::info!(user_id = user.id, username = %user.username, "user registered");
    Ok(user)
}

pub async fn find_user_by_id(db_pool: &SqlitePool, id: i64) -> Result<Option<User>> {
    Ok(
        sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id)
            .fetch_optional(db_pool)
            .await?,
    )
}

pub async fn find_user_by_username(db_pool: &SqlitePool, username: &str) -> Result<Option<User>> {
    Ok(
        sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?"))
            .bind(username)
            .fetch_optional(db_pool)
            .await?,
    )
}

pub async fn find_user_by_idp_subject(db_pool: &SqlitePool, subject: &str) -> Result<Option<User>> {
    Ok(
        sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE idp_subject = ?"))
            .bind(subject)
            .fetch_optional(db_pool)
            .await?,
    )
}
