use sqlx::SqlitePool;

use crate::error::Result;

use super::Group;

#[derive(Debug, Clone)]
pub struct NewGroup {
    pub title: String,
    pub slug: String,
    pub description: String,
}

pub async fn create_group(db_pool: &SqlitePool, new_group: NewGroup) -> Result<Group> {
    Ok(sqlx::query_as(
        "INSERT INTO groups (title, slug, description) VALUES (?, ?, ?) \
         RETURNING id, title, slug, description",
    )
    .bind(&new_group.title)
    .bind(&new_group.slug)
    .bind(&new_group.description)
    .fetch_one(db_pool)
    .await?)
}

/// Posts in the group survive with their group reference cleared.
pub async fn delete_group(db_pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM groups WHERE id = ?")
        .bind(id)
        .execute(db_pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn find_group_by_id(db_pool: &SqlitePool, id: i64) -> Result<Option<Group>> {
    Ok(
        sqlx::query_as("SELECT id, title, slug, description FROM groups WHERE id = ?")
            .bind(id)
            .fetch_optional(db_pool)
            .await?,
    )
}

pub async fn find_group_by_slug(db_pool: &SqlitePool, slug: &str) -> Result<Option<Group>> {
    Ok(
        sqlx::query_as("SELECT id, title, slug, description FROM groups WHERE slug = ?")
            .bind(slug)
            .fetch_optional(db_pool)
            .await?,
    )
}

pub async fn list_groups(db_pool: &SqlitePool) -> Result<Vec<Group>> {
    Ok(
        sqlx::query_as("SELECT id, title, slug, description FROM groups ORDER BY title, id")
            .fetch_all(db_pool)
            .await?,
    )
}
