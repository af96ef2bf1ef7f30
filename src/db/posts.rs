use sqlx::SqlitePool;
use time::OffsetDateTime;

use crate::error::Result;

use super::{Post, PostView};

const POST_COLUMNS: &str = "id, text, created, author_id, group_id, image";

/// Post columns joined with author and group. Callers append `WHERE` /
/// `ORDER BY` clauses against the `p`, `u` and `g` aliases.
pub(crate) const POST_VIEW_SELECT: &str = "SELECT p.id, p.text, p.created, p.author_id, p.group_id, p.image, \
     u.username AS author_username, g.slug AS group_slug, g.title AS group_title \
     FROM posts p \
     JOIN users u ON u.id = p.author_id \
     LEFT JOIN groups g ON g.id = p.group_id";

#[derive(Debug, Clone)]
pub struct NewPost {
    pub text: String,
    pub author_id: i64,
    pub group_id: Option<i64>,
    pub image: Option<String>,
}

/// The author-editable part of a post.
#[derive(Debug, Clone)]
pub struct PostChanges {
    pub text: String,
    pub group_id: Option<i64>,
    pub image: Option<String>,
}

pub async fn insert_post(db_pool: &SqlitePool, new_post: NewPost) -> Result<Post> {
    Ok(sqlx::query_as(&format!(
        "INSERT INTO posts (text, created, author_id, group_id, image) \
         VALUES (?, ?, ?, ?, ?) RETURNING {POST_COLUMNS}"
    ))
    .bind(&new_post.text)
    .bind(OffsetDateTime::now_utc())
    .bind(new_post.author_id)
    .bind(new_post.group_id)
    .bind(&new_post.image)
    .fetch_one(db_pool)
    .await?)
}

pub async fn update_post(db_pool: &SqlitePool, id: i64, changes: PostChanges) -> Result<Option<Post>> {
    Ok(sqlx::query_as(&format!(
        "UPDATE posts SET text = ?, group_id = ?, image = ? WHERE id = ? RETURNING {POST_COLUMNS}"
    ))
    .bind(&changes.text)
    .bind(changes.group_id)
    .bind(&changes.image)
    .bind(id)
    .fetch_optional(db_pool)
    .await?)
}

/// Comments on the post go with it.
pub async fn delete_post(db_pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM posts WHERE id = ?")
        .bind(id)
        .execute(db_pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn find_post_by_id(db_pool: &SqlitePool, id: i64) -> Result<Option<Post>> {
    Ok(
        sqlx::query_as(&format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?"))
            .bind(id)
            .fetch_optional(db_pool)
            .await?,
    )
}

pub async fn find_post_view_by_id(db_pool: &SqlitePool, id: i64) -> Result<Option<PostView>> {
    Ok(
        sqlx::query_as(&format!("{POST_VIEW_SELECT} WHERE p.id = ?"))
            .bind(id)
            .fetch_optional(db_pool)
            .await?,
    )
}

pub async fn count_posts_by_author(db_pool: &SqlitePool, author_id: i64) -> Result<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM posts WHERE author_id = ?")
        .bind(author_id)
        .fetch_one(db_pool)
        .await?;
    Ok(count)
}

pub async fn count_posts(db_pool: &SqlitePool) -> Result<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM posts")
        .fetch_one(db_pool)
        .await?;
    Ok(count)
}
