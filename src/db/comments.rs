use sqlx::SqlitePool;
use time::OffsetDateTime;

use crate::error::Result;

use super::{Comment, CommentView};

const COMMENT_COLUMNS: &str = "id, text, created, post_id, author_id";

pub async fn insert_comment(
    db_pool: &SqlitePool,
    post_id: i64,
    author_id: i64,
    text: &str,
) -> Result<Comment> {
    Ok(sqlx::query_as(&format!(
        "INSERT INTO comments (text, created, post_id, author_id) VALUES (?, ?, ?, ?) \
         RETURNING {COMMENT_COLUMNS}"
    ))
    .bind(text)
    .bind(OffsetDateTime::now_utc())
    .bind(post_id)
    .bind(author_id)
    .fetch_one(db_pool)
    .await?)
}

pub async fn update_comment(db_pool: &SqlitePool, id: i64, text: &str) -> Result<Option<Comment>> {
    Ok(sqlx::query_as(&format!(
        "UPDATE comments SET text = ? WHERE id = ? RETURNING {COMMENT_COLUMNS}"
    ))
    .bind(text)
    .bind(id)
    .fetch_optional(db_pool)
    .await?)
}

pub async fn delete_comment(db_pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM comments WHERE id = ?")
        .bind(id)
        .execute(db_pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// A comment, only if it belongs to `post_id`.
pub async fn find_comment(db_pool: &SqlitePool, post_id: i64, id: i64) -> Result<Option<CommentView>> {
    Ok(sqlx::query_as(
        "SELECT c.id, c.text, c.created, c.post_id, c.author_id, u.username AS author_username \
         FROM comments c JOIN users u ON u.id = c.author_id \
         WHERE c.post_id = ? AND c.id = ?",
    )
    .bind(post_id)
    .bind(id)
    .fetch_optional(db_pool)
    .await?)
}

/// All comments of a post, newest first.
pub async fn find_comments_by_post(db_pool: &SqlitePool, post_id: i64) -> Result<Vec<CommentView>> {
    Ok(sqlx::query_as(
        "SELECT c.id, c.text, c.created, c.post_id, c.author_id, u.username AS author_username \
         FROM comments c JOIN users u ON u.id = c.author_id \
         WHERE c.post_id = ? \
         ORDER BY c.id DESC",
    )
    .bind(post_id)
    .fetch_all(db_pool)
    .await?)
}

pub async fn count_comments(db_pool: &SqlitePool) -> Result<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM comments")
        .fetch_one(db_pool)
        .await?;
    Ok(count)
}
