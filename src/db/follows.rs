use sqlx::SqlitePool;

use crate::error::Result;

use super::{Follow, FollowView};

/// Inserts the edge unless it already exists. The boolean is `true` when this
/// call created it. Concurrent callers converge on the same row.
///
/// A self-follow still fails with a check-constraint violation.
pub async fn get_or_create_follow(
    db_pool: &SqlitePool,
    user_id: i64,
    author_id: i64,
) -> Result<(Follow, bool)> {
    let inserted = sqlx::query(
        "INSERT INTO follows (user_id, author_id) VALUES (?, ?) \
         ON CONFLICT (user_id, author_id) DO NOTHING",
    )
    .bind(user_id)
    .bind(author_id)
    .execute(db_pool)
    .await?
    .rows_affected()
        > 0;

    let follow = sqlx::query_as(
        "SELECT id, user_id, author_id FROM follows WHERE user_id = ? AND author_id = ?",
    )
    .bind(user_id)
    .bind(author_id)
    .fetch_one(db_pool)
    .await?;

    Ok((follow, inserted))
}

/// Plain insert: duplicates surface as a unique-constraint violation.
pub async fn insert_follow(db_pool: &SqlitePool, user_id: i64, author_id: i64) -> Result<Follow> {
    Ok(sqlx::query_as(
        "INSERT INTO follows (user_id, author_id) VALUES (?, ?) RETURNING id, user_id, author_id",
    )
    .bind(user_id)
    .bind(author_id)
    .fetch_one(db_pool)
    .await?)
}

pub async fn delete_follow(db_pool: &SqlitePool, user_id: i64, author_id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM follows WHERE user_id = ? AND author_id = ?")
        .bind(user_id)
        .bind(author_id)
        .execute(db_pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn is_following(db_pool: &SqlitePool, user_id: i64, author_id: i64) -> Result<bool> {
    let found: Option<(i64,)> =
        sqlx::query_as("SELECT 1 FROM follows WHERE user_id = ? AND author_id = ?")
            .bind(user_id)
            .bind(author_id)
            .fetch_optional(db_pool)
            .await?;
    Ok(found.is_some())
}

/// Edges held by `user_id`, optionally narrowed to followed usernames
/// containing `search` (case-insensitive).
pub async fn find_follow_edges_by_follower(
    db_pool: &SqlitePool,
    user_id: i64,
    search: Option<&str>,
) -> Result<Vec<FollowView>> {
    let search = search.map(str::trim).filter(|s| !s.is_empty());

    Ok(sqlx::query_as(
        "SELECT f.id, f.user_id, f.author_id, \
                u.username AS user_username, a.username AS author_username \
         FROM follows f \
         JOIN users u ON u.id = f.user_id \
         JOIN users a ON a.id = f.author_id \
         WHERE f.user_id = ? AND (? IS NULL OR instr(lower(a.username), lower(?)) > 0) \
         ORDER BY f.id",
    )
    .bind(user_id)
    .bind(search)
    .bind(search)
    .fetch_all(db_pool)
    .await?)
}

pub async fn count_follows(db_pool: &SqlitePool) -> Result<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM follows")
        .fetch_one(db_pool)
        .await?;
    Ok(count)
}
