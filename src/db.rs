//! Storage layer: entity rows, pool setup and repository queries.
//!
//! Relationships are never traversed lazily. Every "posts of an author",
//! "comments of a post" or "edges of a follower" read is an explicit query
//! function in one of the submodules below.

pub mod comments;
pub mod follows;
pub mod groups;
pub mod posts;
pub mod users;

use std::{fmt, str::FromStr};

use sqlx::{
    FromRow, SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub idp_subject: Option<String>,
    pub created: OffsetDateTime,
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.username)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Group {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Group: {}", self.title)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Post {
    pub id: i64,
    pub text: String,
    pub created: OffsetDateTime,
    pub author_id: i64,
    pub group_id: Option<i64>,
    /// Path relative to the media root, e.g. `posts/<uuid>.png`.
    pub image: Option<String>,
}

impl Post {
    /// First 15 characters of the text.
    pub fn label(&self) -> String {
        self.text.chars().take(15).collect()
    }
}

/// A post joined with its author and group, as every feed returns it.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct PostView {
    #[sqlx(flatten)]
    pub post: Post,
    pub author_username: String,
    pub group_slug: Option<String>,
    pub group_title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Comment {
    pub id: i64,
    pub text: String,
    pub created: OffsetDateTime,
    pub post_id: i64,
    pub author_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct CommentView {
    #[sqlx(flatten)]
    pub comment: Comment,
    pub author_username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Follow {
    pub id: i64,
    /// The follower.
    pub user_id: i64,
    /// The followed author.
    pub author_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct FollowView {
    #[sqlx(flatten)]
    pub follow: Follow,
    pub user_username: String,
    pub author_username: String,
}

/// Opens the pool and brings the schema up to date.
pub async fn connect(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let db_pool = SqlitePoolOptions::new()
        .max_connections(16)
        .connect_with(options)
        .await?;
    migrate(&db_pool).await?;
    Ok(db_pool)
}

/// A private in-memory database. Pinned to a single connection that is never
/// recycled, since every sqlite connection to `:memory:` is its own database.
pub async fn connect_in_memory() -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let db_pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;
    migrate(&db_pool).await?;
    Ok(db_pool)
}

pub async fn migrate(db_pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::migrate!("./migrations").run(db_pool).await?;
    Ok(())
}
