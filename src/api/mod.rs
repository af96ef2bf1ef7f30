//! The JSON surface under `/api/v1`, sharing the session login with the
//! pages. Reads are open to anyone; writes need a login and, for existing
//! objects, authorship.

mod comments;
mod error;
mod follow;
mod groups;
mod posts;

use axum::{
    Router,
    routing::get,
};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_sessions::Session;

use crate::{AppState, db::User, session};

pub use error::{ApiError, ApiResult};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts/", get(posts::list).post(posts::create))
        .route(
            "/posts/{post_id}/",
            get(posts::retrieve)
                .put(posts::update)
                .patch(posts::partial_update)
                .delete(posts::destroy),
        )
        .route("/groups/", get(groups::list))
        .route("/groups/{group_id}/", get(groups::retrieve))
        .route(
            "/posts/{post_id}/comments/",
            get(comments::list).post(comments::create),
        )
        .route(
            "/posts/{post_id}/comments/{comment_id}/",
            get(comments::retrieve)
                .put(comments::update)
                .patch(comments::partial_update)
                .delete(comments::destroy),
        )
        .route("/follow/", get(follow::list).post(follow::create))
        .layer(CorsLayer::permissive())
}

/// The logged-in caller, or 401.
async fn caller(session: &Session, db_pool: &SqlitePool) -> ApiResult<User> {
    session::viewer(session, db_pool)
        .await?
        .ok_or(ApiError::Unauthenticated)
}

/// Tells an absent field (`None`) from an explicit `null` (`Some(None)`).
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// `?limit=&offset=`. Malformed values are ignored, like missing ones.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct LimitOffset {
    limit: Option<String>,
    offset: Option<String>,
}

impl LimitOffset {
    pub(crate) fn limit(&self) -> Option<u32> {
        self.limit
            .as_deref()
            .and_then(|raw| raw.trim().parse().ok())
            .filter(|limit| *limit > 0)
    }

    pub(crate) fn offset(&self) -> u32 {
        self.offset
            .as_deref()
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(0)
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct Paginated<T> {
    count: i64,
    next: Option<String>,
    previous: Option<String>,
    results: Vec<T>,
}

impl<T> Paginated<T> {
    /// Envelope for `results` cut from `count` items at `offset`, with page
    /// links relative to `base_url`.
    pub(crate) fn new(results: Vec<T>, count: i64, limit: u32, offset: u32, base_url: &str) -> Self {
        let (limit_i, offset_i) = (i64::from(limit), i64::from(offset));

        let next = (offset_i + limit_i < count)
            .then(|| format!("{base_url}?limit={limit}&offset={}", offset + limit));
        let previous = (offset > 0).then(|| match offset.checked_sub(limit) {
            Some(previous) if previous > 0 => format!("{base_url}?limit={limit}&offset={previous}"),
            _ => format!("{base_url}?limit={limit}"),
        });

        Paginated {
            count,
            next,
            previous,
            results,
        }
    }
}
