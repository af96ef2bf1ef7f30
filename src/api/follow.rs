use axum::{
    Json, debug_handler,
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{
    AppState,
    db::{FollowView, follows},
    mutations,
};

use super::{ApiResult, caller};

#[derive(Debug, Serialize)]
pub(crate) struct FollowJson {
    id: i64,
    user: String,
    following: String,
}

impl From<FollowView> for FollowJson {
    fn from(view: FollowView) -> Self {
        FollowJson {
            id: view.follow.id,
            user: view.user_username,
            following: view.author_username,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SearchQuery {
    search: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct FollowBody {
    #[serde(default)]
    following: Option<String>,
}

/// The caller's own follow edges.
#[debug_handler(state = AppState)]
pub(crate) async fn list(
    State(db_pool): State<SqlitePool>,
    Query(SearchQuery { search }): Query<SearchQuery>,
    session: Session,
) -> ApiResult<Json<Vec<FollowJson>>> {
    let user = caller(&session, &db_pool).await?;
    let edges = follows::find_follow_edges_by_follower(&db_pool, user.id, search.as_deref()).await?;
    Ok(Json(edges.into_iter().map(FollowJson::from).collect()))
}

#[debug_handler(state = AppState)]
pub(crate) async fn create(
    State(db_pool): State<SqlitePool>,
    session: Session,
    body: Result<Json<FollowBody>, JsonRejection>,
) -> ApiResult<Response> {
    let user = caller(&session, &db_pool).await?;
    let Json(body) = body?;

    let follow = mutations::create_follow(&db_pool, &user, &body.following.unwrap_or_default()).await?;
    Ok((StatusCode::CREATED, Json(FollowJson::from(follow))).into_response())
}
