use axum::{
    Json, debug_handler,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use time::OffsetDateTime;
use tower_sessions::Session;

use crate::{
    AppState,
    db::{CommentView, comments, posts},
    error::BlogError,
    mutations,
};

use super::{ApiResult, caller};

#[derive(Debug, Serialize)]
pub(crate) struct CommentJson {
    id: i64,
    author: String,
    text: String,
    #[serde(with = "time::serde::rfc3339")]
    created: OffsetDateTime,
    post: i64,
}

impl From<CommentView> for CommentJson {
    fn from(view: CommentView) -> Self {
        CommentJson {
            id: view.comment.id,
            author: view.author_username,
            text: view.comment.text,
            created: view.comment.created,
            post: view.comment.post_id,
        }
    }
}

/// `post` and `author` come from the route and the login, never the body.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct CommentBody {
    #[serde(default)]
    text: Option<String>,
}

async fn ensure_post(db_pool: &SqlitePool, post_id: i64) -> ApiResult<()> {
    posts::find_post_by_id(db_pool, post_id)
        .await?
        .ok_or(BlogError::NotFound("post"))?;
    Ok(())
}

async fn find(db_pool: &SqlitePool, post_id: i64, comment_id: i64) -> ApiResult<CommentView> {
    Ok(comments::find_comment(db_pool, post_id, comment_id)
        .await?
        .ok_or(BlogError::NotFound("comment"))?)
}

#[debug_handler(state = AppState)]
pub(crate) async fn list(
    path: Result<Path<i64>, PathRejection>,
    State(db_pool): State<SqlitePool>,
) -> ApiResult<Json<Vec<CommentJson>>> {
    let Path(post_id) = path?;
    ensure_post(&db_pool, post_id).await?;

    let comments = comments::find_comments_by_post(&db_pool, post_id).await?;
    Ok(Json(comments.into_iter().map(CommentJson::from).collect()))
}

#[debug_handler(state = AppState)]
pub(crate) async fn create(
    path: Result<Path<i64>, PathRejection>,
    State(db_pool): State<SqlitePool>,
    session: Session,
    body: Result<Json<CommentBody>, JsonRejection>,
) -> ApiResult<Response> {
    let author = caller(&session, &db_pool).await?;
    let Path(post_id) = path?;
    ensure_post(&db_pool, post_id).await?;
    let Json(body) = body?;

    let comment = mutations::add_comment(&db_pool, &author, post_id, &body.text.unwrap_or_default()).await?;
    let json = CommentJson::from(find(&db_pool, post_id, comment.id).await?);
    Ok((StatusCode::CREATED, Json(json)).into_response())
}

#[debug_handler(state = AppState)]
pub(crate) async fn retrieve(
    path: Result<Path<(i64, i64)>, PathRejection>,
    State(db_pool): State<SqlitePool>,
) -> ApiResult<Json<CommentJson>> {
    let Path((post_id, comment_id)) = path?;
    Ok(Json(find(&db_pool, post_id, comment_id).await?.into()))
}

async fn apply_update(
    path: Result<Path<(i64, i64)>, PathRejection>,
    db_pool: &SqlitePool,
    session: &Session,
    body: Result<Json<CommentBody>, JsonRejection>,
    partial: bool,
) -> ApiResult<Json<CommentJson>> {
    let editor = caller(session, db_pool).await?;
    let Path((post_id, comment_id)) = path?;
    let comment = find(db_pool, post_id, comment_id).await?;
    let Json(body) = body?;

    let text = match body.text {
        Some(text) => text,
        None if partial => comment.comment.text.clone(),
        None => String::new(),
    };
    mutations::edit_comment(db_pool, &editor, &comment, &text).await?;

    Ok(Json(find(db_pool, post_id, comment_id).await?.into()))
}

#[debug_handler(state = AppState)]
pub(crate) async fn update(
    path: Result<Path<(i64, i64)>, PathRejection>,
    State(db_pool): State<SqlitePool>,
    session: Session,
    body: Result<Json<CommentBody>, JsonRejection>,
) -> ApiResult<Json<CommentJson>> {
    apply_update(path, &db_pool, &session, body, false).await
}

#[debug_handler(state = AppState)]
pub(crate) async fn partial_update(
    path: Result<Path<(i64, i64)>, PathRejection>,
    State(db_pool): State<SqlitePool>,
    session: Session,
    body: Result<Json<CommentBody>, JsonRejection>,
) -> ApiResult<Json<CommentJson>> {
    apply_update(path, &db_pool, &session, body, true).await
}

#[debug_handler(state = AppState)]
pub(crate) async fn destroy(
    path: Result<Path<(i64, i64)>, PathRejection>,
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> ApiResult<StatusCode> {
    let editor = caller(&session, &db_pool).await?;
    let Path((post_id, comment_id)) = path?;
    let comment = find(&db_pool, post_id, comment_id).await?;

    mutations::delete_comment(&db_pool, &editor, &comment).await?;
    Ok(StatusCode::NO_CONTENT)
}
