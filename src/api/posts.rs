use std::sync::Arc;

use axum::{
    Json, debug_handler,
    extract::{
        Path, Query, State,
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
    config::Config,
    db::{PostView, posts},
    error::BlogError,
    feed,
    media::{self, MediaStore},
    mutations::{self, PostInput},
};

use super::{ApiResult, LimitOffset, Paginated, caller, present};

#[derive(Debug, Serialize)]
pub(crate) struct PostJson {
    id: i64,
    author: String,
    text: String,
    #[serde(with = "time::serde::rfc3339")]
    created: OffsetDateTime,
    image: Option<String>,
    group: Option<i64>,
}

impl PostJson {
    fn new(view: PostView, public_url: &str) -> Self {
        let post = view.post;
        PostJson {
            id: post.id,
            author: view.author_username,
            text: post.text,
            created: post.created,
            image: post
                .image
                .map(|image| format!("{public_url}{}", media::media_url(&image))),
            group: post.group_id,
        }
    }
}

/// Anything else in the body, `author` included, is ignored. Images are
/// managed through the pages only.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct PostBody {
    #[serde(default)]
    text: Option<String>,
    #[serde(default, deserialize_with = "present")]
    group: Option<Option<i64>>,
}

async fn post_json(db_pool: &SqlitePool, post_id: i64, public_url: &str) -> ApiResult<PostJson> {
    let view = posts::find_post_view_by_id(db_pool, post_id)
        .await?
        .ok_or(BlogError::NotFound("post"))?;
    Ok(PostJson::new(view, public_url))
}

#[debug_handler(state = AppState)]
pub(crate) async fn list(
    State(db_pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    Query(window): Query<LimitOffset>,
) -> ApiResult<Response> {
    let limit = window.limit();
    let offset = if limit.is_some() { window.offset() } else { 0 };
    let (views, count) = feed::list_posts(&db_pool, limit, offset).await?;
    let results: Vec<PostJson> = views
        .into_iter()
        .map(|view| PostJson::new(view, &config.public_url))
        .collect();

    Ok(match limit {
        Some(limit) => {
            let base_url = format!("{}/api/v1/posts/", config.public_url);
            Json(Paginated::new(results, count, limit, offset, &base_url)).into_response()
        }
        None => Json(results).into_response(),
    })
}

#[debug_handler(state = AppState)]
pub(crate) async fn create(
    State(db_pool): State<SqlitePool>,
    State(media): State<MediaStore>,
    State(config): State<Arc<Config>>,
    session: Session,
    body: Result<Json<PostBody>, JsonRejection>,
) -> ApiResult<Response> {
    let author = caller(&session, &db_pool).await?;
    let Json(body) = body?;

    let input = PostInput {
        text: body.text.unwrap_or_default(),
        group: body.group.flatten(),
        ..Default::default()
    };
    let post = mutations::create_post(&db_pool, &media, &author, input).await?;

    let json = post_json(&db_pool, post.id, &config.public_url).await?;
    Ok((StatusCode::CREATED, Json(json)).into_response())
}

#[debug_handler(state = AppState)]
pub(crate) async fn retrieve(
    path: Result<Path<i64>, PathRejection>,
    State(db_pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
) -> ApiResult<Json<PostJson>> {
    let Path(post_id) = path?;
    Ok(Json(post_json(&db_pool, post_id, &config.public_url).await?))
}

async fn apply_update(
    path: Result<Path<i64>, PathRejection>,
    state: &AppState,
    session: &Session,
    body: Result<Json<PostBody>, JsonRejection>,
    partial: bool,
) -> ApiResult<Json<PostJson>> {
    let editor = caller(session, &state.db_pool).await?;
    let Path(post_id) = path?;
    let post = posts::find_post_by_id(&state.db_pool, post_id)
        .await?
        .ok_or(BlogError::NotFound("post"))?;
    let Json(body) = body?;

    let input = if partial {
        PostInput {
            text: body.text.unwrap_or_else(|| post.text.clone()),
            group: body.group.unwrap_or(post.group_id),
            ..Default::default()
        }
    } else {
        PostInput {
            text: body.text.unwrap_or_default(),
            group: body.group.flatten(),
            ..Default::default()
        }
    };
    mutations::edit_post(&state.db_pool, &state.media, &editor, &post, input).await?;

    Ok(Json(post_json(&state.db_pool, post_id, &state.config.public_url).await?))
}

#[debug_handler(state = AppState)]
pub(crate) async fn update(
    path: Result<Path<i64>, PathRejection>,
    State(state): State<AppState>,
    session: Session,
    body: Result<Json<PostBody>, JsonRejection>,
) -> ApiResult<Json<PostJson>> {
    apply_update(path, &state, &session, body, false).await
}

#[debug_handler(state = AppState)]
pub(crate) async fn partial_update(
    path: Result<Path<i64>, PathRejection>,
    State(state): State<AppState>,
    session: Session,
    body: Result<Json<PostBody>, JsonRejection>,
) -> ApiResult<Json<PostJson>> {
    apply_update(path, &state, &session, body, true).await
}

#[debug_handler(state = AppState)]
pub(crate) async fn destroy(
    path: Result<Path<i64>, PathRejection>,
    State(db_pool): State<SqlitePool>,
    State(media): State<MediaStore>,
    session: Session,
) -> ApiResult<StatusCode> {
    let editor = caller(&session, &db_pool).await?;
    let Path(post_id) = path?;
    let post = posts::find_post_by_id(&db_pool, post_id)
        .await?
        .ok_or(BlogError::NotFound("post"))?;

    mutations::delete_post(&db_pool, &media, &editor, &post).await?;
    Ok(StatusCode::NO_CONTENT)
}
