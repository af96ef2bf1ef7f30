use axum::{
    Form, debug_handler,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{
    AppResult,
    error::BlogError,
    guard::{self, Access},
    mutations, res, session,
};

use super::parse_post_id;

#[derive(Debug, Deserialize)]
pub(crate) struct CommentForm {
    #[serde(default)]
    text: String,
}

/// Invalid comments are dropped without a word; either way the caller ends
/// up back on the post.
#[debug_handler]
pub(crate) async fn add_comment(
    Path(raw_id): Path<String>,
    State(db_pool): State<SqlitePool>,
    session: Session,
    Form(CommentForm { text }): Form<CommentForm>,
) -> AppResult<Response> {
    let viewer = session::viewer(&session, &db_pool).await?;
    let Access::Allowed(author) = guard::require_login(viewer.as_ref()) else {
        return Ok(res::login_redirect(&format!("/posts/{raw_id}/comment/")));
    };
    let post_id = parse_post_id(&raw_id)?;

    match mutations::add_comment(&db_pool, author, post_id, &text).await {
        Ok(_) => {}
        Err(BlogError::Validation(errors)) => {
            tracing::debug!(post_id, ?errors, "comment rejected");
        }
        Err(err) => return Err(err.into()),
    }

    Ok(Redirect::to(&format!("/posts/{post_id}/")).into_response())
}
