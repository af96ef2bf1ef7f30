mod comment;
mod detail;
mod form;
mod index;

use axum::{
    Router,
    routing::{get, post},
};

use crate::{AppState, error::BlogError};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index::index))
        .route("/create/", get(form::create_page).post(form::create))
        .route("/posts/{post_id}/", get(detail::post_detail))
        .route("/posts/{post_id}/edit/", get(form::edit_page).post(form::edit))
        .route("/posts/{post_id}/comment/", post(comment::add_comment))
}

/// Post ids in page URLs; anything that is not a number names no post.
pub(crate) fn parse_post_id(raw: &str) -> Result<i64, BlogError> {
    raw.parse().map_err(|_| BlogError::NotFound("post"))
}
