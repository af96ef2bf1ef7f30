use axum::{
    debug_handler,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{
    AppResult, feed,
    res::{self, CommentCard, PostCard},
    session,
};

use super::parse_post_id;

#[debug_handler]
pub(crate) async fn post_detail(
    Path(post_id): Path<String>,
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Response> {
    let post_id = parse_post_id(&post_id)?;
    let viewer = session::viewer(&session, &db_pool).await?;
    let detail = feed::post_detail(&db_pool, post_id).await?;
    let view = &detail.post;

    let comments: Vec<CommentCard> = detail.comments.iter().map(CommentCard::from).collect();
    let is_author = viewer.as_ref().is_some_and(|v| v.id == view.post.author_id);

    let mut ctx = res::page_context(&format!("Post {}", view.post.label()), viewer.as_ref());
    ctx.insert("post", &PostCard::from(view));
    ctx.insert("count", &detail.author_post_count);
    ctx.insert("is_author", &is_author);
    ctx.insert("comments", &comments);

    Ok(res::render("post_detail.html", &ctx)?.into_response())
}
