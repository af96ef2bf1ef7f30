use std::sync::Arc;

use axum::{
    debug_handler,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{
    AppResult, AppState,
    config::Config,
    feed::{self, PageQuery, PageRequest},
    res, session,
};

/// An author's posts, with a follow toggle for other logged-in users.
#[debug_handler(state = AppState)]
pub(crate) async fn profile(
    Path(username): Path<String>,
    State(db_pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    Query(page_query): Query<PageQuery>,
    session: Session,
) -> AppResult<Response> {
    let viewer = session::viewer(&session, &db_pool).await?;
    let page = PageRequest::from_query(&page_query, config.page_size);
    let profile = feed::profile_feed(&db_pool, &username, viewer.as_ref(), page).await?;
    let author = &profile.author;
    let can_follow = viewer.as_ref().is_some_and(|viewer| viewer.id != author.id);

    let mut ctx = res::page_context(&format!("Profile of {}", author.username), viewer.as_ref());
    ctx.insert("author", &author.username);
    ctx.insert("count", &profile.page.total);
    ctx.insert("can_follow", &can_follow);
    ctx.insert("following", &profile.following);
    ctx.insert("feed", &res::feed(&profile.page)?);

    Ok(res::render("profile.html", &ctx)?.into_response())
}
