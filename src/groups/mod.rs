use std::sync::Arc;

use axum::{
    Router, debug_handler,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    routing::get,
};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{
    AppResult, AppState,
    config::Config,
    feed::{self, PageQuery, PageRequest},
    res, session,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/group/{slug}/", get(group_posts))
}

#[debug_handler(state = AppState)]
pub(crate) async fn group_posts(
    Path(slug): Path<String>,
    State(db_pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    Query(page_query): Query<PageQuery>,
    session: Session,
) -> AppResult<Response> {
    let viewer = session::viewer(&session, &db_pool).await?;
    let page = PageRequest::from_query(&page_query, config.page_size);
    let group_feed = feed::group_feed(&db_pool, &slug, page).await?;
    let group = &group_feed.group;

    let mut ctx = res::page_context(&group.to_string(), viewer.as_ref());
    ctx.insert("group", &res::GroupLink {
        slug: &group.slug,
        title: &group.title,
    });
    ctx.insert("description", &group.description);
    ctx.insert("feed", &res::feed(&group_feed.page)?);

    Ok(res::render("group_list.html", &ctx)?.into_response())
}
