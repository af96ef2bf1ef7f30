use std::sync::Arc;

use axum::{
    debug_handler,
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{
    AppError, AppResult, AppState,
    cache::FeedCache,
    config::Config,
    feed::{self, PageQuery, PageRequest},
    res, session,
};

/// The global feed. The rendered feed is cached per page number for the
/// cache TTL; the surrounding layout is rendered per viewer.
#[debug_handler(state = AppState)]
pub(crate) async fn index(
    State(db_pool): State<SqlitePool>,
    State(feed_cache): State<FeedCache>,
    State(config): State<Arc<Config>>,
    Query(page_query): Query<PageQuery>,
    session: Session,
) -> AppResult<Response> {
    let viewer = session::viewer(&session, &db_pool).await?;

    let page = PageRequest::from_query(&page_query, config.page_size);
    let key = FeedCache::key("/", page.number);
    let pool = &db_pool;
    let feed = feed_cache
        .get_or_render(key, move || async move {
            let page = feed::global_feed(pool, page).await?;
            Ok::<_, AppError>(res::feed(&page)?)
        })
        .await?;

    let mut ctx = res::page_context("Latest posts", viewer.as_ref());
    ctx.insert("feed", &*feed);
    Ok(res::render("index.html", &ctx)?.into_response())
}
