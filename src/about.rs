//! Static "about" pages, written in Markdown and embedded at build time.

use axum::{
    Router, debug_handler,
    extract::State,
    response::{IntoResponse, Response},
    routing::get,
};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{AppResult, AppState, include_res, res, session};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/about/author/", get(author))
        .route("/about/tech/", get(tech))
}

async fn markdown_page(
    title: &str,
    source: &str,
    db_pool: &SqlitePool,
    session: &Session,
) -> AppResult<Response> {
    let viewer = session::viewer(session, db_pool).await?;
    let mut ctx = res::page_context(title, viewer.as_ref());
    ctx.insert("html", &res::markdown(source));
    Ok(res::render("about.html", &ctx)?.into_response())
}

#[debug_handler]
pub(crate) async fn author(State(db_pool): State<SqlitePool>, session: Session) -> AppResult<Response> {
    markdown_page("About the author", include_res!(str, "/about/author.md"), &db_pool, &session).await
}

#[debug_handler]
pub(crate) async fn tech(State(db_pool): State<SqlitePool>, session: Session) -> AppResult<Response> {
    markdown_page("Technology", include_res!(str, "/about/tech.md"), &db_pool, &session).await
}
