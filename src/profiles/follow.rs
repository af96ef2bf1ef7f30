use std::sync::Arc;

use axum::{
    debug_handler,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{
    AppResult, AppState,
    config::Config,
    db::{User, users},
    error::BlogError,
    feed::{self, PageQuery, PageRequest},
    guard::{self, Access},
    mutations, res, session,
};

async fn author_by_username(db_pool: &SqlitePool, username: &str) -> AppResult<User> {
    Ok(users::find_user_by_username(db_pool, username)
        .await?
        .ok_or(BlogError::NotFound("user"))?)
}

#[debug_handler]
pub(crate) async fn follow(
    Path(username): Path<String>,
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Response> {
    let viewer = session::viewer(&session, &db_pool).await?;
    let Access::Allowed(follower) = guard::require_login(viewer.as_ref()) else {
        return Ok(res::login_redirect(&format!("/profile/{username}/follow/")));
    };

    let author = author_by_username(&db_pool, &username).await?;
    mutations::follow_author(&db_pool, follower, &author).await?;

    Ok(Redirect::to(&format!("/profile/{}/", author.username)).into_response())
}

#[debug_handler]
pub(crate) async fn unfollow(
    Path(username): Path<String>,
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Response> {
    let viewer = session::viewer(&session, &db_pool).await?;
    let Access::Allowed(follower) = guard::require_login(viewer.as_ref()) else {
        return Ok(res::login_redirect(&format!("/profile/{username}/unfollow/")));
    };

    let author = author_by_username(&db_pool, &username).await?;
    mutations::unfollow_author(&db_pool, follower, &author).await?;

    Ok(Redirect::to(&format!("/profile/{}/", author.username)).into_response())
}

/// Posts by everyone the viewer follows.
#[debug_handler(state = AppState)]
pub(crate) async fn follow_index(
    State(db_pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    Query(page_query): Query<PageQuery>,
    session: Session,
) -> AppResult<Response> {
    let viewer = session::viewer(&session, &db_pool).await?;
    let Access::Allowed(user) = guard::require_login(viewer.as_ref()) else {
        return Ok(res::login_redirect("/follow/"));
    };

    let page = PageRequest::from_query(&page_query, config.page_size);
    let page = feed::following_feed(&db_pool, user, page).await?;

    let mut ctx = res::page_context("Following", Some(user));
    ctx.insert("feed", &res::feed(&page)?);
    Ok(res::render("follow.html", &ctx)?.into_response())
}
