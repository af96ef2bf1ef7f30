pub mod about;
pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod feed;
pub mod groups;
pub mod guard;
pub mod media;
pub mod mutations;
pub mod posts;
pub mod profiles;
pub mod res;
pub mod session;

use std::sync::Arc;

use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRef, multipart::MultipartError},
    response::{IntoResponse, Response},
};
use sqlx::SqlitePool;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tower_sessions::{Expiry, SessionManagerLayer, SessionStore, cookie::SameSite};

use crate::{cache::FeedCache, config::Config, error::BlogError, media::MediaStore};

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub clients: auth::Clients,
    pub feed_cache: FeedCache,
    pub media: MediaStore,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db_pool: SqlitePool, clients: auth::Clients, config: Config) -> Self {
        AppState {
            db_pool,
            clients,
            feed_cache: FeedCache::new(config.feed_cache_ttl),
            media: MediaStore::new(config.media_root.clone()),
            config: Arc::new(config),
        }
    }
}

/// The whole site: pages, the `/api/v1` surface and uploaded media.
pub fn app<S>(state: AppState, session_store: S) -> Router
where
    S: SessionStore + Clone,
{
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(state.config.secure_cookies)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::days(14)));
    let body_limit = DefaultBodyLimit::max(state.config.max_upload_bytes);
    let media_root = state.media.root().to_owned();

    Router::new()
        .merge(posts::router())
        .merge(groups::router())
        .merge(profiles::router())
        .merge(auth::router())
        .merge(about::router())
        .nest("/api/v1", api::router())
        .nest_service(media::MEDIA_URL, ServeDir::new(media_root))
        .fallback(res::fallback)
        .with_state(state)
        .layer(body_limit)
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
}

pub trait GetField {
    fn get_str_field(&self, field: &str) -> AppResult<String>;
}

impl GetField for serde_json::Value {
    fn get_str_field(&self, field: &str) -> AppResult<String> {
        Ok(
            self.get(field)
            .ok_or(format!("expected {field} in {self}"))?
            .as_str()
            .ok_or(format!("expected {field} in {self} to be string"))?
            .to_owned()
        )
    }
}

pub type AppResult<T> = Result<T, AppError>;
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    pub fn blog_error(&self) -> Option<&BlogError> {
        self.0.downcast_ref::<BlogError>()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Some(BlogError::NotFound(what)) = self.blog_error() {
            tracing::debug!(what, "not found");
            return res::not_found();
        }

        tracing::error!("{}\n\n{}", self.0, self.0.backtrace());
        res::server_error()
    }
}

impl From<String> for AppError {
    fn from(err: String) -> Self {
        Self(anyhow::Error::msg(err))
    }
}

impl From<&str> for AppError {
    fn from(err: &str) -> Self {
        Self(anyhow::Error::msg(err.to_owned()))
    }
}

macro_rules! apperr_impl {
    ($E:ty) => {
        impl From<$E> for AppError {
            fn from(err: $E) -> Self {
                Self(anyhow::Error::from(err))
            }
        }
    };
}

apperr_impl!(BlogError);
apperr_impl!(anyhow::Error);
apperr_impl!(serde_json::Error);
apperr_impl!(sqlx::Error);
apperr_impl!(std::io::Error);
apperr_impl!(tower_sessions::session::Error);
apperr_impl!(axum::Error);
apperr_impl!(MultipartError);
apperr_impl!(reqwest::Error);
apperr_impl!(tera::Error);
apperr_impl!(oauth2::url::ParseError);

impl<E: core::error::Error + Send + Sync + 'static, R: oauth2::ErrorResponse + Send + Sync + 'static> From<oauth2::RequestTokenError<E, R>> for AppError {
    fn from(err: oauth2::RequestTokenError<E, R>) -> Self {
        Self(anyhow::Error::from(err))
    }
}
