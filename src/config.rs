use std::{path::PathBuf, time::Duration};

use anyhow::Context;

/// Posts shown per feed page unless `PAGE_SIZE` says otherwise.
pub const POSTS_PER_PAGE: u32 = 10;
/// Lifetime of a cached home feed page.
pub const FEED_CACHE_TTL: Duration = Duration::from_secs(20);
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub public_url: String,
    pub page_size: u32,
    pub feed_cache_ttl: Duration,
    pub media_root: PathBuf,
    pub max_upload_bytes: usize,
    /// JSON file with OAuth provider keys, see [`crate::auth::Clients::from_json`].
    pub oauth_clients: Option<PathBuf>,
    pub secure_cookies: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_url: "sqlite://inkwell.db?mode=rwc".to_owned(),
            bind_addr: "0.0.0.0:8080".to_owned(),
            public_url: "http://localhost:8080".to_owned(),
            page_size: POSTS_PER_PAGE,
            feed_cache_ttl: FEED_CACHE_TTL,
            media_root: PathBuf::from("media"),
            max_upload_bytes: MAX_UPLOAD_BYTES,
            oauth_clients: None,
            secure_cookies: false,
        }
    }
}

impl Config {
    /// Reads the process environment (and `.env`, if present) on top of the defaults.
    pub fn from_env() -> anyhow::Result<Config> {
        dotenv::dotenv().ok();
        let defaults = Config::default();

        let page_size = match dotenv::var("PAGE_SIZE") {
            Ok(raw) => raw.parse().context("PAGE_SIZE must be a positive integer")?,
            Err(_) => defaults.page_size,
        };
        if page_size == 0 {
            anyhow::bail!("PAGE_SIZE must be a positive integer");
        }

        let feed_cache_ttl = match dotenv::var("FEED_CACHE_TTL_SECS") {
            Ok(raw) => Duration::from_secs(
                raw.parse()
                    .context("FEED_CACHE_TTL_SECS must be a number of seconds")?,
            ),
            Err(_) => defaults.feed_cache_ttl,
        };

        let max_upload_bytes = match dotenv::var("MAX_UPLOAD_BYTES") {
            Ok(raw) => raw.parse().context("MAX_UPLOAD_BYTES must be a byte count")?,
            Err(_) => defaults.max_upload_bytes,
        };

        Ok(Config {
            database_url: dotenv::var("DATABASE_URL").unwrap_or(defaults.database_url),
            bind_addr: dotenv::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            public_url: dotenv::var("PUBLIC_URL")
                .map(|url| url.trim_end_matches('/').to_owned())
                .unwrap_or(defaults.public_url),
            page_size,
            feed_cache_ttl,
            media_root: dotenv::var("MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.media_root),
            max_upload_bytes,
            oauth_clients: dotenv::var("OAUTH_CLIENTS").ok().map(PathBuf::from),
            secure_cookies: dotenv::var("SECURE_COOKIES")
                .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
                .unwrap_or(defaults.secure_cookies),
        })
    }
}
