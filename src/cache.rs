//! Time-expiring cache for rendered home feed pages.
//!
//! Entries are keyed by feed path and page number, so the number of live
//! entries is bounded by the pages that exist. Each lives for a fixed TTL. Writes never evict anything, so a feed may show
//! a deleted post, or miss a new one, until its entry expires.

use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::{sync::RwLock, time::Instant};

#[derive(Debug, Clone)]
struct Entry {
    body: Arc<str>,
    expires_at: Instant,
}

#[derive(Debug, Clone)]
pub struct FeedCache {
    ttl: Duration,
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

impl FeedCache {
    pub fn new(ttl: Duration) -> Self {
        FeedCache {
            ttl,
            entries: Arc::default(),
        }
    }

    /// Cache key for one page of the feed at `path`. Callers pass the
    /// already-parsed page number, so stray query parameters never make new
    /// entries.
    pub fn key(path: &str, page: u32) -> String {
        format!("{path}?page={page}")
    }

    pub async fn get(&self, key: &str) -> Option<Arc<str>> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.body.clone())
    }

    pub async fn insert(&self, key: String, body: impl Into<Arc<str>>) -> Arc<str> {
        let body = body.into();
        let now = Instant::now();

        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(
            key,
            Entry {
                body: body.clone(),
                expires_at: now + self.ttl,
            },
        );
        body
    }

    /// Returns the cached body for `key`, rendering and storing it on a miss.
    pub async fn get_or_render<F, Fut, E>(&self, key: String, render: F) -> Result<Arc<str>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, E>>,
    {
        if let Some(body) = self.get(&key).await {
            tracing::debug!(%key, "feed cache hit");
            return Ok(body);
        }

        let body = render().await?;
        Ok(self.insert(key, body).await)
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_names_path_and_page() {
        assert_eq!(FeedCache::key("/", 1), "/?page=1");
        assert_eq!(FeedCache::key("/", 2), "/?page=2");
    }

    #[tokio::test]
    async fn serves_stale_body_until_cleared() {
        let cache = FeedCache::new(Duration::from_secs(60));
        let first = cache
            .get_or_render("/".to_owned(), || async { Ok::<_, ()>("one".to_owned()) })
            .await
            .unwrap();
        let second = cache
            .get_or_render("/".to_owned(), || async { Ok::<_, ()>("two".to_owned()) })
            .await
            .unwrap();
        assert_eq!(&*first, "one");
        assert_eq!(&*second, "one");

        cache.clear().await;
        let third = cache
            .get_or_render("/".to_owned(), || async { Ok::<_, ()>("three".to_owned()) })
            .await
            .unwrap();
        assert_eq!(&*third, "three");
    }

    #[tokio::test]
    async fn entries_expire_after_ttl() {
        let cache = FeedCache::new(Duration::from_millis(30));
        cache.insert("/".to_owned(), "old").await;
        assert!(cache.get("/").await.is_some());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(cache.get("/").await.is_none());
    }

    #[tokio::test]
    async fn render_errors_are_not_cached() {
        let cache = FeedCache::new(Duration::from_secs(60));
        let failed = cache
            .get_or_render("/".to_owned(), || async { Err::<String, _>("boom") })
            .await;
        assert!(failed.is_err());
        assert!(cache.get("/").await.is_none());
    }
}
