use std::collections::HashMap;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tokio::time::Instant;

pub const DEFAULT_TTL: Duration = Duration::from_secs(40 * 60);

struct CacheEntry {
    data: Value,
    stored_at: Instant,
}

/// Short-lived read-through cache for read API responses.
///
/// Entries are stored as JSON so one cache can hold every response shape.
pub struct ResponseCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        {
            let entries = self.entries.read().await;
            let entry = entries.get(key)?;
            if entry.stored_at.elapsed() < self.ttl {
                tracing::debug!("Cache hit for key: {}", key);
                return serde_json::from_value(entry.data.clone()).ok();
            }
        }

        if self.remove_if_expired(key).await {
            tracing::debug!("Cache expired for key: {}", key);
        }
        None
    }

    /// Remove `key` only if it is still expired once the write lock is held,
    /// so a value stored after the expired read survives.
    async fn remove_if_expired(&self, key: &str) -> bool {
        let mut entries = self.entries.write().await;
        let expired = entries
            .get(key)
            .is_some_and(|entry| entry.stored_at.elapsed() >= self.ttl);
        if expired {
            entries.remove(key);
        }
        expired
    }

    pub async fn set<T: Serialize>(&self, key: &str, data: &T) {
        match serde_json::to_value(data) {
            Ok(data) => {
                let entry = CacheEntry {
                    data,
                    stored_at: Instant::now(),
                };
                self.entries.write().await.insert(key.to_string(), entry);
            }
            Err(e) => tracing::warn!("Error writing to cache: {}", e),
        }
    }

    /// Drop one key, or everything when `key` is `None`.
    pub async fn invalidate(&self, key: Option<&str>) {
        let mut entries = self.entries.write().await;
        match key {
            Some(key) => {
                entries.remove(key);
                tracing::debug!("Cache invalidated for key: {}", key);
            }
            None => {
                entries.clear();
                tracing::debug!("All cache cleared");
            }
        }
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

pub mod keys {
    pub fn articles(topic: Option<&str>, page_size: usize, cursor: Option<&str>) -> String {
        format!(
            "articles:{}:{}:{}",
            topic.unwrap_or("all"),
            page_size,
            cursor.unwrap_or("first")
        )
    }

    pub fn article(slug: &str) -> String {
        format!("article:{}", slug)
    }

    pub fn search(query: &str, page_size: usize, offset: usize) -> String {
        format!("search:{}:{}:{}", query, page_size, offset)
    }

    pub fn related(slug: &str, limit: usize) -> String {
        format!("related:{}:{}", slug, limit)
    }

    pub fn topics() -> String {
        "topics".to_string()
    }

    pub fn topic_counts() -> String {
        "topic-counts".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        cache.set("k", &vec![1, 2, 3]).await;

        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(cache.get::<Vec<i32>>("k").await, Some(vec![1, 2, 3]));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.get::<Vec<i32>>("k").await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_keeps_a_value_stored_after_the_stale_read() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        cache.set("k", &"old").await;
        tokio::time::advance(Duration::from_secs(61)).await;

        // A fresh value lands between the stale read and the eviction.
        cache.set("k", &"new").await;
        assert!(!cache.remove_if_expired("k").await);
        assert_eq!(cache.get::<String>("k").await.as_deref(), Some("new"));

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(cache.remove_if_expired("k").await);
        assert!(cache.entries.read().await.is_empty());
    }

    #[tokio::test]
    async fn invalidate_one_or_all() {
        let cache = ResponseCache::default();
        cache.set("a", &"x").await;
        cache.set("b", &"y").await;

        cache.invalidate(Some("a")).await;
        assert_eq!(cache.get::<String>("a").await, None);
        assert_eq!(cache.get::<String>("b").await.as_deref(), Some("y"));

        cache.invalidate(None).await;
        assert_eq!(cache.get::<String>("b").await, None);
    }

    #[test]
    fn keys_are_deterministic() {
        assert_eq!(keys::articles(None, 12, None), "articles:all:12:first");
        assert_eq!(
            keys::articles(Some("Sport"), 12, Some("12")),
            "articles:Sport:12:12"
        );
        assert_eq!(keys::article("grid"), "article:grid");
    }
}
