//! In-process translation cache.

use super::{CacheEntry, Fingerprint, TranslationCache, CACHE_NAMESPACE};
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

/// A `HashMap` behind a tokio `RwLock`. Clones share the same map.
///
/// Expired entries are dropped only when read again, so the map is unbounded.
/// Intended for tests and short-lived processes; use [`SqliteCache`] with
/// `purge_expired` for a long-running server.
///
/// [`SqliteCache`]: crate::cache::SqliteCache
#[derive(Clone, Default)]
pub struct MemoryCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl TranslationCache for MemoryCache {
    async fn get(&self, fingerprint: &Fingerprint) -> Result<Option<String>> {
        let now = Utc::now();
        {
            let entries = self.entries.read().await;
            match entries.get(fingerprint.as_key()) {
                None => return Ok(None),
                Some(entry) if !entry.is_expired_at(now) => return Ok(Some(entry.value.clone())),
                Some(_) => {}
            }
        }

        // Expired: drop it lazily, unless a writer replaced it meanwhile.
        let mut entries = self.entries.write().await;
        if entries
            .get(fingerprint.as_key())
            .is_some_and(|entry| entry.is_expired_at(now))
        {
            entries.remove(fingerprint.as_key());
            debug!("Evicted expired cache entry {}", fingerprint);
        }
        Ok(None)
    }

    async fn put(&self, fingerprint: &Fingerprint, value: &str, ttl: Duration) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(fingerprint.as_key().to_string(), CacheEntry::new(value, ttl));
        Ok(())
    }

    async fn invalidate_all(&self) -> Result<u64> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(CACHE_NAMESPACE));
        Ok((before - entries.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{TranslationRequest, CACHE_TTL};
    use crate::locale::LocaleCode;
    use crate::provider::ProviderId;

    fn fingerprint(text: &str) -> Fingerprint {
        let fr = LocaleCode::parse("fr").unwrap();
        TranslationRequest {
            source_text: text,
            target_locale: &fr,
            provider: ProviderId::Google,
        }
        .fingerprint()
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let cache = MemoryCache::new();
        assert_eq!(cache.get(&fingerprint("Hello")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let cache = MemoryCache::new();
        let fp = fingerprint("Hello");

        cache.put(&fp, "Bonjour", CACHE_TTL).await.unwrap();

        assert_eq!(cache.get(&fp).await.unwrap(), Some("Bonjour".to_string()));
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let cache = MemoryCache::new();
        let fp = fingerprint("Hello");

        cache.put(&fp, "Salut", CACHE_TTL).await.unwrap();
        cache.put(&fp, "Bonjour", CACHE_TTL).await.unwrap();

        assert_eq!(cache.get(&fp).await.unwrap(), Some("Bonjour".to_string()));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss_and_evicted() {
        let cache = MemoryCache::new();
        let fp = fingerprint("Hello");

        cache.put(&fp, "Bonjour", Duration::ZERO).await.unwrap();

        assert_eq!(cache.get(&fp).await.unwrap(), None);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_invalidate_all_causes_miss() {
        let cache = MemoryCache::new();
        let fp = fingerprint("Hello");
        cache.put(&fp, "Bonjour", CACHE_TTL).await.unwrap();

        let removed = cache.invalidate_all().await.unwrap();

        assert_eq!(removed, 1);
        assert_eq!(cache.get(&fp).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_invalidate_all_keeps_other_namespaces() {
        let cache = MemoryCache::new();
        cache.put(&fingerprint("Hello"), "Bonjour", CACHE_TTL).await.unwrap();
        cache
            .entries
            .write()
            .await
            .insert("menu_fragment_42".to_string(), CacheEntry::new("<ul></ul>", CACHE_TTL));

        let removed = cache.invalidate_all().await.unwrap();

        assert_eq!(removed, 1);
        assert_eq!(cache.len().await, 1);
        assert!(cache.entries.read().await.contains_key("menu_fragment_42"));
    }

    #[tokio::test]
    async fn test_clones_share_storage() {
        let cache = MemoryCache::new();
        let clone = cache.clone();
        let fp = fingerprint("Hello");

        cache.put(&fp, "Bonjour", CACHE_TTL).await.unwrap();

        assert_eq!(clone.get(&fp).await.unwrap(), Some("Bonjour".to_string()));
    }

    #[tokio::test]
    async fn test_concurrent_writers_same_key() {
        let cache = MemoryCache::new();
        let fp = fingerprint("Hello");

        let mut handles = Vec::new();
        for _ in 0..16 {
            let cache = cache.clone();
            let fp = fp.clone();
            handles.push(tokio::spawn(async move {
                cache.put(&fp, "Bonjour", CACHE_TTL).await.unwrap();
                cache.get(&fp).await.unwrap()
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), Some("Bonjour".to_string()));
        }
        assert_eq!(cache.len().await, 1);
    }
}
