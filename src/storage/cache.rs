//! In-memory TTL cache backing the Cache slot.

use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::core::config::{CacheConfig, MAX_TTL_SECS};
use crate::service::traits::Cache;

struct CacheEntry {
    value: Value,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

pub struct MemoryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    default_ttl: Duration,
    max_entries: usize,
}

impl MemoryCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            default_ttl: Duration::from_secs(config.default_ttl_secs.min(MAX_TTL_SECS)),
            max_entries: config.max_entries.max(1),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &str) -> Option<Value> {
        let now = Instant::now();
        {
            let entries = self.entries.read();
            match entries.get(key) {
                Some(entry) if !entry.is_expired(now) => return Some(entry.value.clone()),
                Some(_) => {}
                None => return None,
            }
        }
        let mut entries = self.entries.write();
        if entries.get(key).is_some_and(|e| e.is_expired(now)) {
            entries.remove(key);
            tracing::trace!(key, "expired cache entry purged");
        }
        None
    }

    fn insert(&self, key: &str, value: Value, ttl: Option<Duration>) {
        let now = Instant::now();
        let ttl = ttl.unwrap_or(self.default_ttl).min(Duration::from_secs(MAX_TTL_SECS));
        let expires_at = now.checked_add(ttl).unwrap_or(now);
        let mut entries = self.entries.write();
        entries.retain(|_, e| !e.is_expired(now));

        if !entries.contains_key(key) && entries.len() >= self.max_entries {
            let victim = entries
                .iter()
                .min_by_key(|(_, e)| e.expires_at)
                .map(|(k, _)| k.clone());
            if let Some(victim) = victim {
                tracing::debug!(evicted = %victim, "cache full; evicting entry closest to expiry");
                entries.remove(&victim);
            }
        }
        entries.insert(key.to_string(), CacheEntry { value, expires_at });
    }

    fn remove(&self, key: &str) -> Option<Value> {
        let now = Instant::now();
        self.entries.write().remove(key).filter(|e| !e.is_expired(now)).map(|e| e.value)
    }

    fn clear(&self) {
        self.entries.write().clear();
    }

    fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.read().values().filter(|e| !e.is_expired(now)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cache(max_entries: usize) -> MemoryCache {
        MemoryCache::new(&CacheConfig { default_ttl_secs: 60, max_entries })
    }

    #[test]
    fn test_insert_get_remove() {
        let c = cache(4);
        c.insert("price:XLM", json!("0.12"), None);
        assert_eq!(c.get("price:XLM"), Some(json!("0.12")));
        assert_eq!(c.len(), 1);
        assert_eq!(c.remove("price:XLM"), Some(json!("0.12")));
        assert!(c.is_empty());
    }

    #[test]
    fn test_zero_ttl_is_expired_immediately() {
        let c = cache(4);
        c.insert("k", json!(1), Some(Duration::ZERO));
        assert_eq!(c.get("k"), None);
        assert_eq!(c.len(), 0);
    }

    #[test]
    fn test_huge_ttl_is_clamped() {
        let c = MemoryCache::new(&CacheConfig { default_ttl_secs: u64::MAX, max_entries: 4 });
        assert_eq!(c.default_ttl(), Duration::from_secs(MAX_TTL_SECS));
        c.insert("k", json!(1), None);
        c.insert("j", json!(2), Some(Duration::MAX));
        assert_eq!(c.get("k"), Some(json!(1)));
        assert_eq!(c.get("j"), Some(json!(2)));
    }

    #[test]
    fn test_eviction_prefers_soonest_expiry() {
        let c = cache(2);
        c.insert("short", json!(1), Some(Duration::from_secs(5)));
        c.insert("long", json!(2), Some(Duration::from_secs(500)));
        c.insert("new", json!(3), None);
        assert_eq!(c.get("short"), None);
        assert_eq!(c.get("long"), Some(json!(2)));
        assert_eq!(c.get("new"), Some(json!(3)));
    }

    #[test]
    fn test_overwrite_does_not_evict() {
        let c = cache(1);
        c.insert("k", json!(1), None);
        c.insert("k", json!(2), None);
        assert_eq!(c.get("k"), Some(json!(2)));
    }
}
