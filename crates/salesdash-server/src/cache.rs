use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

use salesdash_core::source::ResultCache;

/// Minimum spacing between full expiry sweeps triggered by writes.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

struct Entry {
    value: Value,
    expires_at: Instant,
}

struct Entries {
    map: HashMap<String, Entry>,
    next_sweep: Instant,
}

/// In-process result cache.
///
/// An expired entry is dropped when it is next read, and writes sweep every
/// expired entry at most once per [`SWEEP_INTERVAL`], so keys that are never
/// read again do not accumulate.
pub struct MemoryCache {
    entries: RwLock<Entries>,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Entries {
                map: HashMap::new(),
                next_sweep: Instant::now(),
            }),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.map.len()
    }
}

#[async_trait]
impl ResultCache for MemoryCache {
    async fn get(&self, key: &str) -> Option<Value> {
        {
            let entries = self.entries.read().await;
            match entries.map.get(key) {
                Some(entry) if entry.expires_at > Instant::now() => {
                    return Some(entry.value.clone())
                }
                Some(_) => {}
                None => return None,
            }
        }
        let mut entries = self.entries.write().await;
        // Another writer may have refreshed the key since the read lock was
        // released.
        if entries
            .map
            .get(key)
            .is_some_and(|entry| entry.expires_at <= Instant::now())
        {
            entries.map.remove(key);
            return None;
        }
        entries.map.get(key).map(|entry| entry.value.clone())
    }

    async fn set(&self, key: &str, value: Value, ttl_secs: u64) {
        let now = Instant::now();
        let expires_at = now + Duration::from_secs(ttl_secs);
        let mut entries = self.entries.write().await;
        if now >= entries.next_sweep {
            let before = entries.map.len();
            entries.map.retain(|_, entry| entry.expires_at > now);
            let swept = before - entries.map.len();
            if swept > 0 {
                debug!(swept, "Swept expired cache entries");
            }
            entries.next_sweep = now + SWEEP_INTERVAL;
        }
        entries
            .map
            .insert(key.to_string(), Entry { value, expires_at });
    }

    async fn clear(&self) {
        self.entries.write().await.map.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = MemoryCache::new();
        cache.set("aggregates:abc", json!({"total": 1}), 10).await;
        assert_eq!(cache.get("aggregates:abc").await, Some(json!({"total": 1})));

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(cache.get("aggregates:abc").await, None);
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn clear_drops_everything() {
        let cache = MemoryCache::new();
        cache.set("a", json!(1), 60).await;
        cache.set("b", json!(2), 60).await;
        cache.clear().await;
        assert_eq!(cache.get("a").await, None);
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn writes_sweep_expired_keys_that_are_never_read() {
        let cache = MemoryCache::new();
        for i in 0..1000 {
            cache.set(&format!("rows:{i}"), json!(i), 1).await;
        }
        assert_eq!(cache.len().await, 1000);

        tokio::time::advance(Duration::from_secs(3600)).await;
        cache.set("rows:fresh", json!("fresh"), 1).await;
        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.get("rows:fresh").await, Some(json!("fresh")));
    }

    #[tokio::test(start_paused = true)]
    async fn sweeps_are_spaced_out() {
        let cache = MemoryCache::new();
        cache.set("a", json!(1), 1).await;
        tokio::time::advance(Duration::from_secs(5)).await;
        // Still inside the sweep interval: the expired key survives the write.
        cache.set("b", json!(2), 600).await;
        assert_eq!(cache.len().await, 2);

        tokio::time::advance(SWEEP_INTERVAL).await;
        cache.set("c", json!(3), 600).await;
        assert_eq!(cache.len().await, 2);
        assert_eq!(cache.get("a").await, None);
    }
}
