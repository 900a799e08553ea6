//! Bounded response cache with per-entry expiry.
//!
//! Entries expire lazily: a lookup on a stale entry is a miss and drops it.
//! [`TtlCache::purge_expired`] is available for callers that want a sweep.

use std::time::Duration;

use indexmap::IndexMap;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Default maximum number of entries before eviction.
pub const DEFAULT_MAX_ENTRIES: usize = 1000;

#[derive(Debug)]
struct CacheEntry<V> {
    value: V,
    /// When the value was computed (not when it was stored).
    stored_at: Instant,
    ttl: Duration,
}

impl<V> CacheEntry<V> {
    fn is_fresh(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) < self.ttl
    }
}

/// Key/value cache with per-entry TTL and a hard entry bound.
///
/// Insertion order is kept so the oldest entries can be evicted once the
/// bound is exceeded (expired entries are dropped first).
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use vitals_core::TtlCache;
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() {
///     let cache = TtlCache::with_max_entries(2);
///     cache.set("a", 1, Duration::from_secs(60)).await;
///     cache.set("b", 2, Duration::from_secs(60)).await;
///     cache.set("c", 3, Duration::from_secs(60)).await;
///
///     assert_eq!(cache.len().await, 2);
///     assert_eq!(cache.get("a").await, None); // oldest evicted
/// }
/// ```
#[derive(Debug)]
pub struct TtlCache<V> {
    entries: Mutex<IndexMap<String, CacheEntry<V>>>,
    max_entries: usize,
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone> TtlCache<V> {
    /// Create a cache with the default entry bound.
    pub fn new() -> Self {
        Self::with_max_entries(DEFAULT_MAX_ENTRIES)
    }

    /// Create a cache holding at most `max_entries` entries.
    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(IndexMap::new()),
            max_entries: max_entries.max(1),
        }
    }

    /// Look up a fresh value.
    ///
    /// A stale entry is removed and reported as a miss.
    pub async fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();

        match entries.get(key) {
            Some(entry) if entry.is_fresh(now) => Some(entry.value.clone()),
            Some(_) => {
                entries.shift_remove(key);
                debug!(key, "Cache entry expired");
                None
            }
            None => None,
        }
    }

    /// Store a value computed right now.
    pub async fn set(&self, key: &str, value: V, ttl: Duration) {
        self.set_computed_at(key, value, ttl, Instant::now()).await;
    }

    /// Store a value tagged with the instant it was computed.
    ///
    /// If the resident entry was computed later than `computed_at`, the
    /// resident entry wins and `false` is returned. Expiry is measured from
    /// `computed_at`.
    pub async fn set_computed_at(
        &self,
        key: &str,
        value: V,
        ttl: Duration,
        computed_at: Instant,
    ) -> bool {
        let mut entries = self.entries.lock().await;

        if let Some(existing) = entries.get(key) {
            if existing.stored_at > computed_at {
                debug!(key, "Skipping cache write older than resident entry");
                return false;
            }
        }

        // Remove first so the key moves to the end (newest)
        entries.shift_remove(key);
        entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                stored_at: computed_at,
                ttl,
            },
        );

        if entries.len() > self.max_entries {
            let now = Instant::now();
            entries.retain(|_, entry| entry.is_fresh(now));
        }
        while entries.len() > self.max_entries {
            entries.shift_remove_index(0);
        }

        true
    }

    /// Drop a single entry. Returns whether it existed.
    pub async fn invalidate(&self, key: &str) -> bool {
        self.entries.lock().await.shift_remove(key).is_some()
    }

    /// Drop every entry whose key starts with `prefix`.
    pub async fn invalidate_prefix(&self, prefix: &str) -> usize {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        before - entries.len()
    }

    /// Drop every expired entry. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_fresh(now));
        before - entries.len()
    }

    /// Drop everything.
    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }

    /// Number of resident entries (fresh or not yet evicted).
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }
}

/// Build a cache key from a call family and its request parameters.
///
/// Parts are escaped and joined with `|`, so distinct parameter lists never
/// produce the same key.
pub fn cache_key<I, S>(family: &str, parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut key = escape_part(family);
    for part in parts {
        key.push('|');
        key.push_str(&escape_part(part.as_ref()));
    }
    key
}

fn escape_part(part: &str) -> String {
    part.replace('\\', "\\\\").replace('|', "\\|")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::advance;

    #[tokio::test(start_paused = true)]
    async fn test_hit_before_ttl() {
        let cache = TtlCache::new();
        cache.set("k", "v".to_string(), Duration::from_secs(30)).await;

        advance(Duration::from_secs(29)).await;
        assert_eq!(cache.get("k").await, Some("v".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_miss_after_ttl_and_entry_dropped() {
        let cache = TtlCache::new();
        cache.set("k", 1, Duration::from_secs(30)).await;

        advance(Duration::from_secs(30)).await;
        assert_eq!(cache.get("k").await, None);
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_older_computation_does_not_overwrite() {
        let cache = TtlCache::new();
        let slow_request_started = Instant::now();

        advance(Duration::from_secs(1)).await;
        cache.set("k", "fresh", Duration::from_secs(60)).await;

        let written = cache
            .set_computed_at("k", "stale", Duration::from_secs(60), slow_request_started)
            .await;

        assert!(!written);
        assert_eq!(cache.get("k").await, Some("fresh"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_measured_from_computation() {
        let cache = TtlCache::new();
        let computed_at = Instant::now();

        advance(Duration::from_secs(50)).await;
        cache
            .set_computed_at("k", 7, Duration::from_secs(60), computed_at)
            .await;

        advance(Duration::from_secs(11)).await;
        assert_eq!(cache.get("k").await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bound_evicts_expired_before_oldest() {
        let cache = TtlCache::with_max_entries(2);
        cache.set("short", 1, Duration::from_secs(1)).await;
        cache.set("long", 2, Duration::from_secs(600)).await;

        advance(Duration::from_secs(2)).await;
        cache.set("new", 3, Duration::from_secs(600)).await;

        assert_eq!(cache.len().await, 2);
        assert_eq!(cache.get("long").await, Some(2));
        assert_eq!(cache.get("new").await, Some(3));
    }

    #[tokio::test]
    async fn test_bound_evicts_oldest() {
        let cache = TtlCache::with_max_entries(3);
        for i in 0..10 {
            cache.set(&format!("k{}", i), i, Duration::from_secs(60)).await;
        }

        assert_eq!(cache.len().await, 3);
        assert_eq!(cache.get("k6").await, None);
        assert_eq!(cache.get("k9").await, Some(9));
    }

    #[tokio::test]
    async fn test_invalidate_and_prefix() {
        let cache = TtlCache::new();
        cache.set("chat|a", 1, Duration::from_secs(60)).await;
        cache.set("chat|b", 2, Duration::from_secs(60)).await;
        cache.set("recipes|a", 3, Duration::from_secs(60)).await;

        assert!(cache.invalidate("recipes|a").await);
        assert!(!cache.invalidate("recipes|a").await);
        assert_eq!(cache.invalidate_prefix("chat|").await, 2);
        assert!(cache.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let cache = TtlCache::new();
        cache.set("a", 1, Duration::from_secs(5)).await;
        cache.set("b", 2, Duration::from_secs(50)).await;

        advance(Duration::from_secs(10)).await;
        assert_eq!(cache.purge_expired().await, 1);
        assert_eq!(cache.len().await, 1);
    }

    #[test]
    fn test_cache_key_is_deterministic() {
        let a = cache_key("chat", ["hello", "user-123", "session-1"]);
        let b = cache_key("chat", ["hello", "user-123", "session-1"]);
        assert_eq!(a, b);
        assert_eq!(a, "chat|hello|user-123|session-1");
    }

    #[test]
    fn test_cache_key_escapes_separator() {
        let joined = cache_key("n", ["a|b", "c"]);
        let split = cache_key("n", ["a", "b|c"]);
        assert_ne!(joined, split);
    }
}
