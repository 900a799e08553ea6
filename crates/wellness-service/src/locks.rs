//! Per-key async locks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Serializes async work per key while letting different keys proceed.
///
/// Entries are created on first use and dropped once nobody holds or waits
/// for them.
#[derive(Debug, Default)]
pub struct KeyedLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`.
    pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        let slot = {
            let mut locks = self.locks.lock().unwrap_or_else(|p| p.into_inner());
            // Slots held only by the map are idle
            locks.retain(|k, slot| k == key || Arc::strong_count(slot) > 1);
            locks
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        slot.lock_owned().await
    }

    /// Keys with a live slot.
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_same_key_serialized() {
        let locks = Arc::new(KeyedLocks::new());
        let guard = locks.lock("u1").await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.lock("u1").await;
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn test_different_keys_independent() {
        let locks = KeyedLocks::new();
        let _a = locks.lock("u1").await;
        let _b = locks.lock("u2").await;
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn test_idle_slots_dropped() {
        let locks = KeyedLocks::new();
        drop(locks.lock("u1").await);
        drop(locks.lock("u2").await);
        assert_eq!(locks.len(), 1);
    }
}
