//! Bounded LRU+TTL cache for raw ledger frames, with predictive sequential
//! prefetch (spec §4.1 "optional bounded cache"). The teacher caches fully
//! decoded events per ledger behind a TTL (`db::LedgerPartition::expires_at`)
//! and `cleanup_expired`; this generalizes that shape to raw frames keyed by
//! sequence, sized by entry count via `lru` instead of time-driven eviction
//! alone.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use tokio::sync::Mutex;

use crate::config::CacheConfig;

struct Entry {
    frame: Vec<u8>,
    inserted_at: Instant,
}

/// Thread-safe bounded cache keyed by ledger sequence. `get` treats an
/// expired entry as a miss and evicts it.
pub struct FrameCache {
    inner: Mutex<LruCache<u32, Entry>>,
    ttl: Duration,
}

impl FrameCache {
    pub fn new(config: &CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_entries.max(1)).unwrap();
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
            ttl: config.ttl,
        }
    }

    pub async fn get(&self, sequence: u32) -> Option<Vec<u8>> {
        let mut guard = self.inner.lock().await;
        let hit = guard.get(&sequence).map(|e| (e.inserted_at, e.frame.clone()));
        match hit {
            Some((inserted_at, frame)) if inserted_at.elapsed() < self.ttl => Some(frame),
            Some(_) => {
                guard.pop(&sequence);
                None
            }
            None => None,
        }
    }

    pub async fn put(&self, sequence: u32, frame: Vec<u8>) {
        let mut guard = self.inner.lock().await;
        guard.put(
            sequence,
            Entry {
                frame,
                inserted_at: Instant::now(),
            },
        );
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }
}

/// Predicts the next `concurrency` sequences worth prefetching given
/// `current`, assuming sequential access (spec §4.1 "predictive sequential
/// access prefetching"). A jump in cursor position (non-sequential access,
/// e.g. after a cursor-boundary reset) naturally invalidates any
/// in-flight prefetch for the old range since its results simply won't be
/// looked up.
pub fn predicted_window(current: u32, concurrency: usize) -> Vec<u32> {
    (1..=concurrency as u32).map(|i| current + i).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(ttl: Duration, max_entries: usize) -> CacheConfig {
        CacheConfig {
            enabled: true,
            ttl,
            max_entries,
            prefetch_concurrency: 4,
        }
    }

    #[tokio::test]
    async fn put_then_get_roundtrips() {
        let cache = FrameCache::new(&config(Duration::from_secs(60), 10));
        cache.put(5, vec![1, 2, 3]).await;
        assert_eq!(cache.get(5).await, Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn expired_entries_are_treated_as_misses() {
        let cache = FrameCache::new(&config(Duration::from_millis(1), 10));
        cache.put(5, vec![1]).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(cache.get(5).await, None);
    }

    #[tokio::test]
    async fn capacity_evicts_least_recently_used() {
        let cache = FrameCache::new(&config(Duration::from_secs(60), 1));
        cache.put(1, vec![1]).await;
        cache.put(2, vec![2]).await;
        assert_eq!(cache.get(1).await, None);
        assert_eq!(cache.get(2).await, Some(vec![2]));
    }

    #[test]
    fn predicted_window_is_sequential() {
        assert_eq!(predicted_window(100, 3), vec![101, 102, 103]);
    }
}
