//! Time-bounded profile cache keyed by username.

use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use hovercard_core::ProfileRecord;
use lru::LruCache;
use tokio::time::Instant;
use tracing::debug;

/// Default time-to-live of a cached profile.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);
/// Default number of profiles kept before least-recently-used eviction.
pub const DEFAULT_CAPACITY: usize = 512;

#[derive(Debug, Clone)]
struct CacheEntry {
    record: ProfileRecord,
    fetched_at: Instant,
}

impl CacheEntry {
    fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.fetched_at) < ttl
    }
}

/// Profile cache whose entries expire `ttl` after they were stored.
///
/// Staleness is evaluated on read; stale entries stay in place until they are
/// overwritten, invalidated, or evicted by the capacity bound.
#[derive(Debug)]
pub struct TimeBoundedCache {
    entries: Mutex<LruCache<String, CacheEntry>>,
    ttl: Duration,
}

impl Default for TimeBoundedCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_CAPACITY)
    }
}

impl TimeBoundedCache {
    /// Create a cache with the given TTL and capacity (zero is treated as one).
    #[must_use]
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    /// Configured time-to-live.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the cached record for `key` when present and fresh.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<ProfileRecord> {
        let now = Instant::now();
        let mut entries = self.lock();
        let entry = entries.get(key)?;
        if entry.is_fresh(now, self.ttl) {
            debug!(%key, "Profile cache hit");
            Some(entry.record.clone())
        } else {
            debug!(%key, "Profile cache entry is stale");
            None
        }
    }

    /// Store `record` under `key`, replacing any previous entry.
    pub fn put(&self, key: &str, record: ProfileRecord) {
        let entry = CacheEntry {
            record,
            fetched_at: Instant::now(),
        };
        self.lock().put(key.to_owned(), entry);
    }

    /// Remove the entry for `key`.
    pub fn invalidate(&self, key: &str) {
        if self.lock().pop(key).is_some() {
            debug!(%key, "Invalidated cached profile");
        }
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of stored entries, fresh or stale.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true when nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
