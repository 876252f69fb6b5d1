//! In-process cache tier holding live values.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

/// Expiration policy for local entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalEntryOptions {
    /// Lifetime that restarts on every hit.
    pub sliding: Option<Duration>,
    /// Hard ceiling measured from insertion.
    pub absolute: Option<Duration>,
}

impl Default for LocalEntryOptions {
    fn default() -> Self {
        Self {
            sliding: Some(Duration::from_secs(120)),
            absolute: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocalCacheConfig {
    /// Capacity in logical size units. Entries without a size count as 1.
    pub size_limit: Option<u64>,
}

/// Point-in-time counters for the local tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocalCacheStats {
    pub total_hits: u64,
    pub total_misses: u64,
    pub entry_count: usize,
    pub current_estimated_size: u64,
}

#[derive(Debug)]
struct LocalEntry<V> {
    value: Arc<V>,
    sliding: Option<Duration>,
    absolute_deadline: Option<Instant>,
    last_access: Instant,
    size: u64,
}

impl<V> LocalEntry<V> {
    fn expires_at(&self) -> Option<Instant> {
        let sliding_deadline = self.sliding.map(|sliding| self.last_access + sliding);
        match (sliding_deadline, self.absolute_deadline) {
            (Some(sliding), Some(absolute)) => Some(sliding.min(absolute)),
            (sliding, absolute) => sliding.or(absolute),
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at().is_some_and(|deadline| now >= deadline)
    }
}

#[derive(Debug)]
struct LocalInner<V> {
    entries: HashMap<String, LocalEntry<V>>,
    total_hits: u64,
    total_misses: u64,
    size: u64,
}

impl<V> LocalInner<V> {
    fn take(&mut self, key: &str) -> Option<LocalEntry<V>> {
        let entry = self.entries.remove(key)?;
        self.size = self.size.saturating_sub(entry.size);
        Some(entry)
    }

    fn purge_expired(&mut self, now: Instant) -> usize {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            self.take(key);
        }
        expired.len()
    }

    fn evict_least_recently_used(&mut self) -> bool {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_access)
            .map(|(key, _)| key.clone());
        match oldest {
            Some(key) => {
                tracing::debug!(%key, "evicting local cache entry for capacity");
                self.take(&key).is_some()
            }
            None => false,
        }
    }
}

/// Thread-safe in-memory tier with sliding/absolute expiry and size accounting.
#[derive(Debug)]
pub struct LocalCache<V> {
    inner: Mutex<LocalInner<V>>,
    config: LocalCacheConfig,
}

impl<V> LocalCache<V> {
    pub fn new(config: LocalCacheConfig) -> Self {
        Self {
            inner: Mutex::new(LocalInner {
                entries: HashMap::new(),
                total_hits: 0,
                total_misses: 0,
                size: 0,
            }),
            config,
        }
    }

    fn lock(&self) -> MutexGuard<'_, LocalInner<V>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns a live entry and restarts its sliding window.
    pub fn get(&self, key: &str) -> Option<Arc<V>> {
        let now = Instant::now();
        let mut inner = self.lock();

        let expired = match inner.entries.get_mut(key) {
            Some(entry) if !entry.is_expired(now) => {
                entry.last_access = now;
                let value = Arc::clone(&entry.value);
                inner.total_hits += 1;
                return Some(value);
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            inner.take(key);
        }
        inner.total_misses += 1;
        None
    }

    /// Stores `value`, evicting for capacity if needed.
    ///
    /// Returns `false` when the entry alone exceeds the configured size limit.
    pub fn insert(
        &self,
        key: impl Into<String>,
        value: Arc<V>,
        options: LocalEntryOptions,
        size: Option<u64>,
    ) -> bool {
        let key = key.into();
        let now = Instant::now();
        let mut inner = self.lock();
        inner.take(&key);

        let size = size.unwrap_or(1);
        if let Some(limit) = self.config.size_limit {
            if size > limit {
                tracing::debug!(
                    %key,
                    size,
                    limit,
                    "entry larger than local cache capacity; not cached"
                );
                return false;
            }
            if inner.size + size > limit {
                inner.purge_expired(now);
            }
            while inner.size + size > limit {
                if !inner.evict_least_recently_used() {
                    break;
                }
            }
        }

        inner.size += size;
        inner.entries.insert(
            key,
            LocalEntry {
                value,
                sliding: options.sliding,
                absolute_deadline: options.absolute.map(|absolute| now + absolute),
                last_access: now,
                size,
            },
        );
        true
    }

    pub fn remove(&self, key: &str) -> bool {
        self.lock().take(key).is_some()
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.size = 0;
    }

    /// Drops expired entries and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.lock().purge_expired(Instant::now())
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> LocalCacheStats {
        let inner = self.lock();
        LocalCacheStats {
            total_hits: inner.total_hits,
            total_misses: inner.total_misses,
            entry_count: inner.entries.len(),
            current_estimated_size: inner.size,
        }
    }
}
