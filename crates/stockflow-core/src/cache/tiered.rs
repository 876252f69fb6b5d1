use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::local::{LocalCache, LocalCacheConfig, LocalCacheStats, LocalEntryOptions};
use super::shared::{CacheError, SharedCache, SharedEntryOptions};

/// Independent expiry policies for the two tiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TierPolicy {
    pub local: LocalEntryOptions,
    pub shared: SharedEntryOptions,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TieredCacheStats {
    pub local_hits: u64,
    pub shared_hits: u64,
    pub recomputes: u64,
    /// Shared-tier reads or writes that failed and were treated as misses.
    pub shared_faults: u64,
}

#[derive(Debug, Default)]
struct Counters {
    local_hits: AtomicU64,
    shared_hits: AtomicU64,
    recomputes: AtomicU64,
    shared_faults: AtomicU64,
}

type SizeHint<V> = fn(&V) -> Option<u64>;

/// Two-level cache-aside: local live values over shared serialized bytes.
///
/// Lookups try the local tier, then the shared tier, then `compute`. A shared
/// hit is decoded and copied into the local tier; a recompute is written to
/// both. Shared-tier failures never reach the caller.
pub struct TieredCache<V> {
    local: LocalCache<V>,
    shared: Arc<dyn SharedCache>,
    policy: TierPolicy,
    size_hint: SizeHint<V>,
    counters: Counters,
}

impl<V> TieredCache<V>
where
    V: Serialize + DeserializeOwned + Send + Sync,
{
    pub fn new(local: LocalCacheConfig, shared: Arc<dyn SharedCache>, policy: TierPolicy) -> Self {
        Self {
            local: LocalCache::new(local),
            shared,
            policy,
            size_hint: |_| None,
            counters: Counters::default(),
        }
    }

    /// Logical size reported to the local tier for capacity accounting.
    pub fn with_size_hint(mut self, size_hint: SizeHint<V>) -> Self {
        self.size_hint = size_hint;
        self
    }

    pub fn policy(&self) -> TierPolicy {
        self.policy
    }

    pub async fn get_or_compute<F, Fut, E>(&self, key: &str, compute: F) -> Result<Arc<V>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.local.get(key) {
            self.counters.local_hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(%key, tier = "local", "cache hit");
            return Ok(value);
        }

        if let Some(value) = self.read_shared(key).await {
            self.counters.shared_hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(%key, tier = "shared", "cache hit");
            let value = Arc::new(value);
            self.store_local(key, Arc::clone(&value));
            return Ok(value);
        }

        self.counters.recomputes.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(%key, "cache miss in both tiers; recomputing");
        let value = compute().await?;
        self.write_shared(key, &value).await;
        let value = Arc::new(value);
        self.store_local(key, Arc::clone(&value));
        Ok(value)
    }

    /// Removes `key` from both tiers of this instance.
    pub async fn invalidate(&self, key: &str) {
        self.local.remove(key);
        if let Err(error) = self.shared.remove(key).await {
            self.counters.shared_faults.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(%key, %error, "shared cache invalidation failed");
        }
    }

    pub fn stats(&self) -> TieredCacheStats {
        TieredCacheStats {
            local_hits: self.counters.local_hits.load(Ordering::Relaxed),
            shared_hits: self.counters.shared_hits.load(Ordering::Relaxed),
            recomputes: self.counters.recomputes.load(Ordering::Relaxed),
            shared_faults: self.counters.shared_faults.load(Ordering::Relaxed),
        }
    }

    pub fn local_stats(&self) -> LocalCacheStats {
        self.local.stats()
    }

    fn store_local(&self, key: &str, value: Arc<V>) {
        let size = (self.size_hint)(&value);
        self.local.insert(key, value, self.policy.local, size);
    }

    async fn read_shared(&self, key: &str) -> Option<V> {
        let decoded = match self.shared.get(key).await {
            Ok(Some(bytes)) => serde_json::from_slice::<V>(&bytes)
                .map_err(|error| CacheError::Codec(error.to_string())),
            Ok(None) => return None,
            Err(error) => Err(error),
        };
        match decoded {
            Ok(value) => Some(value),
            Err(error) => {
                self.counters.shared_faults.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(%key, %error, "shared cache entry unusable; treating as miss");
                None
            }
        }
    }

    async fn write_shared(&self, key: &str, value: &V) {
        let result = match serde_json::to_vec(value) {
            Ok(bytes) => self.shared.set(key, bytes, self.policy.shared).await,
            Err(error) => Err(CacheError::Codec(error.to_string())),
        };
        if let Err(error) = result {
            self.counters.shared_faults.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(%key, %error, "shared cache write failed");
        }
    }
}
