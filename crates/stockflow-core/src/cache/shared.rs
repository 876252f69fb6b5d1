//! Shared cache tier: serialized bytes reachable by every process instance.
//!
//! Only the [`SharedCache`] contract matters to [`super::TieredCache`]; a
//! networked store implements the same three calls. Concurrent writers race
//! with last-write-wins semantics on a key.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

use crate::BoxFuture;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("shared cache backend failure: {0}")]
    Backend(String),
    #[error("cached value could not be decoded: {0}")]
    Codec(String),
}

/// Expiration policy for shared entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SharedEntryOptions {
    pub sliding: Option<Duration>,
    pub absolute: Option<Duration>,
}

impl Default for SharedEntryOptions {
    fn default() -> Self {
        Self {
            sliding: Some(Duration::from_secs(5)),
            absolute: Some(Duration::from_secs(20)),
        }
    }
}

/// Byte-oriented shared store. `get` refreshes the entry's sliding window.
pub trait SharedCache: Send + Sync {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Vec<u8>>, CacheError>>;

    fn set<'a>(
        &'a self,
        key: &'a str,
        value: Vec<u8>,
        options: SharedEntryOptions,
    ) -> BoxFuture<'a, Result<(), CacheError>>;

    fn remove<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), CacheError>>;
}

#[derive(Debug)]
struct SharedEntry {
    bytes: Vec<u8>,
    sliding: Option<Duration>,
    absolute_deadline: Option<Instant>,
    last_access: Instant,
}

impl SharedEntry {
    fn is_expired(&self, now: Instant) -> bool {
        let slid_out = self
            .sliding
            .is_some_and(|sliding| now >= self.last_access + sliding);
        let past_ceiling = self.absolute_deadline.is_some_and(|deadline| now >= deadline);
        slid_out || past_ceiling
    }
}

/// In-process stand-in for a distributed cache. Clone the `Arc` to share it.
#[derive(Debug, Default)]
pub struct InMemorySharedCache {
    entries: Mutex<HashMap<String, SharedEntry>>,
    reads: AtomicU64,
}

impl InMemorySharedCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `get` calls served so far, hit or miss.
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    fn get_sync(&self, key: &str) -> Option<Vec<u8>> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.get_mut(key)?;
        if entry.is_expired(now) {
            entries.remove(key);
            return None;
        }
        entry.last_access = now;
        Some(entry.bytes.clone())
    }
}

impl SharedCache for InMemorySharedCache {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Vec<u8>>, CacheError>> {
        Box::pin(async move { Ok(self.get_sync(key)) })
    }

    fn set<'a>(
        &'a self,
        key: &'a str,
        value: Vec<u8>,
        options: SharedEntryOptions,
    ) -> BoxFuture<'a, Result<(), CacheError>> {
        Box::pin(async move {
            let now = Instant::now();
            self.entries
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(
                    key.to_owned(),
                    SharedEntry {
                        bytes: value,
                        sliding: options.sliding,
                        absolute_deadline: options.absolute.map(|absolute| now + absolute),
                        last_access: now,
                    },
                );
            Ok(())
        })
    }

    fn remove<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), CacheError>> {
        Box::pin(async move {
            self.entries
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(key);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn reads_extend_sliding_window_up_to_the_absolute_ceiling() {
        let cache = InMemorySharedCache::new();
        cache
            .set("OSPK", b"[]".to_vec(), SharedEntryOptions::default())
            .await
            .expect("stored");

        for _ in 0..4 {
            tokio::time::advance(Duration::from_secs(4)).await;
            assert!(cache.get("OSPK").await.expect("readable").is_some());
        }

        tokio::time::advance(Duration::from_secs(4)).await;
        assert_eq!(cache.get("OSPK").await.expect("readable"), None);
        assert_eq!(cache.reads(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_entries_slide_out() {
        let cache = InMemorySharedCache::new();
        cache
            .set("LSPC", b"[]".to_vec(), SharedEntryOptions::default())
            .await
            .expect("stored");

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(cache.get("LSPC").await.expect("readable"), None);
    }

    #[tokio::test]
    async fn remove_drops_the_entry() {
        let cache = InMemorySharedCache::new();
        cache
            .set("k", vec![1], SharedEntryOptions::default())
            .await
            .expect("stored");
        cache.remove("k").await.expect("removed");
        assert_eq!(cache.get("k").await.expect("readable"), None);
    }
}
