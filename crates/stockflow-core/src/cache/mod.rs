//! Two-tier cache-aside for derived product views.
//!
//! | Tier | Storage | Default expiry |
//! |------|---------|----------------|
//! | local | live values in this process | sliding 120s |
//! | shared | serialized bytes, visible to all instances | sliding 5s, absolute 20s |
//!
//! The tiers hold independent copies and expire independently.

mod local;
mod shared;
mod tiered;

pub use local::{LocalCache, LocalCacheConfig, LocalCacheStats, LocalEntryOptions};
pub use shared::{CacheError, InMemorySharedCache, SharedCache, SharedEntryOptions};
pub use tiered::{TierPolicy, TieredCache, TieredCacheStats};
