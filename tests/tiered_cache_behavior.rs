//! Behaviour tests for the tiered product-view cache.

use std::sync::Arc;
use std::time::Duration;

use stockflow_core::{
    InMemoryProductStore, InMemorySharedCache, LocalCacheConfig, Product, ProductStore,
    ProductView, ProductViews, SharedCache, SharedEntryOptions, TierPolicy, TieredCache,
    ViewThresholds,
};
use stockflow_tests::product;

fn views_over(
    store: Arc<dyn ProductStore>,
    shared: Arc<InMemorySharedCache>,
    local: LocalCacheConfig,
) -> ProductViews {
    ProductViews::new(
        store,
        TieredCache::new(local, shared, TierPolicy::default()),
        ViewThresholds::default(),
    )
}

fn store_with(products: Vec<Product>) -> Arc<InMemoryProductStore> {
    Arc::new(InMemoryProductStore::with_products(products))
}

// =============================================================================
// Tier precedence
// =============================================================================

#[tokio::test(start_paused = true)]
async fn shared_tier_serves_a_cold_instance_without_touching_the_store() {
    // Given: an empty store and a shared tier holding an overstocked list
    let shared = Arc::new(InMemorySharedCache::new());
    let seeded = vec![product(42, 250)];
    shared
        .set(
            ProductView::Overstocked.cache_key(),
            serde_json::to_vec(&seeded).expect("encode"),
            SharedEntryOptions::default(),
        )
        .await
        .expect("seeded");
    let views = views_over(store_with(Vec::new()), shared.clone(), LocalCacheConfig::default());

    // When: the overstocked view is read twice
    let first = views.overstocked().await.expect("served");
    let second = views.overstocked().await.expect("served");

    // Then: both reads return the shared list and only the first reached the shared tier
    assert_eq!(*first, seeded);
    assert_eq!(*second, seeded);
    assert_eq!(shared.reads(), 1);
    let stats = views.cache().stats();
    assert_eq!(stats.shared_hits, 1);
    assert_eq!(stats.local_hits, 1);
    assert_eq!(stats.recomputes, 0);
}

#[tokio::test(start_paused = true)]
async fn repeated_reads_within_the_sliding_window_hit_locally() {
    // Given: a store with limited-stock products
    let views = views_over(
        store_with(vec![product(1, 3), product(2, 300)]),
        Arc::new(InMemorySharedCache::new()),
        LocalCacheConfig::default(),
    );

    // When: the limited-stock view is read twice, 60s apart
    let first = views.limited_stock().await.expect("computed");
    tokio::time::advance(Duration::from_secs(60)).await;
    let second = views.limited_stock().await.expect("cached");

    // Then: the values are identical and only the hit counter moved
    assert_eq!(first, second);
    let stats = views.cache().stats();
    assert_eq!(stats.recomputes, 1);
    assert_eq!(stats.local_hits, 1);
    assert_eq!(views.cache().local_stats().total_hits, 1);
}

// =============================================================================
// Multiple instances sharing a tier
// =============================================================================

#[tokio::test(start_paused = true)]
async fn second_instance_reuses_the_shared_copy_until_it_expires() {
    // Given: two instances over the same store and shared tier
    let store = store_with(vec![product(1, 500)]);
    let shared = Arc::new(InMemorySharedCache::new());
    let first = views_over(store.clone(), shared.clone(), LocalCacheConfig::default());
    let second = views_over(store.clone(), shared.clone(), LocalCacheConfig::default());
    let third = views_over(store, shared, LocalCacheConfig::default());

    // When: the first computes, the second reads at once, the third after 6s idle
    first.overstocked().await.expect("computed");
    second.overstocked().await.expect("from shared");
    tokio::time::advance(Duration::from_secs(6)).await;
    third.overstocked().await.expect("recomputed");

    // Then: the second hit the shared tier and the third found it slid out
    assert_eq!(second.cache().stats().shared_hits, 1);
    assert_eq!(second.cache().stats().recomputes, 0);
    assert_eq!(third.cache().stats().recomputes, 1);
}

#[tokio::test(start_paused = true)]
async fn invalidation_is_local_to_the_writing_instance() {
    // Given: two instances that both cached the limited-stock view
    let store = store_with(vec![product(1, 10)]);
    let shared = Arc::new(InMemorySharedCache::new());
    let writer = views_over(store.clone(), shared.clone(), LocalCacheConfig::default());
    let reader = views_over(store.clone(), shared, LocalCacheConfig::default());
    writer.limited_stock().await.expect("computed");
    reader.limited_stock().await.expect("from shared");

    // When: the writer restocks product 1 and invalidates its views
    store
        .update_product(product(1, 400))
        .await
        .expect("updated");
    writer.invalidate_all().await;

    // Then: the writer sees the change at once, the reader after its local window
    assert!(writer.limited_stock().await.expect("fresh").is_empty());
    assert_eq!(reader.limited_stock().await.expect("stale").len(), 1);

    tokio::time::advance(Duration::from_secs(121)).await;
    assert!(reader.limited_stock().await.expect("fresh").is_empty());
}

// =============================================================================
// Capacity and faults
// =============================================================================

#[tokio::test(start_paused = true)]
async fn views_larger_than_local_capacity_bypass_the_local_tier() {
    // Given: a local tier that holds two product entries
    let shared = Arc::new(InMemorySharedCache::new());
    let views = views_over(
        store_with(vec![product(1, 1), product(2, 2), product(3, 3)]),
        shared.clone(),
        LocalCacheConfig { size_limit: Some(2) },
    );

    // When: a three-product view is read twice
    views.limited_stock().await.expect("computed");
    views.limited_stock().await.expect("from shared");

    // Then: the second read came from the shared tier
    assert_eq!(views.cache().local_stats().entry_count, 0);
    assert_eq!(views.cache().stats().shared_hits, 1);
    assert_eq!(shared.reads(), 2);
}

#[tokio::test(start_paused = true)]
async fn corrupt_shared_entry_falls_back_to_the_store() {
    // Given: garbage under the overstocked key
    let shared = Arc::new(InMemorySharedCache::new());
    shared
        .set(
            ProductView::Overstocked.cache_key(),
            b"{\"truncated".to_vec(),
            SharedEntryOptions::default(),
        )
        .await
        .expect("seeded");
    let views = views_over(
        store_with(vec![product(9, 101)]),
        shared,
        LocalCacheConfig::default(),
    );

    // When: the view is read
    let products = views.overstocked().await.expect("recomputed");

    // Then: the store result is served and the fault is counted
    assert_eq!(products.len(), 1);
    assert_eq!(views.cache().stats().shared_faults, 1);
}
