//! Derived product collections served through [`TieredCache`].

use std::sync::Arc;

use crate::cache::TieredCache;
use crate::domain::Product;
use crate::store::ProductStore;
use crate::StoreError;

/// Named derived view over the product catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProductView {
    /// Products at or below the low-water mark.
    LimitedStock,
    /// Products above the high-water mark.
    Overstocked,
}

impl ProductView {
    pub const ALL: [Self; 2] = [Self::LimitedStock, Self::Overstocked];

    pub const fn cache_key(self) -> &'static str {
        match self {
            Self::LimitedStock => "LSPC",
            Self::Overstocked => "OSPK",
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::LimitedStock => "limited-stock",
            Self::Overstocked => "overstocked",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewThresholds {
    /// Stock at or below this is limited.
    pub limited_stock_max: u32,
    /// Stock strictly above this is overstocked.
    pub overstocked_above: u32,
}

impl Default for ViewThresholds {
    fn default() -> Self {
        Self {
            limited_stock_max: 30,
            overstocked_above: 100,
        }
    }
}

impl ViewThresholds {
    pub fn includes(&self, view: ProductView, product: &Product) -> bool {
        match view {
            ProductView::LimitedStock => product.stock <= self.limited_stock_max,
            ProductView::Overstocked => product.stock > self.overstocked_above,
        }
    }
}

pub struct ProductViews {
    store: Arc<dyn ProductStore>,
    cache: TieredCache<Vec<Product>>,
    thresholds: ViewThresholds,
}

impl ProductViews {
    pub fn new(
        store: Arc<dyn ProductStore>,
        cache: TieredCache<Vec<Product>>,
        thresholds: ViewThresholds,
    ) -> Self {
        Self {
            store,
            cache: cache.with_size_hint(|products| Some(products.len() as u64)),
            thresholds,
        }
    }

    pub async fn get(&self, view: ProductView) -> Result<Arc<Vec<Product>>, StoreError> {
        let products = self
            .cache
            .get_or_compute(view.cache_key(), || self.compute(view))
            .await?;

        let stats = self.cache.local_stats();
        tracing::info!(
            view = view.name(),
            total_hits = stats.total_hits,
            estimated_size = stats.current_estimated_size,
            "local cache statistics"
        );
        Ok(products)
    }

    pub async fn limited_stock(&self) -> Result<Arc<Vec<Product>>, StoreError> {
        self.get(ProductView::LimitedStock).await
    }

    pub async fn overstocked(&self) -> Result<Arc<Vec<Product>>, StoreError> {
        self.get(ProductView::Overstocked).await
    }

    /// Drops every view from both tiers after a catalogue write.
    pub async fn invalidate_all(&self) {
        for view in ProductView::ALL {
            self.cache.invalidate(view.cache_key()).await;
        }
    }

    pub fn cache(&self) -> &TieredCache<Vec<Product>> {
        &self.cache
    }

    async fn compute(&self, view: ProductView) -> Result<Vec<Product>, StoreError> {
        let products = self.store.list_products().await?;
        Ok(products
            .into_iter()
            .filter(|product| self.thresholds.includes(view, product))
            .collect())
    }
}
