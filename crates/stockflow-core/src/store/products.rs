use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::RwLock;

use crate::domain::{NewProduct, Product, ProductId, ProductStock};
use crate::{BoxFuture, StoreError};

/// Authoritative product catalogue and stock counts.
pub trait ProductStore: Send + Sync {
    fn list_products<'a>(&'a self) -> BoxFuture<'a, Result<Vec<Product>, StoreError>>;

    fn list_by_category<'a>(
        &'a self,
        category_id: u32,
    ) -> BoxFuture<'a, Result<Vec<Product>, StoreError>>;

    fn get_product<'a>(&'a self, id: ProductId)
        -> BoxFuture<'a, Result<Option<Product>, StoreError>>;

    fn add_product<'a>(&'a self, product: NewProduct) -> BoxFuture<'a, Result<Product, StoreError>>;

    /// Replaces an existing product; fails with [`StoreError::NotFound`] otherwise.
    fn update_product<'a>(&'a self, product: Product) -> BoxFuture<'a, Result<Product, StoreError>>;

    /// Returns whether a product was removed.
    fn delete_product<'a>(&'a self, id: ProductId) -> BoxFuture<'a, Result<bool, StoreError>>;

    fn product_exists<'a>(&'a self, id: ProductId) -> BoxFuture<'a, Result<bool, StoreError>>;

    /// Stock for the requested products; unknown ids are skipped.
    fn product_stocks<'a>(
        &'a self,
        ids: &'a [ProductId],
    ) -> BoxFuture<'a, Result<Vec<ProductStock>, StoreError>>;
}

#[derive(Debug)]
pub struct InMemoryProductStore {
    products: RwLock<BTreeMap<ProductId, Product>>,
    next_id: AtomicU64,
}

impl Default for InMemoryProductStore {
    fn default() -> Self {
        Self::with_products(Vec::new())
    }
}

impl InMemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the catalogue; new products get ids above the highest seeded id.
    pub fn with_products(products: Vec<Product>) -> Self {
        let highest = products.iter().map(|product| product.id).max().unwrap_or(0);
        Self {
            products: RwLock::new(
                products
                    .into_iter()
                    .map(|product| (product.id, product))
                    .collect(),
            ),
            next_id: AtomicU64::new(u64::from(highest) + 1),
        }
    }
}

impl ProductStore for InMemoryProductStore {
    fn list_products<'a>(&'a self) -> BoxFuture<'a, Result<Vec<Product>, StoreError>> {
        Box::pin(async move { Ok(self.products.read().await.values().cloned().collect()) })
    }

    fn list_by_category<'a>(
        &'a self,
        category_id: u32,
    ) -> BoxFuture<'a, Result<Vec<Product>, StoreError>> {
        Box::pin(async move {
            Ok(self
                .products
                .read()
                .await
                .values()
                .filter(|product| product.category_id == category_id)
                .cloned()
                .collect())
        })
    }

    fn get_product<'a>(
        &'a self,
        id: ProductId,
    ) -> BoxFuture<'a, Result<Option<Product>, StoreError>> {
        Box::pin(async move { Ok(self.products.read().await.get(&id).cloned()) })
    }

    fn add_product<'a>(
        &'a self,
        product: NewProduct,
    ) -> BoxFuture<'a, Result<Product, StoreError>> {
        Box::pin(async move {
            let id = ProductId::try_from(self.next_id.fetch_add(1, Ordering::Relaxed))
                .map_err(|_| StoreError::Backend(String::from("product id space exhausted")))?;
            let product = product.into_product(id);
            self.products.write().await.insert(id, product.clone());
            Ok(product)
        })
    }

    fn update_product<'a>(
        &'a self,
        product: Product,
    ) -> BoxFuture<'a, Result<Product, StoreError>> {
        Box::pin(async move {
            let mut products = self.products.write().await;
            let Some(existing) = products.get_mut(&product.id) else {
                return Err(StoreError::NotFound(format!("product {}", product.id)));
            };
            *existing = product.clone();
            Ok(product)
        })
    }

    fn delete_product<'a>(&'a self, id: ProductId) -> BoxFuture<'a, Result<bool, StoreError>> {
        Box::pin(async move { Ok(self.products.write().await.remove(&id).is_some()) })
    }

    fn product_exists<'a>(&'a self, id: ProductId) -> BoxFuture<'a, Result<bool, StoreError>> {
        Box::pin(async move { Ok(self.products.read().await.contains_key(&id)) })
    }

    fn product_stocks<'a>(
        &'a self,
        ids: &'a [ProductId],
    ) -> BoxFuture<'a, Result<Vec<ProductStock>, StoreError>> {
        Box::pin(async move {
            let products = self.products.read().await;
            Ok(ids
                .iter()
                .filter_map(|id| products.get(id))
                .map(Product::stock_snapshot)
                .collect())
        })
    }
}
