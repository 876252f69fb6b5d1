use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::domain::{Order, OrderId, OrderItemRequest};
use crate::{BoxFuture, StoreError};

/// Create/read persistence for orders.
pub trait OrderRepository: Send + Sync {
    fn create_order<'a>(
        &'a self,
        items: Vec<OrderItemRequest>,
    ) -> BoxFuture<'a, Result<Order, StoreError>>;

    fn get_order<'a>(&'a self, id: OrderId) -> BoxFuture<'a, Result<Option<Order>, StoreError>>;
}

#[derive(Debug)]
pub struct InMemoryOrderRepository {
    orders: RwLock<BTreeMap<OrderId, Order>>,
    next_id: AtomicU64,
}

impl Default for InMemoryOrderRepository {
    fn default() -> Self {
        Self {
            orders: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.orders.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.orders.read().await.is_empty()
    }
}

impl OrderRepository for InMemoryOrderRepository {
    fn create_order<'a>(
        &'a self,
        items: Vec<OrderItemRequest>,
    ) -> BoxFuture<'a, Result<Order, StoreError>> {
        Box::pin(async move {
            let order = Order {
                id: self.next_id.fetch_add(1, Ordering::Relaxed),
                order_items: items,
                created_at: OffsetDateTime::now_utc(),
            };
            self.orders.write().await.insert(order.id, order.clone());
            Ok(order)
        })
    }

    fn get_order<'a>(&'a self, id: OrderId) -> BoxFuture<'a, Result<Option<Order>, StoreError>> {
        Box::pin(async move { Ok(self.orders.read().await.get(&id).cloned()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn created_orders_get_sequential_ids_and_can_be_read_back() {
        let repository = InMemoryOrderRepository::new();
        let items = vec![OrderItemRequest {
            product_id: 7,
            quantity: 2,
        }];

        let first = repository.create_order(items.clone()).await.expect("created");
        let second = repository.create_order(items.clone()).await.expect("created");

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(
            repository.get_order(1).await.expect("readable"),
            Some(first)
        );
        assert_eq!(repository.get_order(99).await.expect("readable"), None);
        assert_eq!(repository.len().await, 2);
    }
}
