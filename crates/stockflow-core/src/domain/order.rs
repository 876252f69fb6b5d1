use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::ProductId;
use crate::ValidationError;

/// Identifier assigned to a persisted order.
pub type OrderId = u64;

/// One requested line of an incoming order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl OrderItemRequest {
    pub fn new(product_id: ProductId, quantity: u32) -> Result<Self, ValidationError> {
        let item = Self {
            product_id,
            quantity,
        };
        item.validate()?;
        Ok(item)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.product_id == 0 {
            return Err(ValidationError::InvalidProductId);
        }
        if self.quantity == 0 {
            return Err(ValidationError::ZeroQuantity {
                product_id: self.product_id,
            });
        }
        Ok(())
    }
}

/// Incoming order payload.
///
/// Lines may repeat a product id; each line is kept as received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub order_items: Vec<OrderItemRequest>,
}

impl OrderRequest {
    pub fn new(order_items: Vec<OrderItemRequest>) -> Result<Self, ValidationError> {
        let request = Self { order_items };
        request.validate()?;
        Ok(request)
    }

    /// Validates a payload that arrived through deserialization.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.order_items.is_empty() {
            return Err(ValidationError::EmptyOrder);
        }
        self.order_items
            .iter()
            .try_for_each(OrderItemRequest::validate)
    }

    /// Deduplicated set of every product referenced by the order.
    pub fn product_ids(&self) -> BTreeSet<ProductId> {
        self.order_items
            .iter()
            .map(|item| item.product_id)
            .collect()
    }
}

/// Persisted order record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub order_items: Vec<OrderItemRequest>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
