//! Order placement: fetch stock, verify, persist.
//!
//! ```text
//! Received ─▶ Verifying ─┬─▶ Rejected
//!                        └─▶ Persisting ─┬─▶ Created
//!                                        └─▶ Failed
//! ```
//!
//! The flow is single-pass. Transient stock-service failures are retried inside
//! the resilience pipeline; once it gives up the order is rejected, never
//! created without a stock check. Stock is not reserved, so two concurrent
//! orders may both pass verification against the same units.

use std::sync::Arc;

use thiserror::Error;
use tokio::time::Instant;

use crate::domain::{Order, OrderId, OrderRequest, ProductId};
use crate::pipeline::PipelineError;
use crate::stock_client::StockLookup;
use crate::store::OrderRepository;
use crate::verifier::StockVerifier;
use crate::{StoreError, ValidationError};

/// User-facing message for a stock rejection.
pub const INSUFFICIENT_STOCK_MESSAGE: &str =
    "Sorry, we can't process your order due to insufficient stock.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderState {
    Received,
    Verifying,
    Rejected,
    Persisting,
    Created,
    Failed,
}

impl OrderState {
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Received, Self::Verifying)
                | (Self::Received, Self::Rejected)
                | (Self::Verifying, Self::Rejected)
                | (Self::Verifying, Self::Persisting)
                | (Self::Persisting, Self::Created)
                | (Self::Persisting, Self::Failed)
        )
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Created | Self::Failed)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OrderError {
    #[error("{INSUFFICIENT_STOCK_MESSAGE}")]
    InsufficientStock { product_id: ProductId },

    #[error("stock could not be verified: {0}")]
    StockServiceUnavailable(#[from] PipelineError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("order {0} not found")]
    NotFound(OrderId),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for OrderError {
    fn from(error: StoreError) -> Self {
        Self::Internal(error.to_string())
    }
}

impl OrderError {
    /// Stable key used in problem responses.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InsufficientStock { .. } => "StockError",
            Self::StockServiceUnavailable(_) => "StockServiceUnavailable",
            Self::Validation(_) => "ValidationError",
            Self::NotFound(_) => "NotFound",
            Self::Internal(_) => "InternalError",
        }
    }

    pub const fn status_code(&self) -> u16 {
        match self {
            Self::InsufficientStock { .. } | Self::Validation(_) => 400,
            Self::NotFound(_) => 404,
            Self::StockServiceUnavailable(_) => 503,
            Self::Internal(_) => 500,
        }
    }
}

/// Identifier and resource path of a created order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderReceipt {
    pub order_id: OrderId,
    pub location: String,
}

impl OrderReceipt {
    fn for_order(order: &Order) -> Self {
        Self {
            order_id: order.id,
            location: format!("/api/orders/{}", order.id),
        }
    }
}

struct Transitions {
    state: OrderState,
}

impl Transitions {
    fn advance(&mut self, next: OrderState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal order transition {:?} -> {next:?}",
            self.state
        );
        tracing::debug!(from = ?self.state, to = ?next, "order state transition");
        self.state = next;
    }
}

pub struct OrderOrchestrator {
    stock: Arc<dyn StockLookup>,
    verifier: StockVerifier,
    orders: Arc<dyn OrderRepository>,
}

impl OrderOrchestrator {
    pub fn new(
        stock: Arc<dyn StockLookup>,
        verifier: StockVerifier,
        orders: Arc<dyn OrderRepository>,
    ) -> Self {
        Self {
            stock,
            verifier,
            orders,
        }
    }

    /// Verifies stock for every line and persists the order if all pass.
    ///
    /// `deadline` bounds the stock fetch, including time queued in the pipeline.
    pub async fn place_order(
        &self,
        request: &OrderRequest,
        deadline: Option<Instant>,
    ) -> Result<OrderReceipt, OrderError> {
        let mut flow = Transitions {
            state: OrderState::Received,
        };

        if let Err(error) = request.validate() {
            flow.advance(OrderState::Rejected);
            return Err(error.into());
        }

        flow.advance(OrderState::Verifying);
        let product_ids = request.product_ids();
        let stocks = match self.stock.fetch_stock(&product_ids, deadline).await {
            Ok(stocks) => stocks,
            Err(error) => {
                tracing::warn!(%error, "stock verification unavailable; rejecting order");
                flow.advance(OrderState::Rejected);
                return Err(OrderError::StockServiceUnavailable(error));
            }
        };

        if let Some(shortfall) = self.verifier.first_shortfall(&request.order_items, &stocks) {
            tracing::info!(
                product_id = shortfall.product_id,
                requested = shortfall.requested,
                available = ?shortfall.available,
                "insufficient stock; rejecting order"
            );
            flow.advance(OrderState::Rejected);
            return Err(OrderError::InsufficientStock {
                product_id: shortfall.product_id,
            });
        }

        flow.advance(OrderState::Persisting);
        match self.orders.create_order(request.order_items.clone()).await {
            Ok(order) => {
                flow.advance(OrderState::Created);
                tracing::info!(order_id = order.id, "order created");
                Ok(OrderReceipt::for_order(&order))
            }
            Err(error) => {
                flow.advance(OrderState::Failed);
                tracing::error!(%error, "order persistence failed");
                Err(error.into())
            }
        }
    }

    pub async fn get_order(&self, id: OrderId) -> Result<Order, OrderError> {
        self.orders
            .get_order(id)
            .await?
            .ok_or(OrderError::NotFound(id))
    }
}
