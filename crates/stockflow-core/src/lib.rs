//! # Stockflow Core
//!
//! Order placement with cross-service stock verification, and cached derived
//! product views.
//!
//! ## Overview
//!
//! - **Stock client** batching every product of an order into one HTTP query
//! - **Resilience pipeline** with rate limiting, concurrency limiting, retry,
//!   an optional circuit breaker, and per-attempt timeouts
//! - **Stock verifier** deciding whether fetched stock covers an order
//! - **Order orchestrator** sequencing fetch, verification, and persistence
//! - **Tiered cache** serving limited-stock and overstocked views
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`domain`] | Products, stock snapshots, orders |
//! | [`http_client`] | Transport contract and reqwest implementation |
//! | [`stock_client`] | Batch stock query and its resilient wrapper |
//! | [`pipeline`] | Policy stack around stock calls |
//! | [`retry`] | Backoff and retry classification |
//! | [`throttling`] | Rate and concurrency limiters with bounded queues |
//! | [`circuit_breaker`] | Consecutive-failure breaker |
//! | [`verifier`] | Stock sufficiency checks |
//! | [`orchestrator`] | Order state machine and error taxonomy |
//! | [`cache`] | Local and shared tiers, tiered cache-aside |
//! | [`views`] | Limited-stock and overstocked views |
//! | [`store`] | Order and product persistence traits |

pub mod cache;
pub mod circuit_breaker;
pub mod domain;
pub mod error;
pub mod http_client;
pub mod orchestrator;
pub mod pipeline;
pub mod retry;
pub mod stock_client;
pub mod store;
pub mod throttling;
pub mod verifier;
pub mod views;

use std::future::Future;
use std::pin::Pin;

/// Boxed `Send` future returned by the object-safe traits in this crate.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub use cache::{
    CacheError, InMemorySharedCache, LocalCacheConfig, LocalCacheStats, LocalEntryOptions,
    SharedCache, SharedEntryOptions, TierPolicy, TieredCache, TieredCacheStats,
};
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use domain::{
    NewProduct, Order, OrderId, OrderItemRequest, OrderRequest, Product, ProductId, ProductStock,
    StockMap,
};
pub use error::{StoreError, ValidationError};
pub use http_client::{HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient};
pub use orchestrator::{
    OrderError, OrderOrchestrator, OrderReceipt, OrderState, INSUFFICIENT_STOCK_MESSAGE,
};
pub use pipeline::{PipelineConfig, PipelineError, ResiliencePipeline};
pub use retry::{Backoff, RetryConfig};
pub use stock_client::{FetchError, HttpStockClient, ResilientStockClient, StockLookup};
pub use store::{InMemoryOrderRepository, InMemoryProductStore, OrderRepository, ProductStore};
pub use throttling::{ConcurrencyConfig, RateLimitConfig};
pub use verifier::{StockVerifier, VerificationMode};
pub use views::{ProductView, ProductViews, ViewThresholds};
