//! Typed client for the Products service stock query.
//!
//! Wire contract:
//!
//! ```text
//! POST {base}/api/products/stocks
//! {"productIds": [7, 9]}
//!
//! 200 OK
//! {"7": 3, "9": 12}
//! ```
//!
//! Unknown products are omitted from the response. All identifiers travel in
//! one request. Results are never cached here: verification needs fresh stock.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;

use crate::domain::{ProductId, ProductStock, StockMap};
use crate::http_client::{HttpClient, HttpError, HttpErrorKind, HttpRequest};
use crate::pipeline::{PipelineError, ResiliencePipeline};
use crate::BoxFuture;

/// Route of the batch stock query on the Products service.
pub const STOCK_QUERY_PATH: &str = "/api/products/stocks";

/// Single stock-fetch failure, before any retry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("stock request timed out")]
    Timeout,
    #[error("connection to stock service failed: {0}")]
    Connection(String),
    #[error("stock service returned server error status {status}")]
    Server { status: u16 },
    #[error("stock service rejected the request with status {status}")]
    Client { status: u16 },
    #[error("stock service returned a malformed body: {0}")]
    Malformed(String),
}

impl FetchError {
    /// Failures that may succeed if the same call is made again.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::Connection(_) | Self::Server { .. })
    }
}

impl From<HttpError> for FetchError {
    fn from(error: HttpError) -> Self {
        match error.kind() {
            HttpErrorKind::Timeout => Self::Timeout,
            HttpErrorKind::Connect | HttpErrorKind::Other => {
                Self::Connection(error.message().to_owned())
            }
        }
    }
}

/// Request body of the stock query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockQuery {
    pub product_ids: Vec<ProductId>,
}

/// Response body of the stock query: product id to stock count.
pub type StockQueryResponse = BTreeMap<ProductId, u32>;

/// Bare HTTP stock client. Each call is exactly one outbound request.
#[derive(Clone)]
pub struct HttpStockClient {
    http: Arc<dyn HttpClient>,
    base_url: String,
    request_timeout: Duration,
}

impl HttpStockClient {
    pub fn new(http: Arc<dyn HttpClient>, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            request_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> String {
        format!("{}{STOCK_QUERY_PATH}", self.base_url)
    }

    pub async fn fetch_stock(
        &self,
        product_ids: &BTreeSet<ProductId>,
    ) -> Result<StockMap, FetchError> {
        if product_ids.is_empty() {
            return Ok(StockMap::new());
        }

        let query = StockQuery {
            product_ids: product_ids.iter().copied().collect(),
        };
        let body = serde_json::to_string(&query)
            .map_err(|error| FetchError::Malformed(format!("could not encode query: {error}")))?;
        let request = HttpRequest::post(self.endpoint())
            .with_json_body(body)
            .with_timeout(self.request_timeout);

        let response = self.http.execute(request).await?;
        if response.is_server_error() {
            return Err(FetchError::Server {
                status: response.status,
            });
        }
        if !response.is_success() {
            return Err(FetchError::Client {
                status: response.status,
            });
        }

        let counts: StockQueryResponse = serde_json::from_str(&response.body)
            .map_err(|error| FetchError::Malformed(error.to_string()))?;
        Ok(counts
            .into_iter()
            .filter(|(product_id, _)| product_ids.contains(product_id))
            .map(|(product_id, stock)| (product_id, ProductStock::new(product_id, stock)))
            .collect())
    }
}

/// Stock lookup as seen by order placement.
pub trait StockLookup: Send + Sync {
    fn fetch_stock<'a>(
        &'a self,
        product_ids: &'a BTreeSet<ProductId>,
        deadline: Option<Instant>,
    ) -> BoxFuture<'a, Result<StockMap, PipelineError>>;
}

/// [`HttpStockClient`] behind a [`ResiliencePipeline`].
#[derive(Clone)]
pub struct ResilientStockClient {
    client: HttpStockClient,
    pipeline: Arc<ResiliencePipeline>,
}

impl ResilientStockClient {
    pub fn new(client: HttpStockClient, pipeline: Arc<ResiliencePipeline>) -> Self {
        Self { client, pipeline }
    }
}

impl StockLookup for ResilientStockClient {
    fn fetch_stock<'a>(
        &'a self,
        product_ids: &'a BTreeSet<ProductId>,
        deadline: Option<Instant>,
    ) -> BoxFuture<'a, Result<StockMap, PipelineError>> {
        Box::pin(async move {
            if product_ids.is_empty() {
                return Ok(StockMap::new());
            }
            self.pipeline
                .execute(deadline, || self.client.fetch_stock(product_ids))
                .await
        })
    }
}
