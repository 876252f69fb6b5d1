//! Behaviour tests for the resilience pipeline around stock-service calls.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use stockflow_core::{
    CircuitBreakerConfig, CircuitState, ConcurrencyConfig, FetchError, HttpError,
    HttpStockClient, PipelineConfig, PipelineError, RateLimitConfig, ResiliencePipeline,
    ResilientStockClient, RetryConfig, StockLookup,
};
use stockflow_tests::{status_reply, stock_reply, ScriptedHttpClient};
use tokio::time::Instant;

fn client(http: Arc<ScriptedHttpClient>, config: PipelineConfig) -> ResilientStockClient {
    ResilientStockClient::new(
        HttpStockClient::new(http, "http://products.test"),
        Arc::new(ResiliencePipeline::new(config)),
    )
}

fn ids(values: &[u32]) -> BTreeSet<u32> {
    values.iter().copied().collect()
}

// =============================================================================
// Concurrency limiting
// =============================================================================

#[tokio::test(start_paused = true)]
async fn calls_beyond_slots_and_queue_fail_fast_with_saturation() {
    // Given: one slot, a queue of two, and a stock service that takes 1s
    let http = Arc::new(
        ScriptedHttpClient::always(stock_reply(r#"{"1":1}"#)).with_delay(Duration::from_secs(1)),
    );
    let client = client(
        http.clone(),
        PipelineConfig {
            concurrency: Some(ConcurrencyConfig {
                permit_limit: 1,
                queue_limit: 2,
            }),
            ..PipelineConfig::unthrottled()
        },
    );
    let products = ids(&[1]);

    // When: four calls are issued at once
    let (a, b, c, d) = tokio::join!(
        client.fetch_stock(&products, None),
        client.fetch_stock(&products, None),
        client.fetch_stock(&products, None),
        client.fetch_stock(&products, None),
    );

    // Then: three complete in turn and the fourth is rejected immediately
    assert!(a.is_ok() && b.is_ok() && c.is_ok());
    assert_eq!(d, Err(PipelineError::Saturated));
    assert_eq!(http.request_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn an_abandoned_caller_releases_its_slot() {
    // Given: one slot, no queue, and a slow stock service
    let http = Arc::new(
        ScriptedHttpClient::always(stock_reply(r#"{"1":1}"#)).with_delay(Duration::from_secs(3)),
    );
    let pipeline = Arc::new(ResiliencePipeline::new(PipelineConfig {
        concurrency: Some(ConcurrencyConfig {
            permit_limit: 1,
            queue_limit: 0,
        }),
        retry: RetryConfig::disabled(),
        ..PipelineConfig::unthrottled()
    }));
    let client = ResilientStockClient::new(
        HttpStockClient::new(http, "http://products.test"),
        pipeline.clone(),
    );
    let products = ids(&[1]);

    // When: the first caller gives up after 500ms
    let deadline = Instant::now() + Duration::from_millis(500);
    let first = client.fetch_stock(&products, Some(deadline)).await;

    // Then: it sees the deadline, its slot is back, and the next caller gets it
    assert_eq!(first, Err(PipelineError::DeadlineExceeded));
    assert_eq!(
        pipeline
            .concurrency_limiter()
            .map(|limiter| limiter.available_permits()),
        Some(1)
    );
    assert!(client.fetch_stock(&products, None).await.is_ok());
}

// =============================================================================
// Rate limiting
// =============================================================================

#[tokio::test]
async fn spent_window_budget_with_full_queue_is_rejected() {
    // Given: two calls per minute and no waiting room
    let http = Arc::new(ScriptedHttpClient::always(stock_reply(r#"{"1":1}"#)));
    let client = client(
        http.clone(),
        PipelineConfig {
            rate_limit: Some(RateLimitConfig {
                permit_limit: 2,
                window: Duration::from_secs(60),
                queue_limit: 0,
            }),
            ..PipelineConfig::unthrottled()
        },
    );
    let products = ids(&[1]);

    // When: three calls are made back to back
    let first = client.fetch_stock(&products, None).await;
    let second = client.fetch_stock(&products, None).await;
    let third = client.fetch_stock(&products, None).await;

    // Then: the third never reaches the stock service
    assert!(first.is_ok() && second.is_ok());
    assert_eq!(third, Err(PipelineError::RateLimited));
    assert_eq!(http.request_count(), 2);
}

// =============================================================================
// Timeouts and retries
// =============================================================================

#[tokio::test(start_paused = true)]
async fn slow_attempts_time_out_and_are_retried() {
    // Given: the stock service hangs for 10s on every call, attempts time out at 5s
    let http = Arc::new(
        ScriptedHttpClient::always(stock_reply(r#"{"1":1}"#)).with_delay(Duration::from_secs(10)),
    );
    let client = client(
        http.clone(),
        PipelineConfig {
            retry: RetryConfig::constant(Duration::from_millis(100), 2),
            ..PipelineConfig::unthrottled()
        },
    );

    // When: stock is fetched
    let result = client.fetch_stock(&ids(&[1]), None).await;

    // Then: three attempts timed out
    assert_eq!(
        result,
        Err(PipelineError::Exhausted {
            attempts: 3,
            last: FetchError::Timeout,
        })
    );
    assert_eq!(http.request_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn connection_errors_are_retried() {
    // Given: the first attempt cannot connect
    let http = Arc::new(ScriptedHttpClient::sequence(
        vec![Err(HttpError::connect("connection refused"))],
        stock_reply(r#"{"1":4}"#),
    ));
    let client = client(http.clone(), PipelineConfig::unthrottled());

    // When: stock is fetched
    let stocks = client.fetch_stock(&ids(&[1]), None).await.expect("recovered");

    // Then: the retry succeeded
    assert_eq!(stocks.get(&1).map(|stock| stock.stock), Some(4));
    assert_eq!(http.request_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn caller_deadline_cuts_the_retry_schedule_short() {
    // Given: a failing stock service and the default 2s initial backoff
    let http = Arc::new(ScriptedHttpClient::always(status_reply(500)));
    let client = client(http.clone(), PipelineConfig::unthrottled());

    // When: the caller allows only 1s
    let deadline = Instant::now() + Duration::from_secs(1);
    let result = client.fetch_stock(&ids(&[1]), Some(deadline)).await;

    // Then: the pipeline stops instead of sleeping past the deadline
    assert_eq!(result, Err(PipelineError::DeadlineExceeded));
    assert_eq!(http.request_count(), 1);
}

#[tokio::test]
async fn empty_product_set_makes_no_request() {
    // Given: any stock service
    let http = Arc::new(ScriptedHttpClient::always(status_reply(500)));
    let client = client(http.clone(), PipelineConfig::default());

    // When: no products are requested
    let stocks = client.fetch_stock(&BTreeSet::new(), None).await;

    // Then: the result is empty and nothing was sent
    assert_eq!(stocks.map(|stocks| stocks.len()), Ok(0));
    assert_eq!(http.request_count(), 0);
}

// =============================================================================
// Circuit breaker
// =============================================================================

#[tokio::test(start_paused = true)]
async fn repeated_failures_open_the_circuit_and_short_circuit_calls() {
    // Given: a breaker that opens after 3 consecutive failures
    let http = Arc::new(ScriptedHttpClient::always(status_reply(503)));
    let pipeline = Arc::new(ResiliencePipeline::new(PipelineConfig {
        retry: RetryConfig::disabled(),
        circuit_breaker: Some(CircuitBreakerConfig {
            failure_threshold: 3,
            break_duration: Duration::from_secs(30),
        }),
        ..PipelineConfig::unthrottled()
    }));
    let client = ResilientStockClient::new(
        HttpStockClient::new(http.clone(), "http://products.test"),
        pipeline.clone(),
    );
    let products = ids(&[1]);

    // When: three calls fail and a fourth is attempted
    for _ in 0..3 {
        let _ = client.fetch_stock(&products, None).await;
    }
    let fourth = client.fetch_stock(&products, None).await;

    // Then: the fourth is rejected without a request
    assert_eq!(fourth, Err(PipelineError::CircuitOpen));
    assert_eq!(http.request_count(), 3);
    assert_eq!(
        pipeline.circuit_breaker().map(|breaker| breaker.state()),
        Some(CircuitState::Open)
    );
}
