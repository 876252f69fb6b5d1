//! Resilience pipeline wrapped around stock-service calls.
//!
//! Layers, outermost first:
//!
//! ```text
//! caller deadline ─▶ rate limiter ─▶ concurrency limiter ─▶ retry ─▶ circuit breaker ─▶ attempt timeout ─▶ call
//! ```
//!
//! Every layer is optional except retry and the attempt timeout. Calls are
//! assumed idempotent reads, so retrying them is always safe.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
use crate::retry::RetryConfig;
use crate::stock_client::FetchError;
use crate::throttling::{ConcurrencyConfig, ConcurrencyLimiter, RateLimitConfig, RateLimiter};

/// Why the pipeline gave up on a call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("rate limit exceeded and wait queue is full")]
    RateLimited,
    #[error("concurrency limit reached and wait queue is full")]
    Saturated,
    #[error("circuit breaker is open")]
    CircuitOpen,
    #[error("caller deadline elapsed before the call completed")]
    DeadlineExceeded,
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: FetchError },
    #[error("call failed without retry: {0}")]
    NonRetryable(FetchError),
}

/// Per-layer configuration. `None` disables a layer.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub rate_limit: Option<RateLimitConfig>,
    pub concurrency: Option<ConcurrencyConfig>,
    pub retry: RetryConfig,
    pub circuit_breaker: Option<CircuitBreakerConfig>,
    pub attempt_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            rate_limit: Some(RateLimitConfig::default()),
            concurrency: Some(ConcurrencyConfig::default()),
            retry: RetryConfig::default(),
            circuit_breaker: None,
            attempt_timeout: Duration::from_secs(5),
        }
    }
}

impl PipelineConfig {
    /// Retry and timeout only; no admission control.
    pub fn unthrottled() -> Self {
        Self {
            rate_limit: None,
            concurrency: None,
            ..Self::default()
        }
    }
}

/// Composed policy stack. One instance is shared process-wide so its limits
/// apply across all concurrent requests.
pub struct ResiliencePipeline {
    rate_limiter: Option<RateLimiter>,
    concurrency: Option<ConcurrencyLimiter>,
    circuit_breaker: Option<CircuitBreaker>,
    retry: RetryConfig,
    attempt_timeout: Duration,
}

impl ResiliencePipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            rate_limiter: config.rate_limit.as_ref().map(RateLimiter::new),
            concurrency: config.concurrency.as_ref().map(ConcurrencyLimiter::new),
            circuit_breaker: config.circuit_breaker.map(CircuitBreaker::new),
            retry: config.retry,
            attempt_timeout: config.attempt_timeout,
        }
    }

    pub fn circuit_breaker(&self) -> Option<&CircuitBreaker> {
        self.circuit_breaker.as_ref()
    }

    pub fn concurrency_limiter(&self) -> Option<&ConcurrencyLimiter> {
        self.concurrency.as_ref()
    }

    /// Runs `operation` through every layer.
    ///
    /// A `deadline` bounds the whole call, including time spent queued, so an
    /// abandoned caller releases its rate and concurrency slots.
    pub async fn execute<T, F, Fut>(
        &self,
        deadline: Option<Instant>,
        operation: F,
    ) -> Result<T, PipelineError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let guarded = self.run_layers(deadline, operation);
        match deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, guarded)
                .await
                .unwrap_or(Err(PipelineError::DeadlineExceeded)),
            None => guarded.await,
        }
    }

    async fn run_layers<T, F, Fut>(
        &self,
        deadline: Option<Instant>,
        operation: F,
    ) -> Result<T, PipelineError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        if let Some(rate_limiter) = &self.rate_limiter {
            rate_limiter.acquire().await?;
        }
        let _permit = match &self.concurrency {
            Some(limiter) => Some(limiter.acquire().await?),
            None => None,
        };
        self.retry_loop(deadline, operation).await
    }

    async fn retry_loop<T, F, Fut>(
        &self,
        deadline: Option<Instant>,
        mut operation: F,
    ) -> Result<T, PipelineError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let max_attempts = self.retry.max_attempts();
        let mut attempt = 0_u32;

        loop {
            attempt += 1;
            if let Some(breaker) = &self.circuit_breaker {
                breaker.try_enter()?;
            }

            let error = match self.attempt(deadline, operation()).await {
                Ok(value) => {
                    if let Some(breaker) = &self.circuit_breaker {
                        breaker.on_success();
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return Err(PipelineError::DeadlineExceeded);
            }

            let retryable = self.retry.should_retry(&error);
            if let Some(breaker) = &self.circuit_breaker {
                if error.is_transient() {
                    breaker.on_failure();
                }
            }
            if !retryable {
                // With retries switched off a transient failure still counts as exhaustion.
                if !self.retry.enabled && error.is_transient() {
                    return Err(PipelineError::Exhausted {
                        attempts: attempt,
                        last: error,
                    });
                }
                return Err(PipelineError::NonRetryable(error));
            }
            if attempt >= max_attempts {
                tracing::warn!(attempts = attempt, %error, "stock call retries exhausted");
                return Err(PipelineError::Exhausted {
                    attempts: attempt,
                    last: error,
                });
            }

            let delay = self.retry.delay_for_retry(attempt - 1);
            if deadline.is_some_and(|deadline| Instant::now() + delay >= deadline) {
                return Err(PipelineError::DeadlineExceeded);
            }
            tracing::warn!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                %error,
                "stock call failed; retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn attempt<T, Fut>(&self, deadline: Option<Instant>, call: Fut) -> Result<T, FetchError>
    where
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let budget = match deadline {
            Some(deadline) => self
                .attempt_timeout
                .min(deadline.saturating_duration_since(Instant::now())),
            None => self.attempt_timeout,
        };
        tokio::time::timeout(budget, call)
            .await
            .unwrap_or(Err(FetchError::Timeout))
    }
}
