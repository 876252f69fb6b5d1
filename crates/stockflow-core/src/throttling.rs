//! Admission control for outbound calls: a window rate limiter and a
//! concurrency limiter, both with a bounded wait queue.

use std::num::NonZeroU32;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::Quota;
use tokio::sync::{Semaphore, SemaphorePermit};

use crate::pipeline::PipelineError;

type DirectRateLimiter = governor::RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Window budget for outbound calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Calls admitted per window.
    pub permit_limit: u32,
    pub window: Duration,
    /// Callers allowed to wait for budget once the window is spent.
    pub queue_limit: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            permit_limit: 2,
            window: Duration::from_secs(60),
            queue_limit: 10,
        }
    }
}

/// Bound on simultaneous in-flight calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConcurrencyConfig {
    pub permit_limit: usize,
    pub queue_limit: usize,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            permit_limit: 1,
            queue_limit: 2,
        }
    }
}

/// Reservation of one wait-queue position, released on drop.
struct QueueSlot<'a> {
    occupied: &'a AtomicUsize,
}

impl<'a> QueueSlot<'a> {
    fn claim(occupied: &'a AtomicUsize, limit: usize) -> Option<Self> {
        occupied
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current < limit).then_some(current + 1)
            })
            .ok()
            .map(|_| Self { occupied })
    }
}

impl Drop for QueueSlot<'_> {
    fn drop(&mut self) {
        self.occupied.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Rate limiter spreading `permit_limit` calls across `window`.
///
/// Callers that find the budget spent wait in a bounded queue; once the queue
/// is full they are rejected immediately with [`PipelineError::RateLimited`].
#[derive(Clone)]
pub struct RateLimiter {
    limiter: Arc<DirectRateLimiter>,
    queued: Arc<AtomicUsize>,
    queue_limit: usize,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            limiter: Arc::new(governor::RateLimiter::direct(quota_from_window(
                config.window,
                config.permit_limit,
            ))),
            queued: Arc::new(AtomicUsize::new(0)),
            queue_limit: config.queue_limit,
        }
    }

    pub async fn acquire(&self) -> Result<(), PipelineError> {
        if self.limiter.check().is_ok() {
            return Ok(());
        }

        let Some(_slot) = QueueSlot::claim(&self.queued, self.queue_limit) else {
            tracing::warn!(
                queue_limit = self.queue_limit,
                "rate limit queue is full; rejecting call"
            );
            return Err(PipelineError::RateLimited);
        };
        tracing::debug!(queued = self.queued(), "rate budget spent; waiting for next permit");
        self.limiter.until_ready().await;
        Ok(())
    }

    /// Callers currently waiting for budget.
    pub fn queued(&self) -> usize {
        self.queued.load(Ordering::Acquire)
    }
}

fn quota_from_window(window: Duration, permit_limit: u32) -> Quota {
    let burst = NonZeroU32::new(permit_limit).unwrap_or(NonZeroU32::MIN);
    let seconds_per_permit = (window.as_secs_f64() / f64::from(burst.get())).max(0.001);

    Quota::with_period(Duration::from_secs_f64(seconds_per_permit))
        .unwrap_or_else(|| Quota::per_second(burst))
        .allow_burst(burst)
}

/// Bulkhead limiting simultaneous calls, with a bounded wait queue.
#[derive(Debug)]
pub struct ConcurrencyLimiter {
    semaphore: Semaphore,
    queued: AtomicUsize,
    queue_limit: usize,
}

impl ConcurrencyLimiter {
    pub fn new(config: &ConcurrencyConfig) -> Self {
        Self {
            semaphore: Semaphore::new(config.permit_limit.max(1)),
            queued: AtomicUsize::new(0),
            queue_limit: config.queue_limit,
        }
    }

    /// Takes a slot, waiting in the queue if one is free; the slot is held until
    /// the returned permit is dropped.
    pub async fn acquire(&self) -> Result<SemaphorePermit<'_>, PipelineError> {
        if let Ok(permit) = self.semaphore.try_acquire() {
            return Ok(permit);
        }

        let Some(_slot) = QueueSlot::claim(&self.queued, self.queue_limit) else {
            tracing::warn!(
                queue_limit = self.queue_limit,
                "concurrency limit saturated; rejecting call"
            );
            return Err(PipelineError::Saturated);
        };
        self.semaphore
            .acquire()
            .await
            .map_err(|_| PipelineError::Saturated)
    }

    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn queued(&self) -> usize {
        self.queued.load(Ordering::Acquire)
    }
}
