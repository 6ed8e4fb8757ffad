//! Client-side request pacing
//!
//! Two independent mechanisms live here:
//!
//! - [`ConcurrencyGate`] bounds how many logical requests of one async
//!   session are in flight at once (`maximum_concurrent_requests`).
//! - [`RateLimiter`] is an optional governor token bucket that spaces out
//!   individual attempts (`requests_per_second`), usable from both modes.

use crate::error::{Error, Result};
use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as Governor};
use std::num::NonZeroU32;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

// ============================================================================
// Concurrency Gate
// ============================================================================

/// Bounds the number of concurrently executing requests
#[derive(Debug, Clone)]
pub struct ConcurrencyGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl ConcurrencyGate {
    /// Create a gate with `capacity` slots (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Wait for a free slot
    ///
    /// The slot is released when the returned permit is dropped, on every
    /// exit path including cancellation of the awaiting future.
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit> {
        Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| Error::config("concurrency gate closed"))
    }

    /// Configured number of slots
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently held
    pub fn in_flight(&self) -> usize {
        self.capacity - self.semaphore.available_permits()
    }
}

// ============================================================================
// Token Bucket
// ============================================================================

/// Token bucket rate limiter
#[derive(Clone)]
pub struct RateLimiter {
    limiter: Arc<Governor<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>>,
}

impl RateLimiter {
    /// Allow `requests_per_second` attempts per second with an equal burst
    pub fn per_second(requests_per_second: u32) -> Self {
        let rate = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        Self {
            limiter: Arc::new(Governor::direct(Quota::per_second(rate))),
        }
    }

    /// Wait until an attempt can be made
    pub async fn wait(&self) {
        self.limiter.until_ready().await;
    }

    /// Block the current thread until an attempt can be made
    pub fn wait_blocking(&self) {
        futures::executor::block_on(self.limiter.until_ready());
    }

    /// Try to take a token without waiting
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter").finish()
    }
}
