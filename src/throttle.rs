//! Request pacing for the external APIs

use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::trace;

/// Enforces a minimum interval between consecutive calls
#[derive(Clone)]
pub struct Pacer {
    inner: Arc<Mutex<PacerInner>>,
}

struct PacerInner {
    last: Option<Instant>,
    min_interval: Duration,
}

impl Pacer {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(PacerInner {
                last: None,
                min_interval,
            })),
        }
    }

    /// Wait until `min_interval` has passed since the previous call.
    /// The first call never waits.
    pub async fn wait(&self) {
        let mut inner = self.inner.lock().await;

        if let Some(last) = inner.last {
            let elapsed = last.elapsed();
            if elapsed < inner.min_interval {
                let wait_time = inner.min_interval - elapsed;
                trace!("Pacing: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        inner.last = Some(Instant::now());
    }
}

/// Requests-per-second cap shared by all YouTube API calls
pub struct QuotaLimiter {
    limiter: RateLimiter<
        governor::state::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl QuotaLimiter {
    pub fn new(requests_per_second: u32) -> Self {
        let rps = NonZeroU32::new(requests_per_second).unwrap_or(nonzero!(1u32));
        Self {
            limiter: RateLimiter::direct(Quota::per_second(rps)),
        }
    }

    pub async fn wait(&self) {
        self.limiter.until_ready().await;
    }
}
