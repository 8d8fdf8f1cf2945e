//! Courtesy throttling between article checks.
//!
//! Pacing never changes a verdict, it only spaces out requests to the
//! publisher. The filter loop takes any [`Pacer`], so tests run with
//! [`NoPacing`] and production runs with [`FixedDelay`].

use std::time::Duration;
use tokio::time::sleep;
use tracing::trace;

/// Spaces out consecutive article checks.
pub trait Pacer {
    /// Called once between two consecutive article checks.
    async fn pause(&self);
}

/// Sleeps for a fixed duration.
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Pacer for FixedDelay {
    async fn pause(&self) {
        if self.delay.is_zero() {
            return;
        }
        trace!(delay_ms = self.delay.as_millis() as u64, "Pacing");
        sleep(self.delay).await;
    }
}

/// Does not wait at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPacing;

impl Pacer for NoPacing {
    async fn pause(&self) {}
}
