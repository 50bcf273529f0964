//! Time source for the health poll loop
//!
//! Production uses tokio's timer. Tests swap in `testing::ManualClock`,
//! which advances virtual time instead of sleeping.

use std::time::{Duration, Instant};

use async_trait::async_trait;

/// Something that can tell the time and wait
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    async fn sleep(&self, duration: Duration);
}

/// Wall clock backed by `tokio::time`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
