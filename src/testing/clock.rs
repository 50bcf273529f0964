//! Virtual clock for poll tests

use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::reconcile::clock::Clock;

#[derive(Debug)]
struct State {
    now: Instant,
    sleeps: Vec<Duration>,
}

/// Clock whose `sleep` returns at once and moves `now` forward
#[derive(Debug)]
pub struct ManualClock {
    state: Mutex<State>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                now: Instant::now(),
                sleeps: Vec::new(),
            }),
        }
    }

    /// Every sleep requested so far, in order
    pub fn sleeps(&self) -> Vec<Duration> {
        self.state().sleeps.clone()
    }

    /// Total virtual time slept
    pub fn slept(&self) -> Duration {
        self.state().sleeps.iter().sum()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.state().now
    }

    async fn sleep(&self, duration: Duration) {
        let mut state = self.state();
        state.now += duration;
        state.sleeps.push(duration);
    }
}
