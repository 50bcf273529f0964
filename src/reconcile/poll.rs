//! Health polling state machine
//!
//! [`HealthPoll`] decides, one observation at a time, whether to stop or
//! wait another interval. [`wait_until_healthy`] feeds it inspect results
//! from the engine and sleeps on the injected clock.

use std::time::{Duration, Instant};

use crate::common::config::HealthConfig;
use crate::common::Result;
use crate::engine::{ContainerEngine, HealthStatus};

use super::clock::Clock;

/// How often and for how long to poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Pause between observations
    pub interval: Duration,
    /// Stop after this many observations
    pub max_attempts: Option<u32>,
    /// Stop once this much time has passed since the first observation
    pub timeout: Option<Duration>,
}

impl PollPolicy {
    /// Poll forever at a fixed interval
    pub fn unbounded(interval: Duration) -> Self {
        Self {
            interval,
            max_attempts: None,
            timeout: None,
        }
    }

    pub fn from_config(config: &HealthConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.poll_interval_secs),
            max_attempts: config.max_attempts.filter(|n| *n > 0),
            timeout: match config.timeout_secs {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::from_config(&HealthConfig::default())
    }
}

/// How a poll ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Healthy { attempts: u32, elapsed: Duration },
    TimedOut {
        attempts: u32,
        elapsed: Duration,
        last: HealthStatus,
    },
}

/// What to do after an observation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStep {
    Done(PollOutcome),
    Wait(Duration),
}

/// Poll state: attempts so far and when polling began
#[derive(Debug)]
pub struct HealthPoll {
    policy: PollPolicy,
    started: Instant,
    attempts: u32,
}

impl HealthPoll {
    pub fn new(policy: PollPolicy, started: Instant) -> Self {
        Self {
            policy,
            started,
            attempts: 0,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Record one health observation taken at `now`
    pub fn observe(&mut self, status: HealthStatus, now: Instant) -> PollStep {
        self.attempts += 1;
        let elapsed = now.saturating_duration_since(self.started);

        if status.is_healthy() {
            return PollStep::Done(PollOutcome::Healthy {
                attempts: self.attempts,
                elapsed,
            });
        }

        let out_of_attempts = self
            .policy
            .max_attempts
            .is_some_and(|max| self.attempts >= max);
        let out_of_time = self.policy.timeout.is_some_and(|limit| elapsed >= limit);

        if out_of_attempts || out_of_time {
            PollStep::Done(PollOutcome::TimedOut {
                attempts: self.attempts,
                elapsed,
                last: status,
            })
        } else {
            PollStep::Wait(self.policy.interval)
        }
    }
}

/// Inspect `container` until it reports healthy or the budget runs out
///
/// An inspect error ends the loop immediately; it is not the same thing as
/// "not healthy yet".
pub async fn wait_until_healthy<E, C>(
    engine: &E,
    clock: &C,
    container: &str,
    policy: PollPolicy,
) -> Result<PollOutcome>
where
    E: ContainerEngine + ?Sized,
    C: Clock + ?Sized,
{
    let mut poll = HealthPoll::new(policy, clock.now());

    loop {
        let inspection = engine.inspect_container(container).await?;

        match poll.observe(inspection.health, clock.now()) {
            PollStep::Done(outcome) => return Ok(outcome),
            PollStep::Wait(interval) => {
                tracing::info!(
                    container = %container,
                    health = %inspection.health,
                    attempt = poll.attempts(),
                    "Waiting for database to start..."
                );
                clock.sleep(interval).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(max_attempts: Option<u32>, timeout_secs: Option<u64>) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_secs(10),
            max_attempts,
            timeout: timeout_secs.map(Duration::from_secs),
        }
    }

    #[test]
    fn test_stops_on_first_healthy() {
        let start = Instant::now();
        let mut poll = HealthPoll::new(policy(None, None), start);

        assert_eq!(
            poll.observe(HealthStatus::Starting, start),
            PollStep::Wait(Duration::from_secs(10))
        );
        match poll.observe(HealthStatus::Healthy, start + Duration::from_secs(10)) {
            PollStep::Done(PollOutcome::Healthy { attempts, elapsed }) => {
                assert_eq!(attempts, 2);
                assert_eq!(elapsed, Duration::from_secs(10));
            }
            other => panic!("Expected Healthy, got {:?}", other),
        }
    }

    #[test]
    fn test_never_stops_on_other_statuses_when_unbounded() {
        let start = Instant::now();
        let mut poll = HealthPoll::new(PollPolicy::unbounded(Duration::from_secs(1)), start);

        for (i, status) in [
            HealthStatus::Unknown,
            HealthStatus::Starting,
            HealthStatus::Unhealthy,
            HealthStatus::Unknown,
        ]
        .into_iter()
        .cycle()
        .take(500)
        .enumerate()
        {
            let now = start + Duration::from_secs(i as u64 * 3600);
            assert!(matches!(poll.observe(status, now), PollStep::Wait(_)));
        }
        assert_eq!(poll.attempts(), 500);
    }

    #[test]
    fn test_attempt_budget() {
        let start = Instant::now();
        let mut poll = HealthPoll::new(policy(Some(3), None), start);

        assert!(matches!(poll.observe(HealthStatus::Starting, start), PollStep::Wait(_)));
        assert!(matches!(poll.observe(HealthStatus::Starting, start), PollStep::Wait(_)));
        assert_eq!(
            poll.observe(HealthStatus::Unhealthy, start),
            PollStep::Done(PollOutcome::TimedOut {
                attempts: 3,
                elapsed: Duration::ZERO,
                last: HealthStatus::Unhealthy,
            })
        );
    }

    #[test]
    fn test_time_budget() {
        let start = Instant::now();
        let mut poll = HealthPoll::new(policy(None, Some(30)), start);

        assert!(matches!(
            poll.observe(HealthStatus::Starting, start + Duration::from_secs(20)),
            PollStep::Wait(_)
        ));
        assert!(matches!(
            poll.observe(HealthStatus::Starting, start + Duration::from_secs(30)),
            PollStep::Done(PollOutcome::TimedOut { attempts: 2, .. })
        ));
    }

    #[test]
    fn test_healthy_wins_over_exhausted_budget() {
        let start = Instant::now();
        let mut poll = HealthPoll::new(policy(Some(1), Some(0)), start);
        assert!(matches!(
            poll.observe(HealthStatus::Healthy, start),
            PollStep::Done(PollOutcome::Healthy { attempts: 1, .. })
        ));
    }

    #[test]
    fn test_policy_from_config() {
        let config = HealthConfig {
            poll_interval_secs: 5,
            max_attempts: Some(0),
            timeout_secs: 0,
        };
        assert_eq!(
            PollPolicy::from_config(&config),
            PollPolicy::unbounded(Duration::from_secs(5))
        );

        let default = PollPolicy::default();
        assert_eq!(default.interval, Duration::from_secs(10));
        assert_eq!(default.timeout, Some(Duration::from_secs(1800)));
    }
}
