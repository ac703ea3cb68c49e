//! Polling for asynchronously populated attributes with doubling backoff.
//!
//! Some attributes (an instance's public IP) show up a while after the
//! resource is created. [`poll_until_ready`] re-reads until the value is
//! there, doubling the sleep each time, and gives up once the next sleep
//! would exceed [`PollConfig::max_delay`]. The sleep goes through a
//! [`Sleeper`] so tests never wait on the clock.

use anyhow::Result;
use awsprov_common::defaults::{POLL_INITIAL_DELAY, POLL_MAX_DELAY};
use backon::{BackoffBuilder, ExponentialBuilder};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Something that can pause the current task.
#[allow(async_fn_in_trait)]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// [`Sleeper`] backed by `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Backoff bounds for [`poll_until_ready`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    /// First sleep after a not-ready read
    pub initial_delay: Duration,
    /// Largest sleep allowed; the first doubled delay above this fails the poll
    pub max_delay: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_delay: POLL_INITIAL_DELAY,
            max_delay: POLL_MAX_DELAY,
        }
    }
}

impl PollConfig {
    /// The sleeps a poll that never becomes ready goes through, in order.
    ///
    /// A zero initial delay yields a single zero sleep.
    pub fn delays(&self) -> impl Iterator<Item = Duration> {
        let max = self.max_delay;
        // The first doubled delay above `max` is at most twice `max`, so this
        // cap never changes a delay that is kept
        let backoff = ExponentialBuilder::default()
            .with_min_delay(self.initial_delay)
            .with_max_delay(max.saturating_mul(2))
            .with_factor(2.0)
            .without_max_times()
            .build();
        let steps = if self.initial_delay.is_zero() { 1 } else { usize::MAX };

        backoff.take(steps).take_while(move |d| *d <= max)
    }
}

/// Re-run `read` until it yields a value.
///
/// `read` returns `Ok(Some(value))` once ready and `Ok(None)` while not.
/// Errors from `read` are returned as-is without another attempt. After the
/// last sleep allowed by `config` there is one more read; if that still
/// reports not-ready the poll fails.
pub async fn poll_until_ready<T, F, Fut, S>(
    config: &PollConfig,
    sleeper: &S,
    what: &str,
    mut read: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
    S: Sleeper,
{
    let mut attempts = 0u32;
    let mut waited = Duration::ZERO;

    for delay in config.delays() {
        attempts += 1;
        if let Some(value) = read().await? {
            debug!(what = %what, attempts, "Ready");
            return Ok(value);
        }
        debug!(what = %what, attempt = attempts, delay_secs = delay.as_secs(), "Not ready, waiting");
        sleeper.sleep(delay).await;
        waited += delay;
    }

    attempts += 1;
    if let Some(value) = read().await? {
        debug!(what = %what, attempts, "Ready");
        return Ok(value);
    }

    warn!(what = %what, attempts, waited_secs = waited.as_secs(), "Gave up waiting");
    anyhow::bail!(
        "Timed out waiting for {}: still not ready after {} attempts ({:?} of waiting)",
        what,
        attempts,
        waited
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<Duration>>);

    impl Sleeper for Recorder {
        async fn sleep(&self, duration: Duration) {
            self.0.lock().unwrap().push(duration);
        }
    }

    impl Recorder {
        fn secs(&self) -> Vec<u64> {
            self.0.lock().unwrap().iter().map(|d| d.as_secs()).collect()
        }
    }

    #[tokio::test]
    async fn ready_on_first_read_never_sleeps() {
        let sleeper = Recorder::default();
        let value = poll_until_ready(&PollConfig::default(), &sleeper, "ip", || async {
            Ok(Some("203.0.113.7"))
        })
        .await
        .unwrap();

        assert_eq!(value, "203.0.113.7");
        assert!(sleeper.secs().is_empty());
    }

    #[tokio::test]
    async fn never_ready_sleeps_up_to_bound_then_fails() {
        let sleeper = Recorder::default();
        let mut reads = 0;
        let result: Result<()> = poll_until_ready(&PollConfig::default(), &sleeper, "ip", || {
            reads += 1;
            async { Ok(None) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(sleeper.secs(), vec![2, 4, 8, 16, 32]);
        assert_eq!(reads, 6);
        assert!(result.unwrap_err().to_string().contains("ip"));
    }

    #[tokio::test]
    async fn ready_after_a_few_reads() {
        let sleeper = Recorder::default();
        let mut reads = 0;
        let value = poll_until_ready(&PollConfig::default(), &sleeper, "ip", || {
            reads += 1;
            let ready = reads == 3;
            async move { Ok(ready.then_some(reads)) }
        })
        .await
        .unwrap();

        assert_eq!(value, 3);
        assert_eq!(sleeper.secs(), vec![2, 4]);
    }

    #[tokio::test]
    async fn read_error_aborts_without_sleeping() {
        let sleeper = Recorder::default();
        let mut reads = 0;
        let result: Result<()> = poll_until_ready(&PollConfig::default(), &sleeper, "ip", || {
            reads += 1;
            async { Err(anyhow::anyhow!("describe failed")) }
        })
        .await;

        assert_eq!(result.unwrap_err().to_string(), "describe failed");
        assert_eq!(reads, 1);
        assert!(sleeper.secs().is_empty());
    }

    #[tokio::test]
    async fn delay_equal_to_bound_is_still_slept() {
        let config = PollConfig {
            initial_delay: Duration::from_secs(15),
            max_delay: Duration::from_secs(60),
        };
        let sleeper = Recorder::default();
        let result: Result<()> =
            poll_until_ready(&config, &sleeper, "ip", || async { Ok(None) }).await;

        assert!(result.is_err());
        assert_eq!(sleeper.secs(), vec![15, 30, 60]);
    }

    #[test]
    fn default_schedule_stops_before_exceeding_bound() {
        let delays: Vec<u64> = PollConfig::default().delays().map(|d| d.as_secs()).collect();
        assert_eq!(delays, vec![2, 4, 8, 16, 32]);
    }

    #[test]
    fn bound_below_initial_delay_means_no_sleep() {
        let config = PollConfig {
            initial_delay: Duration::from_secs(10),
            max_delay: Duration::from_secs(5),
        };
        assert_eq!(config.delays().count(), 0);
    }

    #[test]
    fn zero_initial_delay_terminates() {
        let config = PollConfig {
            initial_delay: Duration::ZERO,
            max_delay: Duration::from_secs(60),
        };
        assert_eq!(config.delays().collect::<Vec<_>>(), vec![Duration::ZERO]);
    }

    proptest! {
        #[test]
        fn delays_double_and_stop_at_bound(initial in 1u64..30, max in 1u64..600) {
            let config = PollConfig {
                initial_delay: Duration::from_secs(initial),
                max_delay: Duration::from_secs(max),
            };
            let delays: Vec<u64> = config.delays().map(|d| d.as_secs()).collect();

            if let Some(first) = delays.first() {
                prop_assert_eq!(*first, initial);
            } else {
                prop_assert!(initial > max);
            }
            for pair in delays.windows(2) {
                prop_assert_eq!(pair[1], pair[0] * 2);
            }
            prop_assert!(delays.iter().all(|d| *d <= max));
            let next = delays.last().map(|d| d * 2).unwrap_or(initial);
            prop_assert!(next > max);
        }
    }
}
