//! Bounded polling: the only synchronisation primitive the driver uses.
//!
//! The editor parses a loaded model asynchronously and exposes no completion
//! event, so the driver repeatedly probes the editor text until it becomes
//! non-empty or the per-file timeout runs out.
//!
//! Time is read through the [`Clock`] trait. Production code uses
//! [`TokioClock`]; tests use [`ManualClock`], which only advances when slept
//! on, so a 2-second timeout is exercised without any real delay.

use async_trait::async_trait;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// A monotonic time source with an async sleep.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Time elapsed since an arbitrary, fixed origin.
    fn now(&self) -> Duration;

    /// Suspend the caller for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Wall-clock time backed by `tokio::time`.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    origin: Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Deterministic clock: `sleep` returns immediately after advancing time.
#[derive(Debug, Default)]
pub struct ManualClock {
    elapsed_nanos: AtomicU64,
    sleeps: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward without sleeping.
    pub fn advance(&self, duration: Duration) {
        self.elapsed_nanos
            .fetch_add(duration.as_nanos() as u64, Ordering::SeqCst);
    }

    /// Number of times `sleep` has been called.
    pub fn sleep_count(&self) -> u64 {
        self.sleeps.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.elapsed_nanos.load(Ordering::SeqCst))
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.fetch_add(1, Ordering::SeqCst);
        self.advance(duration);
    }
}

/// Poll `probe` until it yields `Some` or `timeout` elapses on `clock`.
///
/// The probe is always started at least once. Each probe races the time left
/// before the deadline, so a probe that stalls is abandoned rather than
/// stretching the wait. Between probes the caller sleeps for `poll_interval`,
/// shortened so that no sleep crosses the deadline.
///
/// Returns `Ok(Some(value))` on success, `Ok(None)` on timeout, and the
/// probe's own error as soon as it returns one.
pub async fn await_condition<T, E, F, Fut>(
    clock: &dyn Clock,
    timeout: Duration,
    poll_interval: Duration,
    mut probe: F,
) -> Result<Option<T>, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    let start = clock.now();
    loop {
        let remaining = timeout.saturating_sub(clock.now().saturating_sub(start));
        let probed = tokio::select! {
            biased;
            result = probe() => result?,
            _ = clock.sleep(remaining) => return Ok(None),
        };
        if let Some(value) = probed {
            return Ok(Some(value));
        }

        let elapsed = clock.now().saturating_sub(start);
        if elapsed >= timeout {
            return Ok(None);
        }

        clock.sleep(poll_interval.min(timeout - elapsed)).await;
    }
}
