//! Injectable time source
//!
//! The scheduler never reads the wall clock directly; everything goes
//! through the Clock trait so tests can drive time by hand. Instants are
//! naive local datetimes: the engine keeps a single local-time reference
//! and no timezone database.

use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;

/// Time source used by the scheduler: the current instant plus a way to
/// wait for a duration to elapse.
#[async_trait]
pub trait Clock: Send + Sync + 'static {
    /// Current instant.
    fn now(&self) -> NaiveDateTime;

    /// Wait until `duration` has elapsed on this clock.
    async fn sleep(&self, duration: Duration);
}

/// Wall-clock implementation backed by tokio timers.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Hand-driven clock: time only moves when `advance` or `set` is called,
/// waking every sleeper whose deadline has passed. Sleeping for zero
/// (or a deadline already reached) returns immediately.
#[derive(Debug, Clone)]
pub struct ManualClock {
    inner: Arc<ManualClockInner>,
}

#[derive(Debug)]
struct ManualClockInner {
    now: Mutex<NaiveDateTime>,
    waker: Notify,
}

impl ManualClock {
    pub fn new(start: NaiveDateTime) -> Self {
        Self {
            inner: Arc::new(ManualClockInner {
                now: Mutex::new(start),
                waker: Notify::new(),
            }),
        }
    }

    /// Move time forward by `duration` and wake sleepers.
    pub fn advance(&self, duration: Duration) {
        {
            let mut now = self.lock_now();
            *now += to_chrono(duration);
        }
        self.inner.waker.notify_waiters();
    }

    /// Jump time to `instant` and wake sleepers. Jumping backwards is
    /// allowed; sleepers keep their original deadlines.
    pub fn set(&self, instant: NaiveDateTime) {
        {
            let mut now = self.lock_now();
            *now = instant;
        }
        self.inner.waker.notify_waiters();
    }

    fn lock_now(&self) -> std::sync::MutexGuard<'_, NaiveDateTime> {
        self.inner.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        *self.lock_now()
    }

    async fn sleep(&self, duration: Duration) {
        let deadline = self.now() + to_chrono(duration);
        loop {
            // the Notified future picks up notify_waiters calls from the
            // moment it is created, so checking after creating it cannot
            // miss a wakeup
            let notified = self.inner.waker.notified();
            if self.now() >= deadline {
                return;
            }
            notified.await;
        }
    }
}

fn to_chrono(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_manual_clock_advance_moves_now() {
        let clock = ManualClock::new(start());
        clock.advance(Duration::from_secs(90));
        assert_eq!(clock.now(), start() + chrono::Duration::seconds(90));
    }

    #[test]
    fn test_manual_clock_set_jumps_backwards() {
        let clock = ManualClock::new(start());
        let earlier = start() - chrono::Duration::hours(1);
        clock.set(earlier);
        assert_eq!(clock.now(), earlier);
    }

    #[tokio::test]
    async fn test_manual_clock_sleep_returns_when_advanced_past_deadline() {
        let clock = ManualClock::new(start());
        let sleeper = clock.clone();
        let handle = tokio::spawn(async move {
            sleeper.sleep(Duration::from_secs(60)).await;
        });

        // let the sleeper register before advancing
        tokio::task::yield_now().await;
        clock.advance(Duration::from_secs(30));
        tokio::task::yield_now().await;
        assert!(!handle.is_finished());

        clock.advance(Duration::from_secs(30));
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_manual_clock_sleep_zero_returns_immediately() {
        let clock = ManualClock::new(start());
        clock.sleep(Duration::ZERO).await;
    }

    #[tokio::test]
    async fn test_manual_clock_sleep_after_advance_does_not_block() {
        let clock = ManualClock::new(start());
        clock.advance(Duration::from_secs(120));
        // deadline computed from the already-advanced now
        clock.sleep(Duration::ZERO).await;
    }

    #[tokio::test]
    async fn test_system_clock_sleep_elapses() {
        let clock = SystemClock;
        let before = clock.now();
        clock.sleep(Duration::from_millis(5)).await;
        assert!(clock.now() >= before);
    }
}
