//! Time sources used to stamp history entries.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Supplies the current time in milliseconds.
pub trait TimeSource: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// Wall-clock time since the Unix epoch, never earlier than a prior reading.
///
/// If the system clock steps backwards the last returned value is repeated
/// until wall time catches up.
#[derive(Debug, Default)]
pub struct SystemClock {
    last: AtomicI64,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }

    fn wall_millis() -> i64 {
        // A clock set before 1970 reports the epoch.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
            .unwrap_or(0)
    }

    fn observe(&self, now: i64) -> i64 {
        self.last.fetch_max(now, Ordering::SeqCst).max(now)
    }
}

impl TimeSource for SystemClock {
    fn now_millis(&self) -> i64 {
        self.observe(Self::wall_millis())
    }
}

/// A clock that only moves when told to.
///
/// Starts at `0` unless constructed with [`ManualClock::starting_at`].
/// Shareable across threads; readers see the last value written.
///
/// ```
/// use point_ledger::{ManualClock, TimeSource};
///
/// let clock = ManualClock::new();
/// clock.advance(10);
/// assert_eq!(clock.now_millis(), 10);
/// ```
#[derive(Debug, Default)]
pub struct ManualClock {
    current: AtomicI64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    pub fn starting_at(millis: i64) -> Self {
        ManualClock {
            current: AtomicI64::new(millis),
        }
    }

    /// Moves the clock forward by `millis`.
    pub fn advance(&self, millis: i64) {
        self.current.fetch_add(millis, Ordering::SeqCst);
    }

    /// Jumps the clock to an absolute instant.
    pub fn set(&self, millis: i64) {
        self.current.store(millis, Ordering::SeqCst);
    }
}

impl TimeSource for ManualClock {
    fn now_millis(&self) -> i64 {
        self.current.load(Ordering::SeqCst)
    }
}

impl<T: TimeSource + ?Sized> TimeSource for std::sync::Arc<T> {
    fn now_millis(&self) -> i64 {
        (**self).now_millis()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_manual_clock_starts_at_zero() {
        assert_eq!(ManualClock::new().now_millis(), 0);
    }

    #[test]
    fn test_manual_clock_advance_accumulates() {
        let clock = ManualClock::starting_at(5);
        clock.advance(10);
        clock.advance(3);
        assert_eq!(clock.now_millis(), 18);

        clock.set(100);
        assert_eq!(clock.now_millis(), 100);
    }

    #[test]
    fn test_shared_clock_sees_advances() {
        let clock = Arc::new(ManualClock::new());
        let handle = Arc::clone(&clock);
        clock.advance(7);
        assert_eq!(handle.now_millis(), 7);
    }

    #[test]
    fn test_system_clock_is_non_decreasing() {
        let clock = SystemClock::new();
        let first = clock.now_millis();
        let second = clock.now_millis();
        assert!(first > 0);
        assert!(second >= first);
    }

    #[test]
    fn test_system_clock_holds_through_backward_step() {
        let clock = SystemClock::new();
        assert_eq!(clock.observe(1_000), 1_000);
        assert_eq!(clock.observe(400), 1_000);
        assert_eq!(clock.observe(1_000), 1_000);
        assert_eq!(clock.observe(1_500), 1_500);
    }
}
