//! Monotonic time sources.
//!
//! Everything time-based in the engine (debounce windows, timers, animation
//! progress) is measured in [`Timestamp`]s handed out by a [`Clock`]. The
//! production clock wraps [`Instant`]; [`ManualClock`] is advanced by hand so
//! timing behavior can be tested deterministically.

use std::ops::{Add, Sub};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// A point on a monotonic timeline, stored as the offset from the clock's origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(Duration);

impl Timestamp {
    /// The clock origin.
    pub const ZERO: Timestamp = Timestamp(Duration::ZERO);

    /// Shorthand for a timestamp `ms` milliseconds after the origin.
    pub const fn from_millis(ms: u64) -> Self {
        Self(Duration::from_millis(ms))
    }

    /// Offset from the clock origin.
    pub const fn offset(&self) -> Duration {
        self.0
    }

    /// Time elapsed since `earlier`, or zero if `earlier` is in the future.
    pub fn saturating_since(&self, earlier: Timestamp) -> Duration {
        self.0.saturating_sub(earlier.0)
    }

    /// Nanoseconds since the origin, saturating at `u64::MAX - 1`.
    pub(crate) fn as_nanos_u64(&self) -> u64 {
        u64::try_from(self.0.as_nanos()).unwrap_or(u64::MAX - 1)
    }

    pub(crate) fn from_nanos_u64(nanos: u64) -> Self {
        Self(Duration::from_nanos(nanos))
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: Duration) -> Timestamp {
        Timestamp(self.0.saturating_add(rhs))
    }
}

impl Sub<Timestamp> for Timestamp {
    type Output = Duration;

    fn sub(self, rhs: Timestamp) -> Duration {
        self.saturating_since(rhs)
    }
}

/// A source of monotonic timestamps.
///
/// Clocks are shared between the hook thread (which stamps triggers at the
/// point of receipt) and the UI thread, hence `Send + Sync`.
pub trait Clock: Send + Sync {
    /// The current time.
    fn now(&self) -> Timestamp;
}

/// Wall-independent clock backed by [`Instant`].
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Create a clock whose origin is the moment of construction.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.origin.elapsed())
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same underlying time, so a test can keep one handle and
/// give another to the engine.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    nanos: Arc<AtomicU64>,
}

impl ManualClock {
    /// Create a clock at the origin.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let by = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        let _ = self
            .nanos
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                Some(n.saturating_add(by))
            });
    }

    /// Jump to an absolute timestamp. Moving backwards is ignored.
    pub fn set(&self, to: Timestamp) {
        self.nanos.fetch_max(to.as_nanos_u64(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_nanos_u64(self.nanos.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let clock = ManualClock::new();
        let other = clock.clone();

        clock.advance(Duration::from_millis(250));
        assert_eq!(other.now(), Timestamp::from_millis(250));

        other.set(Timestamp::from_millis(1000));
        assert_eq!(clock.now(), Timestamp::from_millis(1000));
    }

    #[test]
    fn test_manual_clock_never_goes_backwards() {
        let clock = ManualClock::new();
        clock.set(Timestamp::from_millis(500));
        clock.set(Timestamp::from_millis(100));
        assert_eq!(clock.now(), Timestamp::from_millis(500));
    }

    #[test]
    fn test_timestamp_arithmetic_saturates() {
        let early = Timestamp::from_millis(100);
        let late = early + Duration::from_millis(50);

        assert_eq!(late - early, Duration::from_millis(50));
        assert_eq!(early - late, Duration::ZERO);
    }

    #[test]
    fn test_monotonic_clock_advances() {
        let clock = MonotonicClock::new();
        let a = clock.now();
        std::thread::sleep(Duration::from_millis(2));
        assert!(clock.now() > a);
    }
}
