//! Duplicate-trigger suppression for the spotlight hotkey.

use crate::clock::Timestamp;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Window within which a second trigger is treated as a duplicate.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

const NONE_ACCEPTED: u64 = u64::MAX;

/// Accepts a trigger only if it arrives at least `window` after the previously
/// accepted one.
///
/// One instance is shared by every hotkey registration the monitor ever
/// makes, and it is consulted on the hook thread with a timestamp sampled
/// before anything is marshaled, so two deliveries of one physical press can
/// never both get through.
#[derive(Debug)]
pub struct TriggerDebouncer {
    window: Duration,
    last_accepted: AtomicU64,
}

impl Default for TriggerDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl TriggerDebouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_accepted: AtomicU64::new(NONE_ACCEPTED),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record a trigger seen at `at`; returns whether it should be acted on.
    pub fn try_accept(&self, at: Timestamp) -> bool {
        let candidate = at.as_nanos_u64();
        let mut current = self.last_accepted.load(Ordering::Acquire);
        loop {
            if current != NONE_ACCEPTED {
                let last = Timestamp::from_nanos_u64(current);
                if at < last || at.saturating_since(last) < self.window {
                    return false;
                }
            }
            match self.last_accepted.compare_exchange_weak(
                current,
                candidate,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// Forget the last accepted trigger.
    pub fn reset(&self) {
        self.last_accepted.store(NONE_ACCEPTED, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    #[test]
    fn test_window_boundaries() {
        let debouncer = TriggerDebouncer::default();
        assert!(debouncer.try_accept(Timestamp::from_millis(1_000)));
        assert!(!debouncer.try_accept(Timestamp::from_millis(1_001)));
        assert!(!debouncer.try_accept(Timestamp::from_millis(1_299)));
        assert!(debouncer.try_accept(Timestamp::from_millis(1_300)));
        assert!(debouncer.try_accept(Timestamp::from_millis(2_000)));
    }

    #[test]
    fn test_rejected_triggers_do_not_extend_window() {
        let debouncer = TriggerDebouncer::default();
        assert!(debouncer.try_accept(Timestamp::from_millis(0)));
        assert!(!debouncer.try_accept(Timestamp::from_millis(200)));
        // Measured from the accepted trigger at 0, not the rejected one at 200.
        assert!(debouncer.try_accept(Timestamp::from_millis(300)));
    }

    #[test]
    fn test_out_of_order_sample_rejected() {
        let debouncer = TriggerDebouncer::default();
        assert!(debouncer.try_accept(Timestamp::from_millis(5_000)));
        assert!(!debouncer.try_accept(Timestamp::from_millis(1_000)));
        debouncer.reset();
        assert!(debouncer.try_accept(Timestamp::from_millis(1_000)));
    }

    #[test]
    fn test_concurrent_duplicates_accept_once() {
        let debouncer = Arc::new(TriggerDebouncer::default());
        let accepted = Arc::new(AtomicUsize::new(0));
        let at = Timestamp::from_millis(42);

        let threads: Vec<_> = (0..8)
            .map(|_| {
                let debouncer = debouncer.clone();
                let accepted = accepted.clone();
                thread::spawn(move || {
                    if debouncer.try_accept(at) {
                        accepted.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(accepted.load(Ordering::SeqCst), 1);
    }
}
