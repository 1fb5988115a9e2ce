//! Deadline timers polled from the UI thread.
//!
//! There is no timer thread: the owner calls [`TimerQueue::poll_expired`]
//! from its frame callback. That makes cancellation synchronous. Once
//! [`TimerQueue::cancel`] returns, the timer can never be reported again.

use crate::clock::Timestamp;
use std::collections::BTreeMap;
use std::time::Duration;

/// Handle to a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Debug)]
struct TimerEntry<K> {
    key: K,
    deadline: Timestamp,
    period: Option<Duration>,
}

/// One-shot and repeating timers keyed by a caller-chosen tag.
#[derive(Debug)]
pub struct TimerQueue<K> {
    entries: BTreeMap<u64, TimerEntry<K>>,
    next_id: u64,
}

impl<K> Default for TimerQueue<K> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_id: 0,
        }
    }
}

impl<K: Clone> TimerQueue<K> {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, key: K, deadline: Timestamp, period: Option<Duration>) -> TimerId {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.insert(
            id,
            TimerEntry {
                key,
                deadline,
                period,
            },
        );
        TimerId(id)
    }

    /// Fire once at `deadline`.
    pub fn schedule(&mut self, key: K, deadline: Timestamp) -> TimerId {
        self.insert(key, deadline, None)
    }

    /// Fire at `first` and then every `period`. A zero period is treated as
    /// one nanosecond so polling always terminates.
    pub fn schedule_repeating(&mut self, key: K, first: Timestamp, period: Duration) -> TimerId {
        self.insert(key, first, Some(period.max(Duration::from_nanos(1))))
    }

    /// Cancel a timer. Returns whether it was still pending.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        self.entries.remove(&id.0).is_some()
    }

    pub fn cancel_all(&mut self) {
        self.entries.clear();
    }

    pub fn deadline(&self, id: TimerId) -> Option<Timestamp> {
        self.entries.get(&id.0).map(|entry| entry.deadline)
    }

    /// Earliest pending deadline.
    pub fn next_deadline(&self) -> Option<Timestamp> {
        self.entries.values().map(|entry| entry.deadline).min()
    }

    pub fn pending(&self) -> usize {
        self.entries.len()
    }

    /// Report every timer due at `now`, in deadline order.
    ///
    /// One-shot timers are removed. A repeating timer fires at most once per
    /// poll however many periods were missed, then moves to its next future
    /// deadline.
    pub fn poll_expired(&mut self, now: Timestamp) -> Vec<(TimerId, K)> {
        let mut due: Vec<(Timestamp, u64)> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.deadline <= now)
            .map(|(id, entry)| (entry.deadline, *id))
            .collect();
        due.sort();

        let mut fired = Vec::with_capacity(due.len());
        for (_, id) in due {
            let reschedule = match self.entries.get_mut(&id) {
                Some(entry) => {
                    fired.push((TimerId(id), entry.key.clone()));
                    match entry.period {
                        Some(period) => {
                            while entry.deadline <= now {
                                entry.deadline = entry.deadline + period;
                            }
                            true
                        }
                        None => false,
                    }
                }
                None => continue,
            };
            if !reschedule {
                self.entries.remove(&id);
            }
        }
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ms: u64) -> Timestamp {
        Timestamp::from_millis(ms)
    }

    #[test]
    fn test_one_shot_fires_once() {
        let mut queue = TimerQueue::new();
        let id = queue.schedule("auto", at(100));
        assert!(queue.poll_expired(at(99)).is_empty());
        assert_eq!(queue.poll_expired(at(100)), vec![(id, "auto")]);
        assert!(queue.poll_expired(at(500)).is_empty());
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn test_cancelled_timer_never_fires() {
        let mut queue = TimerQueue::new();
        let id = queue.schedule(1, at(10));
        assert!(queue.cancel(id));
        assert!(!queue.cancel(id));
        assert!(queue.poll_expired(at(1_000)).is_empty());
    }

    #[test]
    fn test_repeating_skips_missed_periods() {
        let mut queue = TimerQueue::new();
        let id = queue.schedule_repeating('p', at(0), Duration::from_millis(16));
        assert_eq!(queue.poll_expired(at(0)).len(), 1);
        assert_eq!(queue.deadline(id), Some(at(16)));

        // Stalled for 100ms: still one firing, next deadline in the future.
        assert_eq!(queue.poll_expired(at(100)).len(), 1);
        assert_eq!(queue.deadline(id), Some(at(112)));
    }

    #[test]
    fn test_expired_in_deadline_order() {
        let mut queue = TimerQueue::new();
        queue.schedule("late", at(30));
        queue.schedule("early", at(10));
        let keys: Vec<_> = queue.poll_expired(at(50)).into_iter().map(|(_, k)| k).collect();
        assert_eq!(keys, vec!["early", "late"]);
    }

    #[test]
    fn test_next_deadline() {
        let mut queue = TimerQueue::new();
        assert_eq!(queue.next_deadline(), None);
        queue.schedule((), at(40));
        queue.schedule((), at(20));
        assert_eq!(queue.next_deadline(), Some(at(20)));
        queue.cancel_all();
        assert_eq!(queue.next_deadline(), None);
    }
}
