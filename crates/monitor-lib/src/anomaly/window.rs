//! Bounded buffer of the most recent live events
//!
//! FIFO eviction: once at capacity, each push drops exactly the oldest entry.

use std::collections::VecDeque;

use crate::models::LiveEvent;

/// Default buffer capacity
pub const DEFAULT_WINDOW_CAPACITY: usize = 100;

/// Default number of most recent events used for each evaluation
pub const DEFAULT_EVALUATION_SIZE: usize = 60;

/// Insertion-ordered ring buffer of live events
#[derive(Debug, Clone)]
pub struct RollingWindow {
    events: VecDeque<LiveEvent>,
    capacity: usize,
}

impl RollingWindow {
    /// Create a window holding at most `capacity` events (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an event, evicting the oldest one if over capacity
    ///
    /// Returns the evicted event, if any.
    pub fn push(&mut self, event: LiveEvent) -> Option<LiveEvent> {
        self.events.push_back(event);
        if self.events.len() > self.capacity {
            self.events.pop_front()
        } else {
            None
        }
    }

    /// The most recent `n` events in chronological (insertion) order
    pub fn snapshot(&self, n: usize) -> Vec<LiveEvent> {
        let skip = self.events.len().saturating_sub(n);
        self.events.iter().skip(skip).cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LiveEvent> {
        self.events.iter()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for RollingWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use proptest::prelude::*;

    fn event(i: u64) -> LiveEvent {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        LiveEvent::new("APPROVED", i, base + Duration::seconds(i as i64))
    }

    #[test]
    fn test_push_below_capacity() {
        let mut window = RollingWindow::new(5);
        for i in 0..3 {
            assert!(window.push(event(i)).is_none());
        }
        assert_eq!(window.len(), 3);
    }

    #[test]
    fn test_evicts_exactly_one_per_push() {
        let mut window = RollingWindow::new(3);
        for i in 0..3 {
            window.push(event(i));
        }

        let evicted = window.push(event(3)).unwrap();
        assert_eq!(evicted.count, 0);
        assert_eq!(window.len(), 3);

        let evicted = window.push(event(4)).unwrap();
        assert_eq!(evicted.count, 1);
    }

    #[test]
    fn test_snapshot_after_overflow_keeps_last_in_order() {
        let mut window = RollingWindow::default();
        for i in 0..150 {
            window.push(event(i));
        }

        let snapshot = window.snapshot(200);
        assert_eq!(snapshot.len(), 100);
        let counts: Vec<u64> = snapshot.iter().map(|e| e.count).collect();
        assert_eq!(counts, (50..150).collect::<Vec<_>>());
    }

    #[test]
    fn test_snapshot_returns_most_recent_n() {
        let mut window = RollingWindow::default();
        for i in 0..80 {
            window.push(event(i));
        }

        let snapshot = window.snapshot(DEFAULT_EVALUATION_SIZE);
        assert_eq!(snapshot.len(), 60);
        assert_eq!(snapshot.first().unwrap().count, 20);
        assert_eq!(snapshot.last().unwrap().count, 79);
    }

    #[test]
    fn test_snapshot_smaller_buffer() {
        let mut window = RollingWindow::default();
        window.push(event(1));
        assert_eq!(window.snapshot(60).len(), 1);
        assert!(RollingWindow::default().snapshot(60).is_empty());
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let mut window = RollingWindow::new(0);
        window.push(event(1));
        window.push(event(2));
        assert_eq!(window.capacity(), 1);
        assert_eq!(window.snapshot(10)[0].count, 2);
    }

    proptest! {
        #[test]
        fn property_never_exceeds_capacity(capacity in 1usize..200, pushes in 0u64..500) {
            let mut window = RollingWindow::new(capacity);
            for i in 0..pushes {
                window.push(event(i));
                prop_assert!(window.len() <= capacity);
            }
            prop_assert_eq!(window.len(), (pushes as usize).min(capacity));
        }
    }
}
