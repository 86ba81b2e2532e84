//! Bounded queue of pending hazard events.
//!
//! The sampler produces, the controller consumes. Neither side ever blocks:
//! a push onto a full queue drops the event, a pop on an empty queue
//! returns `None`.

use std::time::Instant;

use crossbeam_channel as xch;

use crate::sample::DistanceSample;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HazardKind {
    Obstacle,
}

/// A validated reading that fell below the hazard threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HazardEvent {
    pub kind: HazardKind,
    pub at: Instant,
    pub distance_cm: f64,
}

impl HazardEvent {
    pub fn obstacle(sample: DistanceSample, at: Instant) -> Self {
        Self {
            kind: HazardKind::Obstacle,
            at,
            distance_cm: sample.cm(),
        }
    }
}

/// Cloneable handle; all clones share one bounded channel.
#[derive(Debug, Clone)]
pub struct HazardQueue {
    tx: xch::Sender<HazardEvent>,
    rx: xch::Receiver<HazardEvent>,
    capacity: usize,
}

impl HazardQueue {
    /// A capacity of zero is raised to one; a rendezvous channel would
    /// drop every event.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = xch::bounded(capacity);
        Self { tx, rx, capacity }
    }

    /// `false` when the queue is full and the event was dropped.
    pub fn try_push(&self, event: HazardEvent) -> bool {
        self.tx.try_send(event).is_ok()
    }

    pub fn try_pop(&self) -> Option<HazardEvent> {
        self.rx.try_recv().ok()
    }

    /// Discard every queued event, returning how many there were.
    pub fn drain(&self) -> usize {
        self.rx.try_iter().count()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::ValidRange;

    fn event(cm: f64) -> HazardEvent {
        let s = ValidRange::default().admit(Some(cm)).expect("valid");
        HazardEvent::obstacle(s, Instant::now())
    }

    #[test]
    fn second_push_on_capacity_one_is_dropped() {
        let q = HazardQueue::new(1);
        assert!(q.try_push(event(5.0)));
        assert!(!q.try_push(event(6.0)));
        assert_eq!(q.len(), 1);
        assert_eq!(q.try_pop().map(|e| e.distance_cm), Some(5.0));
        assert!(q.try_pop().is_none());
    }

    #[test]
    fn fifo_and_drain() {
        let q = HazardQueue::new(3);
        for cm in [3.0, 4.0, 5.0] {
            assert!(q.try_push(event(cm)));
        }
        assert_eq!(q.try_pop().map(|e| e.distance_cm), Some(3.0));
        assert_eq!(q.drain(), 2);
        assert!(q.is_empty());
        assert_eq!(q.drain(), 0);
    }

    #[test]
    fn zero_capacity_is_raised() {
        let q = HazardQueue::new(0);
        assert_eq!(q.capacity(), 1);
        assert!(q.try_push(event(5.0)));
    }
}
