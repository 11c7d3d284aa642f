//! Deferred tasks keyed to elapsed game time. The host's frame delta is the only clock, so
//! tests drive time explicitly.

use std::time::Duration;

#[derive(Debug, Clone)]
struct Entry<T> {
    due: Duration,
    seq: u64,
    task: T,
}

#[derive(Debug, Clone)]
pub struct Scheduler<T> {
    now: Duration,
    seq: u64,
    pending: Vec<Entry<T>>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T> {
    pub const fn new() -> Self {
        Self {
            now: Duration::ZERO,
            seq: 0,
            pending: Vec::new(),
        }
    }

    /// Current scheduler time.
    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn schedule_in(&mut self, delay: Duration, task: T) {
        self.seq += 1;
        self.pending.push(Entry {
            due: self.now + delay,
            seq: self.seq,
            task,
        });
    }

    /// Earliest task due at or before `until`, ties in scheduling order. The clock moves to the
    /// task's due time so follow-up tasks are scheduled relative to it.
    pub fn pop_due(&mut self, until: Duration) -> Option<T> {
        let idx = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, e)| e.due <= until)
            .min_by_key(|(_, e)| (e.due, e.seq))
            .map(|(i, _)| i)?;
        let entry = self.pending.swap_remove(idx);
        self.now = self.now.max(entry.due);
        Some(entry.task)
    }

    /// Move the clock forward (never backward).
    pub fn advance_to(&mut self, t: Duration) {
        self.now = self.now.max(t);
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }
}
