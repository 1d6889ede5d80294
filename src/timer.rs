//! Virtual clock, timer queue and deferred work queue.
//!
//! Timers never run protocol logic: an expired timer only turns into a
//! [`Task`] on the [`WorkQueue`], which is drained by
//! [`crate::NdContext::run_pending`] outside of any timer bookkeeping.
//! Re-arming a timer cancels the previous one, so each entry has at most
//! one timer queued. Tasks also carry a generation number: a task that
//! expired before being cancelled no longer matches its target and is skipped.
use std::collections::{BTreeMap, VecDeque};
use std::sync::Weak;
use std::time::Duration;

use crate::neighbors::NeighborEntry;

#[derive(Clone, Debug)]
pub enum Task {
    /// Expiry of a neighbor cache entry timer.
    Neighbor {
        entry: Weak<NeighborEntry>,
        generation: u64,
    },
    /// Retransmission timer of a DAD probe.
    Dad { id: u64, generation: u64 },
    /// Periodic sweep of the neighbor caches.
    Sweep,
}

/// Handle of a scheduled timer.
///
/// Timers are ordered by deadline, then by scheduling order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId {
    deadline: Duration,
    seq: u64,
}

impl TimerId {
    pub fn deadline(&self) -> Duration {
        self.deadline
    }
}

/// Timers ordered by deadline over a virtual clock.
///
/// Timers with the same deadline expire in the order they were scheduled.
///
/// ```
/// use std::time::Duration;
/// use ndisc::timer::{Task, TimerQueue};
///
/// let mut timers = TimerQueue::default();
/// timers.schedule(Duration::from_secs(2), Task::Sweep);
/// let cancelled = timers.schedule(Duration::from_secs(3), Task::Sweep);
/// assert!(timers.cancel(cancelled));
/// assert!(timers.pop_expired(Duration::from_secs(1)).is_none());
/// assert!(timers.pop_expired(Duration::from_secs(2)).is_some());
/// assert!(timers.is_empty());
/// assert_eq!(timers.now(), Duration::from_secs(2));
/// ```
#[derive(Debug, Default)]
pub struct TimerQueue {
    now: Duration,
    seq: u64,
    timers: BTreeMap<TimerId, Task>,
}

impl TimerQueue {
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Schedule `task` to expire `after` from now.
    pub fn schedule(&mut self, after: Duration, task: Task) -> TimerId {
        self.seq += 1;
        let id = TimerId {
            deadline: self.now + after,
            seq: self.seq,
        };
        self.timers.insert(id, task);
        id
    }

    /// Remove a pending timer. Returns false if it already expired.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        self.timers.remove(&id).is_some()
    }

    /// Pop the earliest timer expiring at or before `until`, moving the clock to its deadline.
    pub fn pop_expired(&mut self, until: Duration) -> Option<Task> {
        match self.timers.first_key_value() {
            Some((id, _)) if id.deadline <= until => {}
            _ => return None,
        }
        let (id, task) = self.timers.pop_first()?;
        self.now = self.now.max(id.deadline);
        Some(task)
    }

    /// Move the clock forward. The clock never goes back.
    pub fn set_now(&mut self, now: Duration) {
        self.now = self.now.max(now);
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.keys().next().map(|id| id.deadline)
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}

/// Tasks handed over by expired timers, run in FIFO order.
#[derive(Debug, Default)]
pub struct WorkQueue {
    tasks: VecDeque<Task>,
}

impl WorkQueue {
    pub fn push(&mut self, task: Task) {
        self.tasks.push_back(task);
    }

    pub fn pop(&mut self) -> Option<Task> {
        self.tasks.pop_front()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
