//! Cancellable delayed tasks driven by a [`Clock`]
//!
//! Timers are stored as absolute due times and fired by polling
//! [`Scheduler::take_due`] from the service tick, so a virtual clock in tests
//! controls exactly when they run.

use blockd_util::{Clock, Domain};
use chrono::{DateTime, Local};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Work a timer performs when it fires
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerTask {
    /// Temporary access to the domain ends
    RevokeAccess(Domain),
    /// Focus mode reaches its end time
    FocusExpire,
}

/// Handle used to cancel a pending timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

impl fmt::Display for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}

#[derive(Debug, Clone)]
struct Timer {
    due: DateTime<Local>,
    task: TimerTask,
}

pub struct Scheduler {
    clock: Arc<dyn Clock>,
    next_id: u64,
    timers: BTreeMap<TimerHandle, Timer>,
}

impl Scheduler {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            next_id: 1,
            timers: BTreeMap::new(),
        }
    }

    /// Run `task` once `delay` has elapsed
    pub fn after(&mut self, delay: Duration, task: TimerTask) -> TimerHandle {
        let due = blockd_util::deadline_after(self.clock.now(), delay);
        self.at(due, task)
    }

    /// Run `task` at an absolute time
    pub fn at(&mut self, due: DateTime<Local>, task: TimerTask) -> TimerHandle {
        let handle = TimerHandle(self.next_id);
        self.next_id += 1;
        self.timers.insert(handle, Timer { due, task });
        handle
    }

    /// Returns whether the timer was still pending
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        self.timers.remove(&handle).is_some()
    }

    #[cfg(test)]
    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.timers.contains_key(&handle)
    }

    #[cfg(test)]
    pub fn due_time(&self, handle: TimerHandle) -> Option<DateTime<Local>> {
        self.timers.get(&handle).map(|t| t.due)
    }

    /// Remove and return every timer due at or before now, earliest first
    pub fn take_due(&mut self) -> Vec<(TimerHandle, TimerTask)> {
        let now = self.clock.now();
        let mut due: Vec<(TimerHandle, Timer)> = Vec::new();

        self.timers.retain(|handle, timer| {
            if timer.due <= now {
                due.push((*handle, timer.clone()));
                false
            } else {
                true
            }
        });

        due.sort_by_key(|(handle, timer)| (timer.due, *handle));
        due.into_iter().map(|(h, t)| (h, t.task)).collect()
    }

    pub fn pending(&self) -> usize {
        self.timers.len()
    }
}
