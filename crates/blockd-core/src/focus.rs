//! Focus mode state machine
//!
//! `Inactive -> Active(end)` on activation, back to `Inactive` when the
//! auto-expire timer fires or a deactivation challenge has been solved. The
//! machine itself never checks challenges.

use blockd_api::FocusStatusView;
use blockd_store::{load_focus_status, save_focus_status, FocusStatusRecord, Store};
use blockd_util::{deadline_after, remaining_until, Clock};
use chrono::{DateTime, Local};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{Scheduler, TimerHandle, TimerTask};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusState {
    Inactive,
    Active { end_time: DateTime<Local> },
}

pub struct FocusModeStateMachine {
    clock: Arc<dyn Clock>,
    store: Arc<dyn Store>,
    state: FocusState,
    timer: Option<TimerHandle>,
}

impl FocusModeStateMachine {
    pub fn new(clock: Arc<dyn Clock>, store: Arc<dyn Store>) -> Self {
        Self {
            clock,
            store,
            state: FocusState::Inactive,
            timer: None,
        }
    }

    /// Load the persisted status
    ///
    /// A status whose end time already passed is corrected to inactive and
    /// written back; returns `true` in that case.
    pub fn restore(&mut self, scheduler: &mut Scheduler) -> bool {
        self.cancel_timer(scheduler);
        self.state = FocusState::Inactive;

        let record = match load_focus_status(self.store.as_ref()) {
            Ok(r) => r.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "Failed to load focus status; starting inactive");
                return false;
            }
        };

        if !record.active {
            return false;
        }

        let now = self.clock.now();
        match record.end_time {
            Some(end_time) if end_time > now => {
                self.timer = Some(scheduler.at(end_time, TimerTask::FocusExpire));
                self.state = FocusState::Active { end_time };
                info!(end_time = %end_time, "Focus mode restored");
                false
            }
            end_time => {
                warn!(end_time = ?end_time, "Focus mode ended while stopped; deactivating");
                self.persist();
                true
            }
        }
    }

    /// Start focus mode, or restart it with a new end time if already active
    pub fn activate(&mut self, scheduler: &mut Scheduler, duration: Duration) -> FocusStatusView {
        self.cancel_timer(scheduler);

        let end_time = deadline_after(self.clock.now(), duration);
        self.timer = Some(scheduler.at(end_time, TimerTask::FocusExpire));
        self.state = FocusState::Active { end_time };
        self.persist();

        info!(end_time = %end_time, "Focus mode activated");
        self.view()
    }

    /// End focus mode after a solved challenge; returns whether it was active
    pub fn deactivate(&mut self, scheduler: &mut Scheduler) -> bool {
        if !self.is_active() {
            return false;
        }
        self.cancel_timer(scheduler);
        self.state = FocusState::Inactive;
        self.persist();

        info!("Focus mode deactivated");
        true
    }

    /// Handle the auto-expire timer firing
    pub fn expire(&mut self, timer: TimerHandle) -> bool {
        if self.timer != Some(timer) {
            debug!(timer = %timer, "Ignoring stale focus timer");
            return false;
        }
        self.timer = None;
        self.state = FocusState::Inactive;
        self.persist();

        info!("Focus mode expired");
        true
    }

    pub fn state(&self) -> FocusState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, FocusState::Active { .. })
    }

    #[cfg(test)]
    pub fn timer(&self) -> Option<TimerHandle> {
        self.timer
    }

    pub fn view(&self) -> FocusStatusView {
        match self.state {
            FocusState::Inactive => FocusStatusView::inactive(),
            FocusState::Active { end_time } => FocusStatusView {
                active: true,
                end_time: Some(end_time),
                remaining_seconds: remaining_until(end_time, self.clock.now()).as_secs(),
            },
        }
    }

    fn cancel_timer(&mut self, scheduler: &mut Scheduler) {
        if let Some(timer) = self.timer.take() {
            scheduler.cancel(timer);
        }
    }

    fn persist(&self) {
        let record = match self.state {
            FocusState::Inactive => FocusStatusRecord::default(),
            FocusState::Active { end_time } => FocusStatusRecord {
                active: true,
                end_time: Some(end_time),
            },
        };
        if let Err(e) = save_focus_status(self.store.as_ref(), &record) {
            warn!(error = %e, "Failed to persist focus status; keeping in-memory state");
        }
    }
}
