//! Time-boxed exceptions to blocking
//!
//! Each grant stores an absolute expiry and owns exactly one revoke timer.
//! The expiry is the source of truth: after a restart grants are reloaded and
//! rescheduled for whatever time they have left.

use blockd_api::GrantView;
use blockd_store::{load_temp_access, save_temp_access, Store, TempAccessMap};
use blockd_util::{deadline_after, remaining_until, BlockdError, Clock, Domain, Result};
use chrono::{DateTime, Local};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{Scheduler, TimerHandle, TimerTask};

#[derive(Debug, Clone, Copy)]
struct Grant {
    expires_at: DateTime<Local>,
    timer: TimerHandle,
}

pub struct TemporaryAccessStore {
    clock: Arc<dyn Clock>,
    store: Arc<dyn Store>,
    grants: BTreeMap<Domain, Grant>,
}

impl TemporaryAccessStore {
    pub fn new(clock: Arc<dyn Clock>, store: Arc<dyn Store>) -> Self {
        Self {
            clock,
            store,
            grants: BTreeMap::new(),
        }
    }

    /// Reload persisted grants, dropping the ones that already expired
    ///
    /// Returns the domains whose grants were dropped.
    pub fn restore(&mut self, scheduler: &mut Scheduler) -> Vec<Domain> {
        for grant in std::mem::take(&mut self.grants).into_values() {
            scheduler.cancel(grant.timer);
        }

        let loaded = match load_temp_access(self.store.as_ref()) {
            Ok(l) => l,
            Err(e) => {
                warn!(error = %e, "Failed to load temporary access grants");
                return Vec::new();
            }
        };

        let now = self.clock.now();
        let mut dropped = Vec::new();
        for (domain, expires_at) in loaded.value {
            if expires_at <= now {
                dropped.push(domain);
                continue;
            }
            let timer = scheduler.at(expires_at, TimerTask::RevokeAccess(domain.clone()));
            debug!(
                domain = %domain,
                remaining_secs = remaining_until(expires_at, now).as_secs(),
                "Grant restored"
            );
            self.grants.insert(domain, Grant { expires_at, timer });
        }

        if !dropped.is_empty() {
            warn!(count = dropped.len(), "Dropped grants that expired while stopped");
        }
        if loaded.repaired || !dropped.is_empty() {
            self.persist();
        }

        info!(grants = self.grants.len(), "Temporary access restored");
        dropped
    }

    /// Allow `domain` for `duration` from now, replacing any earlier grant
    pub fn grant(
        &mut self,
        scheduler: &mut Scheduler,
        domain: Domain,
        duration: Duration,
    ) -> GrantView {
        let now = self.clock.now();
        let expires_at = deadline_after(now, duration);
        self.set(scheduler, domain.clone(), expires_at);

        info!(domain = %domain, expires_at = %expires_at, "Temporary access granted");
        self.view_of(&domain, expires_at)
    }

    /// Push the expiry of a live grant back by `duration`
    pub fn extend(
        &mut self,
        scheduler: &mut Scheduler,
        domain: &Domain,
        duration: Duration,
    ) -> Result<GrantView> {
        let current = self
            .valid_grant(domain)
            .ok_or_else(|| BlockdError::NoActiveGrant(domain.clone()))?;

        let expires_at = deadline_after(current.expires_at, duration);
        self.set(scheduler, domain.clone(), expires_at);

        info!(domain = %domain, expires_at = %expires_at, "Temporary access extended");
        Ok(self.view_of(domain, expires_at))
    }

    /// Remove a grant; returns whether one existed
    pub fn revoke(&mut self, scheduler: &mut Scheduler, domain: &Domain) -> bool {
        let Some(grant) = self.grants.remove(domain) else {
            return false;
        };
        scheduler.cancel(grant.timer);
        self.persist();
        info!(domain = %domain, "Temporary access revoked");
        true
    }

    /// Handle a fired revoke timer
    ///
    /// Only the timer currently owned by the grant counts, so a callback left
    /// over from a replaced grant is ignored.
    pub fn expire(&mut self, timer: TimerHandle, domain: &Domain) -> bool {
        match self.grants.get(domain) {
            Some(grant) if grant.timer == timer => {}
            _ => {
                debug!(domain = %domain, timer = %timer, "Ignoring stale revoke timer");
                return false;
            }
        }

        self.grants.remove(domain);
        self.persist();
        info!(domain = %domain, "Temporary access expired");
        true
    }

    pub fn has_valid_access(&self, domain: &Domain) -> bool {
        self.valid_grant(domain).is_some()
    }

    /// Domains with a grant that has not yet expired
    pub fn allowed_domains(&self) -> BTreeSet<Domain> {
        let now = self.clock.now();
        self.grants
            .iter()
            .filter(|(_, g)| g.expires_at > now)
            .map(|(d, _)| d.clone())
            .collect()
    }

    /// Live grants with their remaining time
    pub fn live(&self) -> Vec<GrantView> {
        let now = self.clock.now();
        self.grants
            .iter()
            .filter(|(_, g)| g.expires_at > now)
            .map(|(d, g)| self.view_of(d, g.expires_at))
            .collect()
    }

    #[cfg(test)]
    pub fn timer_of(&self, domain: &Domain) -> Option<TimerHandle> {
        self.grants.get(domain).map(|g| g.timer)
    }

    fn valid_grant(&self, domain: &Domain) -> Option<Grant> {
        let now = self.clock.now();
        self.grants.get(domain).copied().filter(|g| g.expires_at > now)
    }

    fn set(&mut self, scheduler: &mut Scheduler, domain: Domain, expires_at: DateTime<Local>) {
        if let Some(old) = self.grants.get(&domain) {
            scheduler.cancel(old.timer);
        }
        let timer = scheduler.at(expires_at, TimerTask::RevokeAccess(domain.clone()));
        self.grants.insert(domain, Grant { expires_at, timer });
        self.persist();
    }

    fn view_of(&self, domain: &Domain, expires_at: DateTime<Local>) -> GrantView {
        GrantView {
            domain: domain.clone(),
            expires_at,
            remaining_seconds: remaining_until(expires_at, self.clock.now()).as_secs(),
        }
    }

    fn persist(&self) {
        let map: TempAccessMap = self
            .grants
            .iter()
            .map(|(d, g)| (d.clone(), g.expires_at))
            .collect();
        if let Err(e) = save_temp_access(self.store.as_ref(), &map) {
            warn!(error = %e, "Failed to persist temporary access; keeping in-memory state");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockd_store::{MemoryStore, StoreKey};
    use blockd_util::ManualClock;
    use chrono::TimeZone;
    use serde_json::json;

    struct Fixture {
        clock: ManualClock,
        store: MemoryStore,
        scheduler: Scheduler,
        access: TemporaryAccessStore,
    }

    fn fixture() -> Fixture {
        let clock = ManualClock::new(Local.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap());
        let store = MemoryStore::new();
        Fixture {
            scheduler: Scheduler::new(Arc::new(clock.clone())),
            access: TemporaryAccessStore::new(Arc::new(clock.clone()), Arc::new(store.clone())),
            clock,
            store,
        }
    }

    fn domain(s: &str) -> Domain {
        Domain::parse(s).unwrap()
    }

    #[test]
    fn grant_expires_through_its_timer() {
        let mut f = fixture();
        let d = domain("youtube.com");
        f.access.grant(&mut f.scheduler, d.clone(), Duration::from_secs(60));
        assert!(f.access.has_valid_access(&d));

        f.clock.advance(Duration::from_secs(61));
        assert!(!f.access.has_valid_access(&d));

        let fired = f.scheduler.take_due();
        assert_eq!(fired.len(), 1);
        let (timer, task) = &fired[0];
        assert_eq!(task, &TimerTask::RevokeAccess(d.clone()));
        assert!(f.access.expire(*timer, &d));
        assert!(f.access.live().is_empty());
        assert_eq!(f.store.raw(StoreKey::TempAccess), Some(json!({})));
    }

    #[test]
    fn regrant_replaces_timer() {
        let mut f = fixture();
        let d = domain("youtube.com");
        f.access.grant(&mut f.scheduler, d.clone(), Duration::from_secs(60));
        let first = f.access.timer_of(&d).unwrap();

        f.access.grant(&mut f.scheduler, d.clone(), Duration::from_secs(600));
        assert!(!f.scheduler.is_pending(first));
        assert_eq!(f.scheduler.pending(), 1);

        // A late callback from the replaced grant changes nothing
        assert!(!f.access.expire(first, &d));
        assert!(f.access.has_valid_access(&d));
    }

    #[test]
    fn extend_adds_to_existing_expiry() {
        let mut f = fixture();
        let d = domain("reddit.com");
        let start = f.clock.now();
        f.access.grant(&mut f.scheduler, d.clone(), Duration::from_secs(300));
        let view = f
            .access
            .extend(&mut f.scheduler, &d, Duration::from_secs(300))
            .unwrap();

        assert_eq!(view.expires_at, start + chrono::Duration::seconds(600));
        assert_eq!(view.remaining_seconds, 600);
        assert_eq!(f.scheduler.pending(), 1);

        f.clock.advance(Duration::from_secs(599));
        assert!(f.access.has_valid_access(&d));
        assert!(f.scheduler.take_due().is_empty());

        f.clock.advance(Duration::from_secs(1));
        assert!(!f.access.has_valid_access(&d));
        assert_eq!(f.scheduler.take_due().len(), 1);
    }

    #[test]
    fn extend_without_grant_fails() {
        let mut f = fixture();
        let result = f
            .access
            .extend(&mut f.scheduler, &domain("reddit.com"), Duration::from_secs(60));
        assert!(matches!(result, Err(BlockdError::NoActiveGrant(_))));
    }

    #[test]
    fn revoke_cancels_timer_and_is_idempotent() {
        let mut f = fixture();
        let d = domain("reddit.com");
        f.access.grant(&mut f.scheduler, d.clone(), Duration::from_secs(60));

        assert!(f.access.revoke(&mut f.scheduler, &d));
        assert!(!f.access.revoke(&mut f.scheduler, &d));
        assert_eq!(f.scheduler.pending(), 0);
        assert!(!f.access.has_valid_access(&d));
    }

    #[test]
    fn restore_reschedules_live_and_drops_expired() {
        let mut f = fixture();
        let now = f.clock.now();
        f.store.put_raw(
            StoreKey::TempAccess,
            json!({
                "www.youtube.com": (now + chrono::Duration::seconds(120)).to_rfc3339(),
                "reddit.com": (now - chrono::Duration::seconds(5)).to_rfc3339(),
            }),
        );

        let dropped = f.access.restore(&mut f.scheduler);
        assert_eq!(dropped, vec![domain("reddit.com")]);
        assert!(f.access.has_valid_access(&domain("youtube.com")));
        assert_eq!(
            f.scheduler.due_time(f.access.timer_of(&domain("youtube.com")).unwrap()),
            Some(now + chrono::Duration::seconds(120))
        );

        let persisted = f.store.raw(StoreKey::TempAccess).unwrap();
        let keys: Vec<&String> = persisted.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["youtube.com"]);
    }

    #[test]
    fn persistence_failure_keeps_memory_state() {
        let mut f = fixture();
        f.store.set_fail_writes(true);

        let d = domain("reddit.com");
        f.access.grant(&mut f.scheduler, d.clone(), Duration::from_secs(60));
        assert!(f.access.has_valid_access(&d));
        assert!(f.store.raw(StoreKey::TempAccess).is_none());
    }
}
