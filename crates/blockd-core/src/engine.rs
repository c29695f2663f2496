//! Composition root for the blocking and tracking components

use blockd_api::{
    BlockingStats, ChallengeKind, ChallengeOutcome, ChallengeView, DayUsage, FocusStatusView,
    GrantView, HealthStatus, RuleSet, TodayTotal, TopSite, TrackingStatus,
};
use blockd_config::Policy;
use blockd_host_api::{BlockedPage, RuleInstaller, TabDirectory};
use blockd_store::{
    load_domain_list, save_domain_list, AuditEvent, AuditEventType, FocusEndReason,
    RevokeReason, Store, StoreKey,
};
use blockd_util::{BlockdError, ChallengeId, Clock, Cooldowns, Domain, Result, TabId};
use chrono::{DateTime, Local};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::{
    BlockingInputs, BlockingRuleEngine, ChallengeGate, ChallengeSpec, ChallengeSubject,
    CoreEvent, FocusModeStateMachine, ProblemSupplier, Scheduler, TemporaryAccessStore,
    TimeTrackingSession, TimerTask, Verdict,
};

/// Longest duration accepted for a grant, extension or focus session
const MAX_MINUTES: u64 = 366 * 24 * 60;

/// External collaborators the engine is built from
pub struct EngineDeps {
    pub clock: Arc<dyn Clock>,
    pub store: Arc<dyn Store>,
    pub installer: Arc<dyn RuleInstaller>,
    pub tabs: Arc<dyn TabDirectory>,
    pub problems: Box<dyn ProblemSupplier>,
}

/// The blocking engine
///
/// Owns every component and runs all mutations on one logical thread. Each
/// mutation of block lists, focus state or grants ends in a recomputation
/// and install of the rule set.
pub struct Engine {
    policy: Policy,
    clock: Arc<dyn Clock>,
    store: Arc<dyn Store>,
    installer: Arc<dyn RuleInstaller>,
    tabs: Arc<dyn TabDirectory>,

    scheduler: Scheduler,
    challenges: ChallengeGate,
    lockouts: Cooldowns<ChallengeSubject>,
    access: TemporaryAccessStore,
    focus: FocusModeStateMachine,
    rules: BlockingRuleEngine,
    tracking: TimeTrackingSession,

    blocked: BTreeSet<Domain>,
    focus_domains: BTreeSet<Domain>,

    started: bool,
    rules_installed: bool,
    window_focused: bool,
    last_flush: DateTime<Local>,
    events: Vec<CoreEvent>,
}

impl Engine {
    pub fn new(policy: Policy, deps: EngineDeps) -> Self {
        let EngineDeps {
            clock,
            store,
            installer,
            tabs,
            problems,
        } = deps;

        let challenges = ChallengeGate::new(
            clock.clone(),
            problems,
            policy.challenges.max_attempts,
            policy.challenges.ttl,
        );

        Self {
            scheduler: Scheduler::new(clock.clone()),
            challenges,
            lockouts: Cooldowns::new(policy.challenges.cooldown),
            access: TemporaryAccessStore::new(clock.clone(), store.clone()),
            focus: FocusModeStateMachine::new(clock.clone(), store.clone()),
            rules: BlockingRuleEngine::new(BlockedPage::new(
                policy.service.blocked_page_url.clone(),
            )),
            tracking: TimeTrackingSession::new(
                clock.clone(),
                store.clone(),
                policy.tracking.enabled,
            ),
            blocked: policy.blocking.blocked_domains.iter().cloned().collect(),
            focus_domains: policy.blocking.focus_domains.iter().cloned().collect(),
            started: false,
            rules_installed: false,
            window_focused: true,
            last_flush: clock.now(),
            events: Vec::new(),
            policy,
            clock,
            store,
            installer,
            tabs,
        }
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Resynchronize from the store and install the first rule set
    ///
    /// Stale focus status and expired grants are corrected before any rule
    /// is computed.
    pub async fn start(&mut self) -> Result<()> {
        self.blocked =
            self.load_domains(StoreKey::BlockedDomains, &self.policy.blocking.blocked_domains);
        self.focus_domains =
            self.load_domains(StoreKey::FocusDomains, &self.policy.blocking.focus_domains);

        if self.focus.restore(&mut self.scheduler) {
            self.audit(AuditEventType::FocusDeactivated {
                reason: FocusEndReason::Stale,
            });
        }

        for domain in self.access.restore(&mut self.scheduler) {
            self.audit(AuditEventType::AccessRevoked {
                domain,
                reason: RevokeReason::Expired,
            });
        }

        self.tracking.restore();
        let purged = self
            .tracking
            .purge_older_than(self.policy.tracking.retention_days);
        if purged > 0 {
            self.audit(AuditEventType::UsagePurged { days: purged });
        }

        self.audit(AuditEventType::ServiceStarted);
        self.audit(AuditEventType::ConfigLoaded {
            focus_domains: self.focus_domains.len(),
        });

        self.last_flush = self.clock.now();
        self.started = true;

        info!(
            blocked = self.blocked.len(),
            focus_domains = self.focus_domains.len(),
            focus_active = self.focus.is_active(),
            grants = self.access.live().len(),
            "Engine started"
        );

        self.recompute().await
    }

    /// Flush time tracking before the process exits
    pub fn shutdown(&mut self) {
        if let Some((domain, seconds)) = self.tracking.stop_tracking() {
            debug!(domain = %domain, seconds, "Final tracking flush");
        }
        self.audit(AuditEventType::ServiceStopped);
        info!("Engine stopped");
    }

    /// Run due timers, expire stale challenges and flush tracking on schedule
    ///
    /// Rules that failed to install are installed again on every tick until
    /// the host accepts them.
    pub async fn tick(&mut self) -> Result<()> {
        let mut changed = false;

        for (timer, task) in self.scheduler.take_due() {
            match task {
                TimerTask::RevokeAccess(domain) => {
                    if self.access.expire(timer, &domain) {
                        self.audit(AuditEventType::AccessRevoked {
                            domain: domain.clone(),
                            reason: RevokeReason::Expired,
                        });
                        self.events.push(CoreEvent::AccessRevoked {
                            domain,
                            reason: RevokeReason::Expired,
                        });
                        changed = true;
                    }
                }
                TimerTask::FocusExpire => {
                    if self.focus.expire(timer) {
                        self.audit(AuditEventType::FocusDeactivated {
                            reason: FocusEndReason::Expired,
                        });
                        self.events
                            .push(CoreEvent::FocusModeChanged(self.focus.view()));
                        changed = true;
                    }
                }
            }
        }

        let now = self.clock.now();
        self.challenges.prune_expired();
        self.lockouts.cleanup(now);

        let flush_due =
            blockd_util::deadline_after(self.last_flush, self.policy.tracking.flush_interval);
        if now >= flush_due {
            self.tracking.flush();
            self.last_flush = now;
        }

        let retry = !self.rules_installed;
        if changed || retry {
            self.recompute().await?;
        }
        if retry {
            info!(generation = self.rules.current().generation, "Rules reinstalled");
            // Tabs parked while the install was failing
            for domain in self.access.allowed_domains() {
                self.redirect_blocked_tabs(&domain).await;
            }
        }
        Ok(())
    }

    /// Events produced since the last call
    pub fn drain_events(&mut self) -> Vec<CoreEvent> {
        std::mem::take(&mut self.events)
    }

    // Block list

    pub async fn block_domain(&mut self, raw: &str) -> Result<Vec<Domain>> {
        let domain = Domain::parse(raw)?;
        if self.blocked.insert(domain.clone()) {
            self.persist_domains(StoreKey::BlockedDomains);
            self.audit(AuditEventType::DomainBlocked {
                domain: domain.clone(),
            });
            info!(domain = %domain, "Domain blocked");
        }
        self.recompute().await?;
        Ok(self.blocked_domains())
    }

    pub async fn remove_blocked_domain(&mut self, raw: &str) -> Result<Vec<Domain>> {
        let domain = Domain::parse(raw)?;
        if self.blocked.remove(&domain) {
            self.persist_domains(StoreKey::BlockedDomains);
            self.audit(AuditEventType::DomainUnblocked {
                domain: domain.clone(),
            });
            info!(domain = %domain, "Domain unblocked");
        }
        self.recompute().await?;
        Ok(self.blocked_domains())
    }

    pub fn blocked_domains(&self) -> Vec<Domain> {
        self.blocked.iter().cloned().collect()
    }

    // Focus set

    pub async fn add_focus_domain(&mut self, raw: &str) -> Result<Vec<Domain>> {
        let domain = Domain::parse(raw)?;
        if self.focus_domains.insert(domain.clone()) {
            self.persist_domains(StoreKey::FocusDomains);
            self.audit(AuditEventType::FocusDomainAdded { domain });
        }
        self.recompute().await?;
        Ok(self.focus_domains())
    }

    pub async fn remove_focus_domain(&mut self, raw: &str) -> Result<Vec<Domain>> {
        let domain = Domain::parse(raw)?;
        if self.focus_domains.remove(&domain) {
            self.persist_domains(StoreKey::FocusDomains);
            self.audit(AuditEventType::FocusDomainRemoved { domain });
        }
        self.recompute().await?;
        Ok(self.focus_domains())
    }

    /// Add the domain to the focus set, or remove it if already present
    pub async fn toggle_focus_domain(&mut self, raw: &str) -> Result<Vec<Domain>> {
        let domain = Domain::parse(raw)?;
        if self.focus_domains.contains(&domain) {
            self.remove_focus_domain(domain.as_str()).await
        } else {
            self.add_focus_domain(domain.as_str()).await
        }
    }

    pub fn focus_domains(&self) -> Vec<Domain> {
        self.focus_domains.iter().cloned().collect()
    }

    // Challenges

    pub fn start_unblock_challenge(&mut self, raw: &str) -> Result<ChallengeView> {
        let domain = Domain::parse(raw)?;
        let subject = ChallengeSubject::Unblock(domain);
        self.check_lockout(&subject)?;

        let spec = ChallengeSpec {
            problems: self.policy.challenges.unblock_problems,
            difficulty: self.policy.challenges.unblock_difficulty,
        };
        Ok(self.challenges.create(subject, spec))
    }

    /// Check an unblock challenge and grant access when solved
    ///
    /// `minutes` defaults to the configured grant length.
    pub async fn submit_unblock_challenge(
        &mut self,
        id: ChallengeId,
        answers: &[String],
        minutes: Option<u64>,
    ) -> Result<(ChallengeOutcome, Option<GrantView>)> {
        let duration = duration_from(minutes, self.policy.blocking.default_grant)?;

        match self.check_answers(id, ChallengeKind::Unblock, answers)? {
            (ChallengeOutcome::Solved, Some(ChallengeSubject::Unblock(domain))) => {
                // The challenge is consumed, so the grant stands even if the
                // rules cannot be installed right now
                let grant = self.record_grant(domain.clone(), duration);
                if self.install_or_defer().await {
                    self.redirect_blocked_tabs(&domain).await;
                }
                Ok((ChallengeOutcome::Solved, Some(grant)))
            }
            (outcome, _) => Ok((outcome, None)),
        }
    }

    pub fn start_focus_deactivation_challenge(&mut self) -> Result<ChallengeView> {
        if !self.focus.is_active() {
            return Err(BlockdError::validation("Focus mode is not active"));
        }
        let subject = ChallengeSubject::FocusDeactivation;
        self.check_lockout(&subject)?;

        let spec = ChallengeSpec {
            problems: self.policy.challenges.focus_deactivation_problems,
            difficulty: self.policy.challenges.focus_deactivation_difficulty,
        };
        Ok(self.challenges.create(subject, spec))
    }

    /// Check a focus deactivation challenge and end focus mode when solved
    pub async fn submit_focus_deactivation(
        &mut self,
        id: ChallengeId,
        answers: &[String],
    ) -> Result<(ChallengeOutcome, FocusStatusView)> {
        let (outcome, _) = self.check_answers(id, ChallengeKind::FocusDeactivation, answers)?;

        if outcome == ChallengeOutcome::Solved && self.focus.deactivate(&mut self.scheduler) {
            self.audit(AuditEventType::FocusDeactivated {
                reason: FocusEndReason::Challenge,
            });
            self.events.push(CoreEvent::FocusModeChanged(self.focus.view()));
            self.install_or_defer().await;
        }

        Ok((outcome, self.focus.view()))
    }

    fn check_lockout(&self, subject: &ChallengeSubject) -> Result<()> {
        self.lockouts
            .check(subject, self.clock.now())
            .map_err(|remaining| BlockdError::CooldownActive { remaining })
    }

    /// Verify answers, audit the result and start a lockout on exhaustion
    fn check_answers(
        &mut self,
        id: ChallengeId,
        kind: ChallengeKind,
        answers: &[String],
    ) -> Result<(ChallengeOutcome, Option<ChallengeSubject>)> {
        match self.challenges.submit(id, kind, answers)? {
            Verdict::Solved(subject) => {
                info!(challenge_id = %id, kind = ?kind, "Challenge solved");
                self.audit(AuditEventType::ChallengeSolved {
                    kind,
                    subject: subject.domain().cloned(),
                });
                self.lockouts.clear(&subject);
                Ok((ChallengeOutcome::Solved, Some(subject)))
            }
            Verdict::Incorrect {
                subject,
                attempts_remaining,
            } => {
                debug!(challenge_id = %id, attempts_remaining, "Challenge answer incorrect");
                self.audit(AuditEventType::ChallengeFailed {
                    kind,
                    subject: subject.domain().cloned(),
                    attempts_remaining,
                });
                Ok((ChallengeOutcome::Incorrect { attempts_remaining }, None))
            }
            Verdict::Exhausted(subject) => {
                let cooldown = self.lockouts.period();
                warn!(
                    challenge_id = %id,
                    kind = ?kind,
                    cooldown_secs = cooldown.as_secs(),
                    "Challenge attempts exhausted"
                );
                self.audit(AuditEventType::ChallengeExhausted {
                    kind,
                    subject: subject.domain().cloned(),
                });
                self.lockouts.start(subject, self.clock.now());
                Ok((
                    ChallengeOutcome::Exhausted {
                        cooldown_seconds: cooldown.as_secs(),
                    },
                    None,
                ))
            }
        }
    }

    // Focus mode

    /// Start focus mode; `minutes` defaults to the configured length
    pub async fn activate_focus(&mut self, minutes: Option<u64>) -> Result<FocusStatusView> {
        let duration = duration_from(minutes, self.policy.blocking.default_focus)?;
        let view = self.focus.activate(&mut self.scheduler, duration);

        if let Some(end_time) = view.end_time {
            self.audit(AuditEventType::FocusActivated { end_time });
        }
        self.events.push(CoreEvent::FocusModeChanged(view.clone()));
        self.recompute().await?;
        Ok(view)
    }

    pub fn focus_status(&self) -> FocusStatusView {
        self.focus.view()
    }

    // Temporary access

    pub async fn grant_temp_access(&mut self, raw: &str, minutes: Option<u64>) -> Result<GrantView> {
        let domain = Domain::parse(raw)?;
        let duration = duration_from(minutes, self.policy.blocking.default_grant)?;
        self.grant(domain, duration).await
    }

    pub async fn extend_temp_access(
        &mut self,
        raw: &str,
        minutes: Option<u64>,
    ) -> Result<GrantView> {
        let domain = Domain::parse(raw)?;
        let duration = duration_from(minutes, self.policy.blocking.default_extend)?;
        let view = self.access.extend(&mut self.scheduler, &domain, duration)?;

        self.audit(AuditEventType::AccessExtended {
            domain: domain.clone(),
            expires_at: view.expires_at,
        });
        self.events.push(CoreEvent::AccessGranted {
            domain,
            expires_at: view.expires_at,
        });
        self.recompute().await?;
        Ok(view)
    }

    /// Remove a grant; revoking a domain without one is a no-op
    pub async fn revoke_temp_access(&mut self, raw: &str) -> Result<Domain> {
        let domain = Domain::parse(raw)?;
        if self.access.revoke(&mut self.scheduler, &domain) {
            self.audit(AuditEventType::AccessRevoked {
                domain: domain.clone(),
                reason: RevokeReason::Manual,
            });
            self.events.push(CoreEvent::AccessRevoked {
                domain: domain.clone(),
                reason: RevokeReason::Manual,
            });
        }
        self.recompute().await?;
        Ok(domain)
    }

    pub fn temp_access(&self) -> Vec<GrantView> {
        self.access.live()
    }

    pub fn has_valid_access(&self, domain: &Domain) -> bool {
        self.access.has_valid_access(domain)
    }

    async fn grant(&mut self, domain: Domain, duration: Duration) -> Result<GrantView> {
        let view = self.record_grant(domain.clone(), duration);
        self.recompute().await?;
        self.redirect_blocked_tabs(&domain).await;
        Ok(view)
    }

    fn record_grant(&mut self, domain: Domain, duration: Duration) -> GrantView {
        let view = self.access.grant(&mut self.scheduler, domain.clone(), duration);

        self.audit(AuditEventType::AccessGranted {
            domain: domain.clone(),
            expires_at: view.expires_at,
        });
        self.events.push(CoreEvent::AccessGranted {
            domain,
            expires_at: view.expires_at,
        });
        view
    }

    /// Send tabs parked on the blocked page for `domain` back to the site
    async fn redirect_blocked_tabs(&self, domain: &Domain) {
        let tabs = match self.tabs.query_tabs().await {
            Ok(tabs) => tabs,
            Err(e) => {
                warn!(error = %e, "Failed to query tabs for redirect");
                return;
            }
        };

        let target = BlockedPage::site_url(domain);
        for tab in tabs {
            if self.rules.page().blocked_site(&tab.url).as_ref() != Some(domain) {
                continue;
            }
            match self.tabs.update_tab(tab.id, &target).await {
                Ok(()) => debug!(tab = %tab.id, domain = %domain, "Redirected blocked tab"),
                Err(e) => warn!(tab = %tab.id, error = %e, "Failed to redirect blocked tab"),
            }
        }
    }

    // Blocking

    /// Whether navigation to `domain` is blocked right now
    pub fn is_blocked(&self, domain: &Domain) -> bool {
        let allowed = self.access.allowed_domains();
        self.inputs(&allowed).is_blocked(domain)
    }

    pub fn blocking_stats(&self) -> BlockingStats {
        BlockingStats {
            blocked_domains: self.blocked_domains(),
            focus_domains: self.focus_domains(),
            focus_status: self.focus.view(),
        }
    }

    /// The rule set computed most recently
    pub fn rules(&self) -> &RuleSet {
        self.rules.current()
    }

    fn inputs<'a>(&'a self, allowed: &'a BTreeSet<Domain>) -> BlockingInputs<'a> {
        BlockingInputs {
            blocked: &self.blocked,
            focus_domains: &self.focus_domains,
            focus_active: self.focus.is_active(),
            allowed,
        }
    }

    /// Recompute the rule set and install it
    pub async fn recompute(&mut self) -> Result<()> {
        let allowed = self.access.allowed_domains();
        let inputs = BlockingInputs {
            blocked: &self.blocked,
            focus_domains: &self.focus_domains,
            focus_active: self.focus.is_active(),
            allowed: &allowed,
        };
        let rules = self.rules.recompute(&inputs).clone();

        match self.installer.install(&rules).await {
            Ok(()) => {
                self.rules_installed = true;
                debug!(generation = rules.generation, rules = rules.len(), "Rules installed");
                Ok(())
            }
            Err(e) => {
                self.rules_installed = false;
                error!(generation = rules.generation, error = %e, "Rule installation failed");
                Err(BlockdError::host(e.to_string()))
            }
        }
    }

    /// Install after a state change that cannot be undone
    ///
    /// Returns whether the rules are installed; otherwise `tick` retries.
    async fn install_or_defer(&mut self) -> bool {
        match self.recompute().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Rules not installed, retrying on next tick");
                false
            }
        }
    }

    // Time tracking

    /// A tab navigated; only the active tab of a focused window is tracked
    pub fn tab_updated(&mut self, tab: TabId, url: &str, active: bool) {
        debug!(tab = %tab, active, "Tab updated");
        if active && self.window_focused {
            self.tracking.start_tracking(url);
        }
    }

    /// A tab became active; its URL is looked up when not supplied
    pub async fn tab_activated(&mut self, tab: TabId, url: Option<&str>) {
        let url = match url {
            Some(u) => Some(u.to_string()),
            None => self.lookup_tab_url(tab).await,
        };
        if !self.window_focused {
            return;
        }
        match url {
            Some(u) => self.tracking.start_tracking(&u),
            None => {
                self.tracking.stop_tracking();
            }
        }
    }

    /// A tab closed; tracking follows whatever tab is active now
    pub async fn tab_removed(&mut self, tab: TabId) {
        debug!(tab = %tab, "Tab removed");
        self.follow_active_tab().await;
    }

    /// Losing focus saves progress and pauses; regaining it resumes
    pub async fn window_focus_changed(&mut self, focused: bool) {
        self.window_focused = focused;
        if focused {
            self.follow_active_tab().await;
        } else {
            self.tracking.pause();
        }
    }

    async fn follow_active_tab(&mut self) {
        match self.tabs.query_active_tab().await {
            Ok(Some(tab)) if self.window_focused => self.tracking.start_tracking(&tab.url),
            Ok(_) => {
                self.tracking.stop_tracking();
            }
            Err(e) => warn!(error = %e, "Failed to query active tab"),
        }
    }

    async fn lookup_tab_url(&self, tab: TabId) -> Option<String> {
        match self.tabs.query_tabs().await {
            Ok(tabs) => tabs.into_iter().find(|t| t.id == tab).map(|t| t.url),
            Err(e) => {
                warn!(tab = %tab, error = %e, "Failed to look up tab");
                None
            }
        }
    }

    pub fn current_status(&self) -> TrackingStatus {
        self.tracking.current_status()
    }

    pub fn today_data(&self) -> DayUsage {
        self.tracking.today_data()
    }

    /// Date key (`YYYY-MM-DD`) of the engine's current day
    pub fn today_key(&self) -> String {
        blockd_util::date_key(self.clock.now().date_naive())
    }

    pub fn top_websites(&self, limit: usize) -> Vec<TopSite> {
        self.tracking.top_sites(limit)
    }

    pub fn today_total(&self) -> TodayTotal {
        self.tracking.today_total()
    }

    /// Commit in-flight tracking now; returns the seconds saved
    pub fn force_save(&mut self) -> u64 {
        self.last_flush = self.clock.now();
        self.tracking.flush()
    }

    /// Wipe all usage history
    pub fn clear_data(&mut self) {
        self.tracking.clear();
        self.audit(AuditEventType::UsageCleared);
    }

    // Health

    pub fn health(&self) -> HealthStatus {
        HealthStatus {
            live: true,
            ready: self.started,
            store_ok: self.store.is_healthy(),
            rules_installed: self.rules_installed,
            tracking_enabled: self.tracking.is_enabled(),
        }
    }

    /// Scheduled timers that have not fired yet
    pub fn pending_timers(&self) -> usize {
        self.scheduler.pending()
    }

    // Persistence helpers

    /// Load a domain set, seeding it from config when never persisted
    fn load_domains(&self, key: StoreKey, seed: &[Domain]) -> BTreeSet<Domain> {
        match load_domain_list(self.store.as_ref(), key) {
            Ok(Some(loaded)) => {
                let set: BTreeSet<Domain> = loaded.value.into_iter().collect();
                if loaded.repaired {
                    let list: Vec<Domain> = set.iter().cloned().collect();
                    if let Err(e) = save_domain_list(self.store.as_ref(), key, &list) {
                        warn!(key = %key, error = %e, "Failed to write back repaired list");
                    }
                }
                set
            }
            Ok(None) => {
                let set: BTreeSet<Domain> = seed.iter().cloned().collect();
                let list: Vec<Domain> = set.iter().cloned().collect();
                if let Err(e) = save_domain_list(self.store.as_ref(), key, &list) {
                    warn!(key = %key, error = %e, "Failed to seed domain list");
                }
                set
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to load domain list; using config");
                seed.iter().cloned().collect()
            }
        }
    }

    fn persist_domains(&self, key: StoreKey) {
        let list: Vec<Domain> = match key {
            StoreKey::FocusDomains => self.focus_domains(),
            _ => self.blocked_domains(),
        };
        if let Err(e) = save_domain_list(self.store.as_ref(), key, &list) {
            warn!(key = %key, error = %e, "Failed to persist domain list; keeping in-memory state");
        }
    }

    fn audit(&self, event: AuditEventType) {
        if let Err(e) = self.store.append_audit(AuditEvent::at(self.clock.now(), event)) {
            warn!(error = %e, "Failed to append audit event");
        }
    }
}

/// Requested minutes, or the default when absent
fn duration_from(minutes: Option<u64>, default: Duration) -> Result<Duration> {
    match minutes {
        None => Ok(default),
        Some(0) => Err(BlockdError::validation("Duration must be at least one minute")),
        Some(m) if m > MAX_MINUTES => Err(BlockdError::validation(format!(
            "Duration must be at most {} minutes",
            MAX_MINUTES
        ))),
        Some(m) => Ok(blockd_util::minutes(m)),
    }
}
