//! Per-domain time accounting
//!
//! The tracker is `Idle` or `Tracking` one domain from a start time. Stopping
//! commits the whole seconds elapsed since the start into today's usage
//! record. A flush commits the same way but keeps the session open and moves
//! its start forward by exactly the committed seconds, so repeated flushes
//! grow a single session entry and never count a second twice.

use blockd_api::{DayUsage, DomainUsage, SessionEntry, TodayTotal, TopSite, TrackingStatus};
use blockd_store::{load_usage, save_usage, Store, StoreKey, UsageHistory};
use blockd_util::{date_key, elapsed_secs, extract_domain, parse_date_key, Clock, Domain};
use chrono::{DateTime, Local};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
struct ActiveSession {
    domain: Domain,
    start: DateTime<Local>,
    /// Next commit appends a new session entry instead of growing the last one
    is_new: bool,
}

/// What a resumed session on the same domain should continue
#[derive(Debug, Clone, PartialEq, Eq)]
struct Resumable {
    domain: Domain,
    is_new: bool,
}

pub struct TimeTrackingSession {
    clock: Arc<dyn Clock>,
    store: Arc<dyn Store>,
    enabled: bool,
    current: Option<ActiveSession>,
    resumable: Option<Resumable>,
    history: UsageHistory,
}

impl TimeTrackingSession {
    pub fn new(clock: Arc<dyn Clock>, store: Arc<dyn Store>, enabled: bool) -> Self {
        Self {
            clock,
            store,
            enabled,
            current: None,
            resumable: None,
            history: UsageHistory::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Load usage history from the store
    pub fn restore(&mut self) {
        match load_usage(self.store.as_ref()) {
            Ok(loaded) => {
                self.history = loaded.value;
                if loaded.repaired {
                    self.persist();
                }
                debug!(days = self.history.len(), "Usage history loaded");
            }
            Err(e) => warn!(error = %e, "Failed to load usage history; starting empty"),
        }
    }

    /// Begin accounting for the page at `url`
    ///
    /// Any running session is committed first. Internal browser pages leave
    /// the tracker idle. Coming back to the domain that was being tracked
    /// before a pause continues that session.
    pub fn start_tracking(&mut self, url: &str) {
        if !self.enabled {
            return;
        }

        let Some(domain) = extract_domain(url) else {
            self.stop_tracking();
            self.resumable = None;
            return;
        };

        if let Some(active) = &self.current {
            if active.domain == domain {
                // Same site, e.g. in-page navigation
                return;
            }
        }

        self.stop_tracking();

        let is_new = match self.resumable.take() {
            Some(r) if r.domain == domain => r.is_new,
            _ => true,
        };

        debug!(domain = %domain, continuation = !is_new, "Tracking started");
        self.current = Some(ActiveSession {
            domain,
            start: self.clock.now(),
            is_new,
        });
    }

    /// Commit the running session and go idle
    ///
    /// Returns the domain and seconds committed, if any.
    pub fn stop_tracking(&mut self) -> Option<(Domain, u64)> {
        let mut active = self.current.take()?;
        let committed = self.commit(&mut active);

        self.resumable = Some(Resumable {
            domain: active.domain.clone(),
            is_new: active.is_new,
        });

        debug!(domain = %active.domain, seconds = committed, "Tracking stopped");
        Some((active.domain, committed))
    }

    /// Save progress of the running session without ending it
    pub fn flush(&mut self) -> u64 {
        let Some(mut active) = self.current.take() else {
            return 0;
        };
        let committed = self.commit(&mut active);
        self.current = Some(active);
        committed
    }

    /// Commit and stop while the browser window is out of focus
    ///
    /// The same domain picks up the session again when focus returns.
    pub fn pause(&mut self) -> Option<(Domain, u64)> {
        self.stop_tracking()
    }

    fn commit(&mut self, active: &mut ActiveSession) -> u64 {
        let now = self.clock.now();
        let elapsed = elapsed_secs(active.start, now);
        if elapsed == 0 {
            return 0;
        }

        let day = self.history.entry(date_key(now.date_naive())).or_default();
        let usage = day.entry(active.domain.clone()).or_default();
        usage.total_time += elapsed;

        match usage.sessions.last_mut() {
            Some(last) if !active.is_new => last.duration += elapsed,
            _ => usage.sessions.push(SessionEntry {
                timestamp: now,
                duration: elapsed,
            }),
        }

        active.start += chrono::Duration::seconds(elapsed as i64);
        active.is_new = false;
        self.persist();
        elapsed
    }

    pub fn current_status(&self) -> TrackingStatus {
        match &self.current {
            Some(active) => TrackingStatus {
                is_tracking: true,
                current_domain: Some(active.domain.clone()),
                session_duration: elapsed_secs(active.start, self.clock.now()),
            },
            None => TrackingStatus {
                is_tracking: false,
                current_domain: None,
                session_duration: 0,
            },
        }
    }

    pub fn current_domain(&self) -> Option<&Domain> {
        self.current.as_ref().map(|a| &a.domain)
    }

    /// Committed usage for today
    pub fn today_data(&self) -> DayUsage {
        self.history
            .get(&date_key(self.clock.today()))
            .cloned()
            .unwrap_or_default()
    }

    pub fn history(&self) -> &UsageHistory {
        &self.history
    }

    /// Today's sites by time spent, most first
    pub fn top_sites(&self, limit: usize) -> Vec<TopSite> {
        let mut sites: Vec<TopSite> = self
            .today_data()
            .into_iter()
            .map(|(domain, usage)| TopSite {
                domain,
                total_time: usage.total_time,
                session_count: usage.sessions.len(),
            })
            .collect();
        sites.sort_by(|a, b| {
            b.total_time
                .cmp(&a.total_time)
                .then_with(|| a.domain.cmp(&b.domain))
        });
        sites.truncate(limit);
        sites
    }

    /// Committed time today plus the session in flight
    pub fn today_total(&self) -> TodayTotal {
        let today = self.today_data();
        let mut total_seconds: u64 = today.values().map(|u| u.total_time).sum();
        let mut site_count = today.len();

        if let Some(active) = &self.current {
            total_seconds += elapsed_secs(active.start, self.clock.now());
            if !today.contains_key(&active.domain) {
                site_count += 1;
            }
        }

        TodayTotal {
            total_seconds,
            site_count,
        }
    }

    /// Drop usage days older than `retention_days`; returns how many went
    pub fn purge_older_than(&mut self, retention_days: u32) -> usize {
        let cutoff = self.clock.today() - chrono::Days::new(u64::from(retention_days));
        let before = self.history.len();
        self.history.retain(|key, _| match parse_date_key(key) {
            Some(day) => day >= cutoff,
            None => false,
        });

        let purged = before - self.history.len();
        if purged > 0 {
            info!(days = purged, retention_days, "Purged old usage data");
            self.persist();
        }
        purged
    }

    /// Forget all usage history
    ///
    /// A session in flight keeps running but its time so far is discarded.
    pub fn clear(&mut self) {
        self.history.clear();
        self.resumable = None;
        if let Some(active) = &mut self.current {
            active.start = self.clock.now();
            active.is_new = true;
        }
        if let Err(e) = self.store.remove(&[StoreKey::UsageData]) {
            warn!(error = %e, "Failed to remove usage data from store");
        }
        info!("Usage data cleared");
    }

    fn persist(&self) {
        if let Err(e) = save_usage(self.store.as_ref(), &self.history) {
            warn!(error = %e, "Failed to persist usage data; keeping in-memory state");
        }
    }
}

/// Usage of one domain on one day, or an empty record
pub fn usage_of(day: &DayUsage, domain: &Domain) -> DomainUsage {
    day.get(domain).cloned().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockd_store::MemoryStore;
    use blockd_util::ManualClock;
    use chrono::TimeZone;
    use std::time::Duration;

    fn setup() -> (ManualClock, MemoryStore, TimeTrackingSession) {
        let clock = ManualClock::new(Local.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap());
        let store = MemoryStore::new();
        let tracking =
            TimeTrackingSession::new(Arc::new(clock.clone()), Arc::new(store.clone()), true);
        (clock, store, tracking)
    }

    fn d(s: &str) -> Domain {
        Domain::parse(s).unwrap()
    }

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn switching_domains_commits_previous_session() {
        let (clock, _, mut tracking) = setup();
        tracking.start_tracking("https://a.com/page");
        clock.advance(secs(10));
        tracking.start_tracking("https://b.com/");

        let today = tracking.today_data();
        let a = usage_of(&today, &d("a.com"));
        assert_eq!(a.total_time, 10);
        assert_eq!(a.sessions.len(), 1);
        assert_eq!(a.sessions[0].duration, 10);
        assert!(!today.contains_key(&d("b.com")));

        let status = tracking.current_status();
        assert_eq!(status.current_domain, Some(d("b.com")));
        assert_eq!(status.session_duration, 0);
    }

    #[test]
    fn flushes_grow_one_session() {
        let (clock, _, mut tracking) = setup();
        tracking.start_tracking("https://docs.rs/");

        for _ in 0..3 {
            clock.advance(secs(30));
            assert_eq!(tracking.flush(), 30);
        }

        let usage = usage_of(&tracking.today_data(), &d("docs.rs"));
        assert_eq!(usage.sessions.len(), 1);
        assert_eq!(usage.sessions[0].duration, 90);
        assert_eq!(usage.total_time, 90);
        assert!(tracking.current_status().is_tracking);
    }

    #[test]
    fn flush_keeps_fractional_seconds() {
        let (clock, _, mut tracking) = setup();
        tracking.start_tracking("https://docs.rs/");

        clock.advance(Duration::from_millis(1500));
        assert_eq!(tracking.flush(), 1);
        clock.advance(Duration::from_millis(500));
        assert_eq!(tracking.flush(), 1);

        assert_eq!(usage_of(&tracking.today_data(), &d("docs.rs")).total_time, 2);
    }

    #[test]
    fn pause_and_resume_continue_the_session() {
        let (clock, _, mut tracking) = setup();
        tracking.start_tracking("https://github.com/");
        clock.advance(secs(20));
        tracking.pause();
        assert!(!tracking.current_status().is_tracking);

        clock.advance(secs(300));
        tracking.start_tracking("https://github.com/rust-lang");
        clock.advance(secs(5));
        tracking.stop_tracking();

        let usage = usage_of(&tracking.today_data(), &d("github.com"));
        assert_eq!(usage.sessions.len(), 1);
        assert_eq!(usage.total_time, 25);
    }

    #[test]
    fn returning_after_another_domain_starts_new_session() {
        let (clock, _, mut tracking) = setup();
        tracking.start_tracking("https://a.com/");
        clock.advance(secs(5));
        tracking.start_tracking("https://b.com/");
        clock.advance(secs(5));
        tracking.start_tracking("https://a.com/");
        clock.advance(secs(5));
        tracking.stop_tracking();

        let a = usage_of(&tracking.today_data(), &d("a.com"));
        assert_eq!(a.sessions.len(), 2);
        assert_eq!(a.total_time, 10);
    }

    #[test]
    fn internal_pages_go_idle() {
        let (clock, _, mut tracking) = setup();
        tracking.start_tracking("https://a.com/");
        clock.advance(secs(3));
        tracking.start_tracking("chrome://settings");

        assert!(!tracking.current_status().is_tracking);
        assert_eq!(usage_of(&tracking.today_data(), &d("a.com")).total_time, 3);
    }

    #[test]
    fn same_domain_navigation_keeps_session() {
        let (clock, _, mut tracking) = setup();
        tracking.start_tracking("https://a.com/one");
        clock.advance(secs(4));
        tracking.start_tracking("https://www.a.com/two");
        clock.advance(secs(4));

        assert_eq!(tracking.current_status().session_duration, 8);
    }

    #[test]
    fn zero_second_visits_are_not_recorded() {
        let (_, _, mut tracking) = setup();
        tracking.start_tracking("https://a.com/");
        tracking.start_tracking("https://b.com/");
        tracking.stop_tracking();
        assert!(tracking.today_data().is_empty());
    }

    #[test]
    fn commits_land_on_the_current_day() {
        let (clock, _, mut tracking) = setup();
        clock.set(Local.with_ymd_and_hms(2025, 6, 1, 23, 59, 50).unwrap());
        tracking.start_tracking("https://a.com/");
        clock.advance(secs(20));
        tracking.flush();

        assert!(tracking.history().contains_key("2025-06-02"));
        assert!(!tracking.history().contains_key("2025-06-01"));
    }

    #[test]
    fn totals_and_top_sites() {
        let (clock, _, mut tracking) = setup();
        for (url, secs_spent) in [
            ("https://a.com/", 10),
            ("https://b.com/", 30),
            ("https://c.com/", 20),
        ] {
            tracking.start_tracking(url);
            clock.advance(secs(secs_spent));
        }

        let top = tracking.top_sites(2);
        let names: Vec<&str> = top.iter().map(|t| t.domain.as_str()).collect();
        assert_eq!(names, vec!["b.com", "a.com"]);

        // c.com is still in flight
        assert_eq!(
            tracking.today_total(),
            TodayTotal {
                total_seconds: 60,
                site_count: 3
            }
        );
    }

    #[test]
    fn disabled_tracker_ignores_events() {
        let clock = ManualClock::new(Local.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap());
        let mut tracking =
            TimeTrackingSession::new(Arc::new(clock.clone()), Arc::new(MemoryStore::new()), false);
        tracking.start_tracking("https://a.com/");
        assert!(!tracking.current_status().is_tracking);
    }

    #[test]
    fn purge_and_clear() {
        let (clock, store, mut tracking) = setup();
        clock.set(Local.with_ymd_and_hms(2025, 5, 1, 9, 0, 0).unwrap());
        tracking.start_tracking("https://old.com/");
        clock.advance(secs(10));
        tracking.stop_tracking();

        clock.set(Local.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap());
        tracking.start_tracking("https://new.com/");
        clock.advance(secs(10));
        tracking.flush();

        assert_eq!(tracking.purge_older_than(30), 1);
        assert_eq!(tracking.history().len(), 1);

        tracking.clear();
        assert!(tracking.history().is_empty());
        assert!(store.raw(StoreKey::UsageData).is_none());
        assert_eq!(tracking.current_status().session_duration, 0);
    }

    #[test]
    fn restore_reads_persisted_history() {
        let (clock, store, mut tracking) = setup();
        tracking.start_tracking("https://a.com/");
        clock.advance(secs(12));
        tracking.stop_tracking();

        let mut reloaded =
            TimeTrackingSession::new(Arc::new(clock.clone()), Arc::new(store.clone()), true);
        reloaded.restore();
        assert_eq!(usage_of(&reloaded.today_data(), &d("a.com")).total_time, 12);
    }
}
