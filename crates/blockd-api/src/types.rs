//! Shared types for the blockd API

use blockd_util::{ChallengeId, Domain};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Why a domain is currently blocked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockReason {
    /// On the user's individual block list
    Individual,
    /// In the focus set while focus mode is active
    Focus,
}

impl BlockReason {
    /// Rule priority handed to the browser's declarative rule engine
    pub fn priority(self) -> u32 {
        match self {
            BlockReason::Individual => 1,
            BlockReason::Focus => 2,
        }
    }
}

/// One redirect rule for a blocked domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRule {
    /// Rule ID, stable within one rule set
    pub id: u32,
    pub priority: u32,
    pub domain: Domain,
    pub reason: BlockReason,
    /// Pattern matching top-level navigations to the domain and its subdomains
    pub url_filter: String,
    /// Informational page the navigation is redirected to
    pub redirect_url: String,
}

/// The complete set of rules that should be installed in the browser
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    /// Increments on every recomputation
    pub generation: u64,
    pub rules: Vec<BlockRule>,
}

impl RuleSet {
    pub fn is_blocked(&self, domain: &Domain) -> bool {
        self.rules.iter().any(|r| &r.domain == domain)
    }

    pub fn rule_for(&self, domain: &Domain) -> Option<&BlockRule> {
        self.rules.iter().find(|r| &r.domain == domain)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Focus mode state as seen by clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusStatusView {
    pub active: bool,
    pub end_time: Option<DateTime<Local>>,
    pub remaining_seconds: u64,
}

impl FocusStatusView {
    pub fn inactive() -> Self {
        Self {
            active: false,
            end_time: None,
            remaining_seconds: 0,
        }
    }
}

/// Answer to `GET_BLOCKING_STATS`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockingStats {
    pub blocked_domains: Vec<Domain>,
    pub focus_domains: Vec<Domain>,
    pub focus_status: FocusStatusView,
}

/// A live temporary-access grant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantView {
    pub domain: Domain,
    pub expires_at: DateTime<Local>,
    pub remaining_seconds: u64,
}

/// What a challenge unlocks when solved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeKind {
    Unblock,
    FocusDeactivation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemKind {
    Arithmetic,
    Algebra,
    Geometry,
    Sequence,
    Logic,
}

/// A problem as presented to the user; the answer never leaves the daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemView {
    pub kind: ProblemKind,
    pub question: String,
}

/// A freshly created challenge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeView {
    pub challenge_id: ChallengeId,
    pub kind: ChallengeKind,
    pub subject: Option<Domain>,
    pub problems: Vec<ProblemView>,
    pub attempts_remaining: u32,
    pub expires_at: DateTime<Local>,
}

/// Result of one submission against a challenge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChallengeOutcome {
    /// All answers matched; the gated action was performed
    Solved,
    /// At least one answer was wrong; the challenge stays open
    Incorrect { attempts_remaining: u32 },
    /// The last attempt failed; the challenge is gone and a cooldown started
    Exhausted { cooldown_seconds: u64 },
}

/// Per-domain usage for one day
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainUsage {
    /// Seconds
    pub total_time: u64,
    pub sessions: Vec<SessionEntry>,
}

/// One contiguous visit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEntry {
    pub timestamp: DateTime<Local>,
    /// Seconds
    pub duration: u64,
}

/// Usage for one day, keyed by domain
pub type DayUsage = BTreeMap<Domain, DomainUsage>;

/// Answer to `GET_CURRENT_STATUS` and `GET_LIVE_SESSION`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingStatus {
    pub is_tracking: bool,
    pub current_domain: Option<Domain>,
    /// Seconds since the session (or its last flush) started
    pub session_duration: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopSite {
    pub domain: Domain,
    pub total_time: u64,
    pub session_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodayTotal {
    /// Committed seconds plus the in-flight session
    pub total_seconds: u64,
    pub site_count: usize,
}

/// Role for authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientRole {
    /// Browser extension bridge and popup - normal user actions
    Extension,
    /// Local admin - can also wipe usage data
    Admin,
    /// Read-only observer
    Observer,
}

impl ClientRole {
    pub fn can_mutate(&self) -> bool {
        matches!(self, ClientRole::Extension | ClientRole::Admin)
    }

    pub fn can_clear_data(&self) -> bool {
        matches!(self, ClientRole::Admin)
    }
}

/// Health status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub live: bool,
    pub ready: bool,
    pub store_ok: bool,
    pub rules_installed: bool,
    pub tracking_enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn domain(s: &str) -> Domain {
        Domain::parse(s).unwrap()
    }

    #[test]
    fn block_reason_priorities() {
        assert_eq!(BlockReason::Individual.priority(), 1);
        assert_eq!(BlockReason::Focus.priority(), 2);
    }

    #[test]
    fn rule_set_lookup() {
        let rules = RuleSet {
            generation: 1,
            rules: vec![BlockRule {
                id: 1,
                priority: 1,
                domain: domain("reddit.com"),
                reason: BlockReason::Individual,
                url_filter: "||reddit.com^".into(),
                redirect_url: "blockd://blocked?site=reddit.com".into(),
            }],
        };

        assert!(rules.is_blocked(&domain("www.reddit.com")));
        assert!(!rules.is_blocked(&domain("docs.rs")));
        assert_eq!(rules.rule_for(&domain("reddit.com")).unwrap().id, 1);
    }

    #[test]
    fn challenge_outcome_serialization() {
        let json = serde_json::to_string(&ChallengeOutcome::Incorrect {
            attempts_remaining: 2,
        })
        .unwrap();
        assert!(json.contains("\"status\":\"incorrect\""));
        assert!(json.contains("\"attempts_remaining\":2"));
    }
}
