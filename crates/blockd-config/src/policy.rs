//! Validated policy structures

use blockd_api::Difficulty;
use blockd_util::{Domain, data_dir_without_env, minutes, socket_path_without_env};
use std::path::PathBuf;
use std::time::Duration;

use crate::schema::{
    RawBlockingConfig, RawChallengeConfig, RawConfig, RawServiceConfig, RawTrackingConfig,
};

/// Sites blocked while focus mode is active, until the user edits the set
pub const DEFAULT_FOCUS_DOMAINS: &[&str] = &[
    "facebook.com",
    "twitter.com",
    "instagram.com",
    "tiktok.com",
    "youtube.com",
    "netflix.com",
    "reddit.com",
    "twitch.tv",
];

pub const DEFAULT_BLOCKED_PAGE_URL: &str = "blockd://blocked";

/// Validated policy ready for use by the core engine
#[derive(Debug, Clone)]
pub struct Policy {
    pub service: ServiceConfig,
    pub blocking: BlockingPolicy,
    pub challenges: ChallengePolicy,
    pub tracking: TrackingPolicy,
}

impl Policy {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        Self {
            service: ServiceConfig::from_raw(raw.service),
            blocking: BlockingPolicy::from_raw(raw.blocking),
            challenges: ChallengePolicy::from_raw(raw.challenges),
            tracking: TrackingPolicy::from_raw(raw.tracking),
        }
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self::from_raw(RawConfig::empty())
    }
}

/// Service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub socket_path: PathBuf,
    pub data_dir: PathBuf,
    pub blocked_page_url: String,
    pub tick_interval: Duration,
}

impl ServiceConfig {
    fn from_raw(raw: RawServiceConfig) -> Self {
        Self {
            socket_path: raw.socket_path.unwrap_or_else(socket_path_without_env),
            data_dir: raw.data_dir.unwrap_or_else(data_dir_without_env),
            blocked_page_url: raw
                .blocked_page_url
                .unwrap_or_else(|| DEFAULT_BLOCKED_PAGE_URL.to_string()),
            tick_interval: Duration::from_millis(raw.tick_interval_ms.unwrap_or(1000)),
        }
    }
}

/// Block lists and default durations
#[derive(Debug, Clone)]
pub struct BlockingPolicy {
    pub blocked_domains: Vec<Domain>,
    pub focus_domains: Vec<Domain>,
    pub default_focus: Duration,
    pub default_grant: Duration,
    pub default_extend: Duration,
}

impl BlockingPolicy {
    fn from_raw(raw: RawBlockingConfig) -> Self {
        let focus_domains = match raw.focus_domains {
            Some(list) => parse_domains(&list),
            None => parse_domains(DEFAULT_FOCUS_DOMAINS),
        };

        Self {
            blocked_domains: parse_domains(&raw.blocked_domains.unwrap_or_default()),
            focus_domains,
            default_focus: minutes(raw.default_focus_minutes.unwrap_or(30)),
            default_grant: minutes(raw.default_grant_minutes.unwrap_or(15)),
            default_extend: minutes(raw.default_extend_minutes.unwrap_or(5)),
        }
    }
}

/// Challenge sizes and lockout rules
#[derive(Debug, Clone)]
pub struct ChallengePolicy {
    pub unblock_problems: usize,
    pub unblock_difficulty: Difficulty,
    pub focus_deactivation_problems: usize,
    pub focus_deactivation_difficulty: Difficulty,
    pub max_attempts: u32,
    pub cooldown: Duration,
    pub ttl: Duration,
}

impl ChallengePolicy {
    fn from_raw(raw: RawChallengeConfig) -> Self {
        Self {
            unblock_problems: raw.unblock_problems.unwrap_or(2),
            unblock_difficulty: raw.unblock_difficulty.unwrap_or(Difficulty::Medium),
            focus_deactivation_problems: raw.focus_deactivation_problems.unwrap_or(3),
            focus_deactivation_difficulty: raw
                .focus_deactivation_difficulty
                .unwrap_or(Difficulty::Medium),
            max_attempts: raw.max_attempts.unwrap_or(3),
            cooldown: Duration::from_secs(raw.cooldown_seconds.unwrap_or(30)),
            ttl: Duration::from_secs(raw.ttl_seconds.unwrap_or(600)),
        }
    }
}

impl Default for ChallengePolicy {
    fn default() -> Self {
        Self::from_raw(RawChallengeConfig::default())
    }
}

/// Usage tracking settings
#[derive(Debug, Clone)]
pub struct TrackingPolicy {
    pub enabled: bool,
    pub flush_interval: Duration,
    pub retention_days: u32,
}

impl TrackingPolicy {
    fn from_raw(raw: RawTrackingConfig) -> Self {
        Self {
            enabled: raw.enabled.unwrap_or(true),
            flush_interval: Duration::from_secs(raw.flush_interval_seconds.unwrap_or(30)),
            retention_days: raw.retention_days.unwrap_or(30),
        }
    }
}

impl Default for TrackingPolicy {
    fn default() -> Self {
        Self::from_raw(RawTrackingConfig::default())
    }
}

/// Parse a validated list, keeping the first occurrence of each domain
fn parse_domains<S: AsRef<str>>(list: &[S]) -> Vec<Domain> {
    let mut out: Vec<Domain> = Vec::new();
    for domain in list.iter().filter_map(|s| Domain::parse(s.as_ref()).ok()) {
        if !out.contains(&domain) {
            out.push(domain);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let policy = Policy::default();

        assert_eq!(policy.blocking.focus_domains.len(), 8);
        assert!(policy.blocking.blocked_domains.is_empty());
        assert_eq!(policy.blocking.default_focus, Duration::from_secs(30 * 60));
        assert_eq!(policy.blocking.default_grant, Duration::from_secs(15 * 60));
        assert_eq!(policy.blocking.default_extend, Duration::from_secs(5 * 60));

        assert_eq!(policy.challenges.unblock_problems, 2);
        assert_eq!(policy.challenges.focus_deactivation_problems, 3);
        assert_eq!(policy.challenges.max_attempts, 3);
        assert_eq!(policy.challenges.cooldown, Duration::from_secs(30));

        assert!(policy.tracking.enabled);
        assert_eq!(policy.tracking.flush_interval, Duration::from_secs(30));
        assert_eq!(policy.tracking.retention_days, 30);
        assert_eq!(policy.service.blocked_page_url, DEFAULT_BLOCKED_PAGE_URL);
    }

    #[test]
    fn test_domains_are_normalized() {
        let mut raw = RawConfig::empty();
        raw.blocking.blocked_domains = Some(vec!["WWW.Reddit.com".into()]);
        raw.blocking.focus_domains = Some(vec![]);

        let policy = Policy::from_raw(raw);
        assert_eq!(policy.blocking.blocked_domains[0].as_str(), "reddit.com");
        assert!(policy.blocking.focus_domains.is_empty());
    }
}
