//! Raw configuration schema (as parsed from TOML)

use blockd_api::Difficulty;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Service-level settings
    #[serde(default)]
    pub service: RawServiceConfig,

    /// Block lists and default durations
    #[serde(default)]
    pub blocking: RawBlockingConfig,

    /// Math challenge settings
    #[serde(default)]
    pub challenges: RawChallengeConfig,

    /// Usage tracking settings
    #[serde(default)]
    pub tracking: RawTrackingConfig,
}

impl RawConfig {
    /// A config with every section at its defaults
    pub fn empty() -> Self {
        Self {
            config_version: crate::CURRENT_CONFIG_VERSION,
            service: RawServiceConfig::default(),
            blocking: RawBlockingConfig::default(),
            challenges: RawChallengeConfig::default(),
            tracking: RawTrackingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawServiceConfig {
    /// IPC socket path
    pub socket_path: Option<PathBuf>,

    /// Data directory for the store and the exported rule file
    pub data_dir: Option<PathBuf>,

    /// Page blocked navigations are redirected to
    pub blocked_page_url: Option<String>,

    /// How often scheduled tasks are checked
    pub tick_interval_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawBlockingConfig {
    /// Seed for the individual block list; only used while nothing is persisted
    pub blocked_domains: Option<Vec<String>>,

    /// Seed for the focus set; only used while nothing is persisted
    pub focus_domains: Option<Vec<String>>,

    pub default_focus_minutes: Option<u64>,

    pub default_grant_minutes: Option<u64>,

    pub default_extend_minutes: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawChallengeConfig {
    pub unblock_problems: Option<usize>,

    pub unblock_difficulty: Option<Difficulty>,

    pub focus_deactivation_problems: Option<usize>,

    pub focus_deactivation_difficulty: Option<Difficulty>,

    /// Submissions allowed per challenge
    pub max_attempts: Option<u32>,

    /// Lockout after the last attempt fails
    pub cooldown_seconds: Option<u64>,

    /// Unanswered challenges are discarded after this long
    pub ttl_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawTrackingConfig {
    pub enabled: Option<bool>,

    pub flush_interval_seconds: Option<u64>,

    /// Days of usage history kept
    pub retention_days: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_config() {
        let toml_str = r#"
            config_version = 1

            [service]
            blocked_page_url = "chrome-extension://abc/blocked-redirect.html"
            tick_interval_ms = 500

            [blocking]
            blocked_domains = ["reddit.com"]
            focus_domains = ["youtube.com", "twitch.tv"]
            default_focus_minutes = 45

            [challenges]
            unblock_difficulty = "hard"
            max_attempts = 5

            [tracking]
            retention_days = 14
        "#;

        let config: RawConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.service.tick_interval_ms, Some(500));
        assert_eq!(config.blocking.focus_domains.as_ref().unwrap().len(), 2);
        assert_eq!(config.challenges.unblock_difficulty, Some(Difficulty::Hard));
        assert_eq!(config.challenges.max_attempts, Some(5));
        assert_eq!(config.tracking.retention_days, Some(14));
        assert!(config.tracking.enabled.is_none());
    }

    #[test]
    fn sections_are_optional() {
        let config: RawConfig = toml::from_str("config_version = 1").unwrap();
        assert!(config.blocking.blocked_domains.is_none());
        assert!(config.service.socket_path.is_none());
    }
}
