//! Configuration validation

use blockd_util::Domain;
use std::collections::HashSet;
use thiserror::Error;

use crate::schema::RawConfig;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("{field}: invalid domain '{value}': {message}")]
    InvalidDomain {
        field: &'static str,
        value: String,
        message: String,
    },

    #[error("{field}: duplicate domain '{domain}'")]
    DuplicateDomain { field: &'static str, domain: String },

    #[error("{field} must be greater than zero")]
    ZeroValue { field: &'static str },

    #[error("Invalid blocked page URL '{0}'")]
    InvalidBlockedPageUrl(String),

    #[error("Global config error: {0}")]
    GlobalError(String),
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if let Some(domains) = &config.blocking.blocked_domains {
        errors.extend(validate_domains("blocking.blocked_domains", domains));
    }
    if let Some(domains) = &config.blocking.focus_domains {
        errors.extend(validate_domains("blocking.focus_domains", domains));
    }

    let positive: [(&'static str, Option<u64>); 9] = [
        ("blocking.default_focus_minutes", config.blocking.default_focus_minutes),
        ("blocking.default_grant_minutes", config.blocking.default_grant_minutes),
        ("blocking.default_extend_minutes", config.blocking.default_extend_minutes),
        (
            "challenges.unblock_problems",
            config.challenges.unblock_problems.map(|n| n as u64),
        ),
        (
            "challenges.focus_deactivation_problems",
            config.challenges.focus_deactivation_problems.map(|n| n as u64),
        ),
        (
            "challenges.max_attempts",
            config.challenges.max_attempts.map(u64::from),
        ),
        ("challenges.ttl_seconds", config.challenges.ttl_seconds),
        (
            "tracking.flush_interval_seconds",
            config.tracking.flush_interval_seconds,
        ),
        ("service.tick_interval_ms", config.service.tick_interval_ms),
    ];
    for (field, value) in positive {
        if value == Some(0) {
            errors.push(ValidationError::ZeroValue { field });
        }
    }

    if config.tracking.retention_days == Some(0) {
        errors.push(ValidationError::ZeroValue {
            field: "tracking.retention_days",
        });
    }

    if let Some(url) = &config.service.blocked_page_url {
        if !url.contains("://") || url.contains('?') || url.contains('#') {
            errors.push(ValidationError::InvalidBlockedPageUrl(url.clone()));
        }
    }

    errors
}

/// Validate a domain list, reporting bad entries and duplicates after normalization
fn validate_domains(field: &'static str, domains: &[String]) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for value in domains {
        match Domain::parse(value) {
            Ok(domain) => {
                if !seen.insert(domain.clone()) {
                    errors.push(ValidationError::DuplicateDomain {
                        field,
                        domain: domain.to_string(),
                    });
                }
            }
            Err(e) => errors.push(ValidationError::InvalidDomain {
                field,
                value: value.clone(),
                message: e.to_string(),
            }),
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_domain_detection() {
        let mut config = RawConfig::empty();
        config.blocking.blocked_domains =
            Some(vec!["reddit.com".into(), "www.Reddit.com".into()]);

        let errors = validate_config(&config);
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            ValidationError::DuplicateDomain { domain, .. } if domain == "reddit.com"
        ));
    }

    #[test]
    fn test_invalid_domain() {
        let mut config = RawConfig::empty();
        config.blocking.focus_domains = Some(vec!["not a domain".into()]);

        let errors = validate_config(&config);
        assert!(matches!(
            &errors[0],
            ValidationError::InvalidDomain { field: "blocking.focus_domains", .. }
        ));
    }

    #[test]
    fn test_zero_values_rejected() {
        let mut config = RawConfig::empty();
        config.tracking.flush_interval_seconds = Some(0);
        config.challenges.max_attempts = Some(0);

        let errors = validate_config(&config);
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_blocked_page_url() {
        let mut config = RawConfig::empty();
        config.service.blocked_page_url = Some("blocked.html?x=1".into());
        assert_eq!(validate_config(&config).len(), 1);

        config.service.blocked_page_url =
            Some("chrome-extension://abc/blocked-redirect.html".into());
        assert!(validate_config(&config).is_empty());
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate_config(&RawConfig::empty()).is_empty());
    }
}
