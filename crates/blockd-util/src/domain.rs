//! Canonical domain names
//!
//! Every domain that enters blockd, whether typed by the user, read back from
//! the store, or extracted from a tab URL, goes through [`Domain::parse`].
//! The canonical form is lowercase with no scheme, path, port or leading
//! `www.` label, so `WWW.Example.com/feed` and `example.com` compare equal.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// URL schemes that belong to the browser itself and are never tracked
const INTERNAL_SCHEMES: &[&str] = &[
    "about",
    "chrome",
    "chrome-extension",
    "chrome-search",
    "devtools",
    "edge",
    "moz-extension",
    "view-source",
];

const MAX_DOMAIN_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("domain is empty")]
    Empty,

    #[error("domain '{0}' is too long")]
    TooLong(String),

    #[error("domain '{0}' must contain at least one dot")]
    MissingDot(String),

    #[error("domain '{domain}' has an invalid label '{label}'")]
    InvalidLabel { domain: String, label: String },
}

/// A normalized internet domain
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Domain(String);

impl Domain {
    /// Normalize and validate user or URL input.
    ///
    /// Accepts bare hosts (`example.com`) as well as URL-like input
    /// (`https://www.example.com/path?q=1`).
    pub fn parse(input: &str) -> Result<Self, DomainError> {
        let mut host = input.trim().to_ascii_lowercase();

        if let Some(idx) = host.find("://") {
            host = host[idx + 3..].to_string();
        }
        if let Some(idx) = host.find(['/', '?', '#']) {
            host.truncate(idx);
        }
        if let Some(idx) = host.rfind('@') {
            host = host[idx + 1..].to_string();
        }
        if let Some(idx) = host.find(':') {
            host.truncate(idx);
        }
        let host = host.strip_prefix("www.").unwrap_or(&host);
        let host = host.trim_end_matches('.');

        if host.is_empty() {
            return Err(DomainError::Empty);
        }
        if host.len() > MAX_DOMAIN_LEN {
            return Err(DomainError::TooLong(host.to_string()));
        }
        if !host.contains('.') {
            return Err(DomainError::MissingDot(host.to_string()));
        }

        for label in host.split('.') {
            let valid = !label.is_empty()
                && label.len() <= MAX_LABEL_LEN
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-');
            if !valid {
                return Err(DomainError::InvalidLabel {
                    domain: host.to_string(),
                    label: label.to_string(),
                });
            }
        }

        Ok(Self(host.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Domain {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Domain {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Domain> for String {
    fn from(d: Domain) -> Self {
        d.0
    }
}

/// Extract the trackable domain from a tab URL.
///
/// Returns `None` for browser-internal pages, URLs without a host, and
/// anything that does not normalize to a valid domain.
pub fn extract_domain(url: &str) -> Option<Domain> {
    let url = url.trim();
    let (scheme, rest) = url.split_once(':')?;
    let scheme = scheme.to_ascii_lowercase();

    if INTERNAL_SCHEMES.contains(&scheme.as_str()) {
        return None;
    }
    if scheme != "http" && scheme != "https" {
        return None;
    }

    let rest = rest.strip_prefix("//")?;
    Domain::parse(rest).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_normalizes_case_and_www() {
        let d = Domain::parse("  WWW.Example.COM ").unwrap();
        assert_eq!(d.as_str(), "example.com");
        assert_eq!(d, Domain::parse("example.com").unwrap());
    }

    #[test]
    fn parse_strips_url_parts() {
        let d = Domain::parse("https://www.reddit.com/r/rust?sort=new").unwrap();
        assert_eq!(d.as_str(), "reddit.com");

        let d = Domain::parse("news.ycombinator.com:443").unwrap();
        assert_eq!(d.as_str(), "news.ycombinator.com");
    }

    #[test]
    fn only_leading_www_is_stripped() {
        let d = Domain::parse("awww.com").unwrap();
        assert_eq!(d.as_str(), "awww.com");

        let d = Domain::parse("mail.www.example.org").unwrap();
        assert_eq!(d.as_str(), "mail.www.example.org");
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert_eq!(Domain::parse(""), Err(DomainError::Empty));
        assert_eq!(Domain::parse("www."), Err(DomainError::Empty));
        assert!(matches!(Domain::parse("localhost"), Err(DomainError::MissingDot(_))));
        assert!(matches!(
            Domain::parse("bad_domain.com"),
            Err(DomainError::InvalidLabel { .. })
        ));
        assert!(matches!(
            Domain::parse("example..com"),
            Err(DomainError::InvalidLabel { .. })
        ));
        assert!(matches!(
            Domain::parse("-example.com"),
            Err(DomainError::InvalidLabel { .. })
        ));
    }

    #[test]
    fn extract_domain_from_urls() {
        assert_eq!(
            extract_domain("https://www.youtube.com/watch?v=abc"),
            Some(Domain::parse("youtube.com").unwrap())
        );
        assert_eq!(
            extract_domain("http://docs.rs/tokio"),
            Some(Domain::parse("docs.rs").unwrap())
        );
    }

    #[test]
    fn extract_domain_ignores_internal_pages() {
        assert_eq!(extract_domain("chrome://extensions"), None);
        assert_eq!(extract_domain("chrome-extension://abcdef/popup.html"), None);
        assert_eq!(extract_domain("edge://settings"), None);
        assert_eq!(extract_domain("about:blank"), None);
        assert_eq!(extract_domain("file:///home/user/index.html"), None);
        assert_eq!(extract_domain("not a url"), None);
        assert_eq!(extract_domain(""), None);
    }

    #[test]
    fn domain_serde_normalizes() {
        let d: Domain = serde_json::from_str("\"WWW.Twitch.tv\"").unwrap();
        assert_eq!(d.as_str(), "twitch.tv");
        assert_eq!(serde_json::to_string(&d).unwrap(), "\"twitch.tv\"");

        let bad: Result<Domain, _> = serde_json::from_str("\"nope\"");
        assert!(bad.is_err());
    }
}
