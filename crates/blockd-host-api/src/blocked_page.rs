//! URLs of the informational page blocked navigations land on

use blockd_api::BlockReason;
use blockd_util::Domain;

/// Builds and recognizes blocked-page URLs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockedPage {
    base: String,
}

impl BlockedPage {
    pub fn new(base: impl Into<String>) -> Self {
        let base = base.into();
        let base = base.trim_end_matches(['?', '&']).to_string();
        Self { base }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Redirect target for a blocked domain
    pub fn redirect_url(&self, domain: &Domain, reason: BlockReason) -> String {
        match reason {
            BlockReason::Individual => format!("{}?site={}", self.base, domain),
            BlockReason::Focus => format!("{}?site={}&focus=true", self.base, domain),
        }
    }

    /// Declarative filter matching the domain and all its subdomains
    pub fn url_filter(domain: &Domain) -> String {
        format!("||{}^", domain)
    }

    /// Where a tab sitting on the blocked page goes once access is granted
    pub fn site_url(domain: &Domain) -> String {
        format!("https://{}", domain)
    }

    /// The domain a blocked-page URL was shown for, if `url` is one
    pub fn blocked_site(&self, url: &str) -> Option<Domain> {
        let rest = url.strip_prefix(&self.base)?;
        let query = rest.strip_prefix('?')?;
        let query = query.split('#').next().unwrap_or(query);

        query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(key, _)| *key == "site")
            .and_then(|(_, value)| Domain::parse(&percent_decode(value)).ok())
    }
}

/// Minimal `%XX` decoding; domains never need more
fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(byte) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
