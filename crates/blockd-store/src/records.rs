//! Typed persisted records
//!
//! Records are read leniently: entries that no longer parse are dropped with
//! a warning, and legacy keys that differ only by a leading `www.` are folded
//! onto their canonical domain. Callers learn about such repairs through the
//! `repaired` flag so they can write the cleaned record back.

use blockd_api::{DayUsage, DomainUsage};
use blockd_util::Domain;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

use crate::{Store, StoreExt, StoreKey, StoreResult};

/// Persisted focus mode status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusStatusRecord {
    pub active: bool,
    pub end_time: Option<DateTime<Local>>,
}

/// Temporary access grants by domain
pub type TempAccessMap = BTreeMap<Domain, DateTime<Local>>;

/// Usage history keyed by `YYYY-MM-DD`
pub type UsageHistory = BTreeMap<String, DayUsage>;

/// A value read from the store plus whether normalization changed it
#[derive(Debug, Clone, Default)]
pub struct Loaded<T> {
    pub value: T,
    pub repaired: bool,
}

/// Load a domain list; `None` when the key has never been written
pub fn load_domain_list<S: Store + ?Sized>(
    store: &S,
    key: StoreKey,
) -> StoreResult<Option<Loaded<Vec<Domain>>>> {
    let Some(raw) = store.load::<Vec<String>>(key)? else {
        return Ok(None);
    };

    let mut repaired = false;
    let mut domains: Vec<Domain> = Vec::with_capacity(raw.len());
    for entry in &raw {
        match Domain::parse(entry) {
            Ok(domain) => {
                if domain.as_str() != entry {
                    repaired = true;
                }
                if domains.contains(&domain) {
                    repaired = true;
                } else {
                    domains.push(domain);
                }
            }
            Err(e) => {
                warn!(key = %key, entry = %entry, error = %e, "Dropping invalid stored domain");
                repaired = true;
            }
        }
    }

    Ok(Some(Loaded {
        value: domains,
        repaired,
    }))
}

pub fn save_domain_list<S: Store + ?Sized>(
    store: &S,
    key: StoreKey,
    domains: &[Domain],
) -> StoreResult<()> {
    store.save(key, &domains)
}

pub fn load_focus_status<S: Store + ?Sized>(store: &S) -> StoreResult<Option<FocusStatusRecord>> {
    store.load(StoreKey::FocusStatus)
}

pub fn save_focus_status<S: Store + ?Sized>(
    store: &S,
    status: &FocusStatusRecord,
) -> StoreResult<()> {
    store.save(StoreKey::FocusStatus, status)
}

/// Load grants, folding `www.`-prefixed legacy keys onto the canonical domain
///
/// When both forms exist the later expiry wins.
pub fn load_temp_access<S: Store + ?Sized>(store: &S) -> StoreResult<Loaded<TempAccessMap>> {
    let raw: BTreeMap<String, DateTime<Local>> =
        store.load(StoreKey::TempAccess)?.unwrap_or_default();

    let mut repaired = false;
    let mut grants = TempAccessMap::new();
    for (key, expiry) in raw {
        let domain = match Domain::parse(&key) {
            Ok(d) => d,
            Err(e) => {
                warn!(entry = %key, error = %e, "Dropping invalid stored grant");
                repaired = true;
                continue;
            }
        };
        if domain.as_str() != key {
            repaired = true;
        }
        grants
            .entry(domain)
            .and_modify(|e| *e = (*e).max(expiry))
            .or_insert(expiry);
    }

    Ok(Loaded {
        value: grants,
        repaired,
    })
}

pub fn save_temp_access<S: Store + ?Sized>(store: &S, grants: &TempAccessMap) -> StoreResult<()> {
    store.save(StoreKey::TempAccess, grants)
}

/// Load usage history, merging days recorded under non-canonical domains
pub fn load_usage<S: Store + ?Sized>(store: &S) -> StoreResult<Loaded<UsageHistory>> {
    let raw: BTreeMap<String, BTreeMap<String, DomainUsage>> =
        store.load(StoreKey::UsageData)?.unwrap_or_default();

    let mut repaired = false;
    let mut history = UsageHistory::new();
    for (date, sites) in raw {
        let day = history.entry(date).or_default();
        for (key, usage) in sites {
            let Ok(domain) = Domain::parse(&key) else {
                repaired = true;
                continue;
            };
            if domain.as_str() != key {
                repaired = true;
            }
            merge_usage(day, domain, usage);
        }
    }

    Ok(Loaded {
        value: history,
        repaired,
    })
}

pub fn save_usage<S: Store + ?Sized>(store: &S, history: &UsageHistory) -> StoreResult<()> {
    store.save(StoreKey::UsageData, history)
}

fn merge_usage(day: &mut DayUsage, domain: Domain, usage: DomainUsage) {
    let entry = day.entry(domain).or_default();
    entry.total_time += usage.total_time;
    entry.sessions.extend(usage.sessions);
    entry.sessions.sort_by_key(|s| s.timestamp);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use blockd_api::SessionEntry;
    use chrono::TimeZone;
    use serde_json::json;

    fn domain(s: &str) -> Domain {
        Domain::parse(s).unwrap()
    }

    #[test]
    fn domain_list_absent_vs_empty() {
        let store = MemoryStore::new();
        assert!(load_domain_list(&store, StoreKey::BlockedDomains).unwrap().is_none());

        save_domain_list(&store, StoreKey::BlockedDomains, &[]).unwrap();
        let loaded = load_domain_list(&store, StoreKey::BlockedDomains)
            .unwrap()
            .unwrap();
        assert!(loaded.value.is_empty());
        assert!(!loaded.repaired);
    }

    #[test]
    fn domain_list_is_normalized() {
        let store = MemoryStore::new();
        store.put_raw(
            StoreKey::BlockedDomains,
            json!(["reddit.com", "www.reddit.com", "bad domain", "x.com"]),
        );

        let loaded = load_domain_list(&store, StoreKey::BlockedDomains)
            .unwrap()
            .unwrap();
        assert_eq!(loaded.value, vec![domain("reddit.com"), domain("x.com")]);
        assert!(loaded.repaired);
    }

    #[test]
    fn temp_access_folds_legacy_www_keys() {
        let store = MemoryStore::new();
        let early = Local.with_ymd_and_hms(2025, 1, 1, 10, 0, 0).unwrap();
        let late = Local.with_ymd_and_hms(2025, 1, 1, 10, 15, 0).unwrap();
        store.put_raw(
            StoreKey::TempAccess,
            json!({
                "youtube.com": early.to_rfc3339(),
                "www.youtube.com": late.to_rfc3339(),
            }),
        );

        let loaded = load_temp_access(&store).unwrap();
        assert!(loaded.repaired);
        assert_eq!(loaded.value.len(), 1);
        assert_eq!(loaded.value[&domain("youtube.com")], late);
    }

    #[test]
    fn usage_merges_legacy_keys() {
        let store = MemoryStore::new();
        let t = Local.with_ymd_and_hms(2025, 1, 1, 10, 0, 0).unwrap();
        let session = |secs| SessionEntry {
            timestamp: t,
            duration: secs,
        };
        let mut day = BTreeMap::new();
        day.insert(
            "github.com".to_string(),
            DomainUsage {
                total_time: 10,
                sessions: vec![session(10)],
            },
        );
        day.insert(
            "www.github.com".to_string(),
            DomainUsage {
                total_time: 5,
                sessions: vec![session(5)],
            },
        );
        let mut raw = BTreeMap::new();
        raw.insert("2025-01-01".to_string(), day);
        store.save(StoreKey::UsageData, &raw).unwrap();

        let loaded = load_usage(&store).unwrap();
        assert!(loaded.repaired);
        let usage = &loaded.value["2025-01-01"][&domain("github.com")];
        assert_eq!(usage.total_time, 15);
        assert_eq!(usage.sessions.len(), 2);
    }

    #[test]
    fn focus_status_roundtrip() {
        let store = MemoryStore::new();
        assert!(load_focus_status(&store).unwrap().is_none());

        let status = FocusStatusRecord {
            active: true,
            end_time: Some(Local.with_ymd_and_hms(2025, 1, 1, 11, 0, 0).unwrap()),
        };
        save_focus_status(&store, &status).unwrap();
        assert_eq!(load_focus_status(&store).unwrap(), Some(status));
    }
}
