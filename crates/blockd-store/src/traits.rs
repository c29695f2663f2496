//! Store trait definitions

use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fmt;

use crate::{AuditEvent, StoreResult};

/// Keys of the persisted records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKey {
    /// Individually blocked domains
    BlockedDomains,
    /// Domains blocked while focus mode is active
    FocusDomains,
    /// `{active, end_time}`
    FocusStatus,
    /// Domain -> expiry of temporary access
    TempAccess,
    /// Date -> domain -> usage
    UsageData,
}

impl StoreKey {
    pub const ALL: [StoreKey; 5] = [
        StoreKey::BlockedDomains,
        StoreKey::FocusDomains,
        StoreKey::FocusStatus,
        StoreKey::TempAccess,
        StoreKey::UsageData,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKey::BlockedDomains => "blocked_domains",
            StoreKey::FocusDomains => "focus_domains",
            StoreKey::FocusStatus => "focus_status",
            StoreKey::TempAccess => "temp_access",
            StoreKey::UsageData => "usage_data",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A set of key/value pairs read or written together
pub type Record = BTreeMap<StoreKey, serde_json::Value>;

/// Main store trait
pub trait Store: Send + Sync {
    // Keyed records

    /// Read the given keys; missing keys are absent from the result
    fn get(&self, keys: &[StoreKey]) -> StoreResult<Record>;

    /// Write every pair in `record` atomically
    fn set(&self, record: Record) -> StoreResult<()>;

    /// Delete the given keys
    fn remove(&self, keys: &[StoreKey]) -> StoreResult<()>;

    // Audit log

    /// Append an audit event
    fn append_audit(&self, event: AuditEvent) -> StoreResult<()>;

    /// Get recent audit events, newest first
    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>>;

    // Health

    /// Check if store is healthy
    fn is_healthy(&self) -> bool;
}

/// Typed access to single records
pub trait StoreExt {
    fn load<T: DeserializeOwned>(&self, key: StoreKey) -> StoreResult<Option<T>>;

    fn save<T: Serialize>(&self, key: StoreKey, value: &T) -> StoreResult<()>;
}

impl<S: Store + ?Sized> StoreExt for S {
    fn load<T: DeserializeOwned>(&self, key: StoreKey) -> StoreResult<Option<T>> {
        match self.get(&[key])?.remove(&key) {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    fn save<T: Serialize>(&self, key: StoreKey, value: &T) -> StoreResult<()> {
        let mut record = Record::new();
        record.insert(key, serde_json::to_value(value)?);
        self.set(record)
    }
}
