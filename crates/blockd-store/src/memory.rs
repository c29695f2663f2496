//! In-memory store with failure injection

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::{AuditEvent, Record, Store, StoreError, StoreKey, StoreResult};

/// Volatile store for tests and dry runs
///
/// Clones share contents, so a test can keep a handle while the engine owns
/// another and inspect what was persisted.
#[derive(Clone, Default)]
pub struct MemoryStore {
    records: Arc<Mutex<BTreeMap<StoreKey, serde_json::Value>>>,
    audits: Arc<Mutex<Vec<AuditEvent>>>,

    /// Configure reads to fail
    pub fail_reads: Arc<AtomicBool>,

    /// Configure writes to fail
    pub fail_writes: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Raw value currently stored under `key`
    pub fn raw(&self, key: StoreKey) -> Option<serde_json::Value> {
        self.records.lock().unwrap().get(&key).cloned()
    }

    /// Overwrite a raw value, bypassing failure injection
    pub fn put_raw(&self, key: StoreKey, value: serde_json::Value) {
        self.records.lock().unwrap().insert(key, value);
    }

    pub fn audits(&self) -> Vec<AuditEvent> {
        self.audits.lock().unwrap().clone()
    }

    fn check(&self, flag: &AtomicBool, op: &str) -> StoreResult<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("mock {} failure", op)));
        }
        Ok(())
    }
}

impl Store for MemoryStore {
    fn get(&self, keys: &[StoreKey]) -> StoreResult<Record> {
        self.check(&self.fail_reads, "read")?;
        let records = self.records.lock().unwrap();
        Ok(keys
            .iter()
            .filter_map(|k| records.get(k).map(|v| (*k, v.clone())))
            .collect())
    }

    fn set(&self, record: Record) -> StoreResult<()> {
        self.check(&self.fail_writes, "write")?;
        self.records.lock().unwrap().extend(record);
        Ok(())
    }

    fn remove(&self, keys: &[StoreKey]) -> StoreResult<()> {
        self.check(&self.fail_writes, "write")?;
        let mut records = self.records.lock().unwrap();
        for key in keys {
            records.remove(key);
        }
        Ok(())
    }

    fn append_audit(&self, mut event: AuditEvent) -> StoreResult<()> {
        self.check(&self.fail_writes, "write")?;
        let mut audits = self.audits.lock().unwrap();
        event.id = audits.len() as i64 + 1;
        audits.push(event);
        Ok(())
    }

    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>> {
        self.check(&self.fail_reads, "read")?;
        Ok(self
            .audits
            .lock()
            .unwrap()
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }

    fn is_healthy(&self) -> bool {
        !self.fail_reads.load(Ordering::SeqCst) && !self.fail_writes.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StoreExt;

    #[test]
    fn shared_between_clones() {
        let store = MemoryStore::new();
        let handle = store.clone();

        store.save(StoreKey::BlockedDomains, &vec!["x.com"]).unwrap();
        assert!(handle.raw(StoreKey::BlockedDomains).is_some());
    }

    #[test]
    fn failure_injection() {
        let store = MemoryStore::new();
        store.set_fail_writes(true);

        assert!(store.save(StoreKey::FocusDomains, &vec!["a.com"]).is_err());
        assert!(!store.is_healthy());
        assert!(store.raw(StoreKey::FocusDomains).is_none());

        store.set_fail_writes(false);
        store.set_fail_reads(true);
        assert!(store.get(&[StoreKey::FocusDomains]).is_err());
    }
}
