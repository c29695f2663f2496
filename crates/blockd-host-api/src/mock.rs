//! Mock browser host for testing

use async_trait::async_trait;
use blockd_api::RuleSet;
use blockd_util::TabId;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::{HostError, HostResult, RuleInstaller, TabDirectory, TabInfo};

/// Records every installed rule set
#[derive(Clone, Default)]
pub struct MockRuleInstaller {
    installs: Arc<Mutex<Vec<RuleSet>>>,

    /// Configure install to fail
    pub fail_install: Arc<Mutex<bool>>,
}

impl MockRuleInstaller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful installs so far
    pub fn install_count(&self) -> usize {
        self.installs.lock().unwrap().len()
    }

    /// Most recently installed rule set
    pub fn current(&self) -> Option<RuleSet> {
        self.installs.lock().unwrap().last().cloned()
    }

    pub fn history(&self) -> Vec<RuleSet> {
        self.installs.lock().unwrap().clone()
    }

    pub fn set_fail(&self, fail: bool) {
        *self.fail_install.lock().unwrap() = fail;
    }
}

#[async_trait]
impl RuleInstaller for MockRuleInstaller {
    async fn install(&self, rules: &RuleSet) -> HostResult<()> {
        if *self.fail_install.lock().unwrap() {
            return Err(HostError::InstallFailed("Mock install failure".into()));
        }
        self.installs.lock().unwrap().push(rules.clone());
        Ok(())
    }
}

/// In-memory tab table
#[derive(Clone, Default)]
pub struct MockTabs {
    tabs: Arc<Mutex<BTreeMap<TabId, TabInfo>>>,
    navigations: Arc<Mutex<Vec<(TabId, String)>>>,
}

impl MockTabs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open or replace a tab; an active tab deactivates the others
    pub fn open(&self, id: i64, url: &str, active: bool) {
        let mut tabs = self.tabs.lock().unwrap();
        if active {
            for tab in tabs.values_mut() {
                tab.active = false;
            }
        }
        tabs.insert(
            TabId(id),
            TabInfo {
                id: TabId(id),
                url: url.to_string(),
                active,
            },
        );
    }

    pub fn close(&self, id: i64) {
        self.tabs.lock().unwrap().remove(&TabId(id));
    }

    pub fn url_of(&self, id: i64) -> Option<String> {
        self.tabs.lock().unwrap().get(&TabId(id)).map(|t| t.url.clone())
    }

    /// Every `update_tab` call in order
    pub fn navigations(&self) -> Vec<(TabId, String)> {
        self.navigations.lock().unwrap().clone()
    }
}

#[async_trait]
impl TabDirectory for MockTabs {
    async fn query_active_tab(&self) -> HostResult<Option<TabInfo>> {
        Ok(self
            .tabs
            .lock()
            .unwrap()
            .values()
            .find(|t| t.active)
            .cloned())
    }

    async fn query_tabs(&self) -> HostResult<Vec<TabInfo>> {
        Ok(self.tabs.lock().unwrap().values().cloned().collect())
    }

    async fn update_tab(&self, tab: TabId, url: &str) -> HostResult<()> {
        let mut tabs = self.tabs.lock().unwrap();
        let entry = tabs.get_mut(&tab).ok_or(HostError::TabNotFound(tab))?;
        entry.url = url.to_string();
        self.navigations.lock().unwrap().push((tab, url.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_installer_records_and_fails() {
        let installer = MockRuleInstaller::new();
        installer.install(&RuleSet::default()).await.unwrap();
        assert_eq!(installer.install_count(), 1);

        installer.set_fail(true);
        assert!(installer.install(&RuleSet::default()).await.is_err());
        assert_eq!(installer.install_count(), 1);
    }

    #[tokio::test]
    async fn mock_tabs_active_and_update() {
        let tabs = MockTabs::new();
        tabs.open(1, "https://a.com", true);
        tabs.open(2, "https://b.com", true);

        let active = tabs.query_active_tab().await.unwrap().unwrap();
        assert_eq!(active.id, TabId(2));

        tabs.update_tab(TabId(1), "https://c.com").await.unwrap();
        assert_eq!(tabs.url_of(1).as_deref(), Some("https://c.com"));
        assert_eq!(tabs.navigations().len(), 1);

        assert!(matches!(
            tabs.update_tab(TabId(9), "https://x.com").await,
            Err(HostError::TabNotFound(_))
        ));
    }
}
