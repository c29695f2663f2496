//! Browser bridge host
//!
//! The browser extension connects over IPC like any other client. This
//! module is the daemon's side of that link: rule sets and tab navigations
//! leave as events, and the extension's tab reports are mirrored so the
//! engine can query tabs without a round trip.

use async_trait::async_trait;
use blockd_api::{EventPayload, RuleSet};
use blockd_host_api::{HostError, HostResult, RuleInstaller, TabDirectory, TabInfo};
use blockd_util::TabId;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// File name of the last installed rule set inside the data dir
pub const RULES_FILE: &str = "rules.json";

/// Host adapter backed by the connected browser extension
pub struct BrowserBridge {
    tabs: Arc<Mutex<BTreeMap<TabId, TabInfo>>>,
    rules_path: Option<PathBuf>,
    event_tx: mpsc::UnboundedSender<EventPayload>,
    event_rx: Arc<Mutex<Option<mpsc::UnboundedReceiver<EventPayload>>>>,
}

impl BrowserBridge {
    /// `rules_path` receives a JSON copy of every installed rule set
    pub fn new(rules_path: Option<PathBuf>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        Self {
            tabs: Arc::new(Mutex::new(BTreeMap::new())),
            rules_path,
            event_tx: tx,
            event_rx: Arc::new(Mutex::new(Some(rx))),
        }
    }

    /// Events the service loop should broadcast to subscribers
    pub fn take_event_receiver(&self) -> Option<mpsc::UnboundedReceiver<EventPayload>> {
        self.event_rx.lock().unwrap().take()
    }

    /// A tab reported a new URL
    pub fn record_tab(&self, id: TabId, url: &str, active: bool) {
        let mut tabs = self.tabs.lock().unwrap();
        if active {
            for tab in tabs.values_mut() {
                tab.active = false;
            }
        }
        tabs.insert(
            id,
            TabInfo {
                id,
                url: url.to_string(),
                active,
            },
        );
    }

    /// A tab became the active one
    pub fn activate_tab(&self, id: TabId, url: Option<&str>) {
        let mut tabs = self.tabs.lock().unwrap();
        for tab in tabs.values_mut() {
            tab.active = tab.id == id;
        }
        if let Some(url) = url {
            tabs.insert(
                id,
                TabInfo {
                    id,
                    url: url.to_string(),
                    active: true,
                },
            );
        }
    }

    pub fn remove_tab(&self, id: TabId) {
        self.tabs.lock().unwrap().remove(&id);
    }

    pub fn tab_count(&self) -> usize {
        self.tabs.lock().unwrap().len()
    }

    fn emit(&self, payload: EventPayload) -> HostResult<()> {
        self.event_tx
            .send(payload)
            .map_err(|_| HostError::Disconnected)
    }

    /// Replace the rules file in one rename
    fn write_rules(&self, rules: &RuleSet) -> HostResult<()> {
        let Some(path) = &self.rules_path else {
            return Ok(());
        };

        let json = serde_json::to_vec_pretty(rules)
            .map_err(|e| HostError::InstallFailed(e.to_string()))?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

#[async_trait]
impl RuleInstaller for BrowserBridge {
    async fn install(&self, rules: &RuleSet) -> HostResult<()> {
        self.write_rules(rules)?;
        self.emit(EventPayload::RulesChanged {
            rules: rules.clone(),
        })?;

        info!(
            generation = rules.generation,
            rules = rules.len(),
            "Rule set published"
        );
        Ok(())
    }
}

#[async_trait]
impl TabDirectory for BrowserBridge {
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
        {
            let mut tabs = self.tabs.lock().unwrap();
            let entry = tabs.get_mut(&tab).ok_or(HostError::TabNotFound(tab))?;
            entry.url = url.to_string();
        }

        debug!(tab = %tab, url, "Asking extension to navigate tab");
        self.emit(EventPayload::NavigateTab {
            tab_id: tab,
            url: url.to_string(),
        })
    }
}
