//! Event types for blockd -> client streaming

use blockd_util::{Domain, TabId};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::{FocusStatusView, RuleSet, API_VERSION};

/// Event envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub api_version: u32,
    pub timestamp: DateTime<Local>,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(payload: EventPayload) -> Self {
        Self {
            api_version: API_VERSION,
            timestamp: blockd_util::now(),
            payload,
        }
    }
}

/// All possible events from the service to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    /// The installed rule set was replaced
    RulesChanged { rules: RuleSet },

    /// The bridge should navigate a tab (used to leave the blocked page)
    NavigateTab { tab_id: TabId, url: String },

    /// Focus mode was activated, deactivated or expired
    FocusModeChanged(FocusStatusView),

    /// Temporary access was granted or extended
    AccessGranted {
        domain: Domain,
        expires_at: DateTime<Local>,
    },

    /// Temporary access ended (revoked or expired)
    AccessRevoked { domain: Domain },

    /// Service is shutting down
    Shutdown,
}
