//! Host collaborator traits

use async_trait::async_trait;
use blockd_api::RuleSet;
use blockd_util::TabId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from host operations
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Rule installation failed: {0}")]
    InstallFailed(String),

    #[error("Tab not found: {0}")]
    TabNotFound(TabId),

    #[error("Tab update failed: {0}")]
    UpdateFailed(String),

    #[error("Browser not connected")]
    Disconnected,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type HostResult<T> = Result<T, HostError>;

/// A browser tab as last reported by the extension
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabInfo {
    pub id: TabId,
    pub url: String,
    pub active: bool,
}

/// Installs declarative redirect rules in the browser
///
/// `install` replaces the complete previous rule set in one step; a partial
/// install must be reported as an error.
#[async_trait]
pub trait RuleInstaller: Send + Sync {
    async fn install(&self, rules: &RuleSet) -> HostResult<()>;
}

/// Tab enumeration and navigation
#[async_trait]
pub trait TabDirectory: Send + Sync {
    /// The focused tab of the focused window, if any
    async fn query_active_tab(&self) -> HostResult<Option<TabInfo>>;

    /// All open tabs
    async fn query_tabs(&self) -> HostResult<Vec<TabInfo>>;

    /// Navigate a tab to `url`
    async fn update_tab(&self, tab: TabId, url: &str) -> HostResult<()>;
}
