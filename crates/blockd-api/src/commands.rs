//! Command types for the blockd protocol
//!
//! A request on the wire is a flat JSON object: the envelope fields plus the
//! `action` tag and its payload, e.g.
//! `{"request_id":7,"api_version":1,"action":"BLOCK_DOMAIN","domain":"reddit.com"}`.
//! Every request is answered by exactly one [`Response`] of the shape
//! `{request_id, api_version, success, data?, error?}`.

use blockd_util::{ChallengeId, ClientId, Domain, TabId};
use serde::{Deserialize, Serialize};

use crate::{
    BlockingStats, ChallengeOutcome, ChallengeView, ClientRole, DayUsage, FocusStatusView,
    GrantView, HealthStatus, RuleSet, TodayTotal, TopSite, TrackingStatus, API_VERSION,
};

/// Request wrapper with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Request ID for correlation
    pub request_id: u64,
    /// API version
    pub api_version: u32,
    /// The command
    #[serde(flatten)]
    pub command: Command,
}

impl Request {
    pub fn new(request_id: u64, command: Command) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            command,
        }
    }
}

/// Response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Corresponding request ID
    pub request_id: u64,
    /// API version
    pub api_version: u32,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponsePayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

impl Response {
    pub fn success(request_id: u64, payload: ResponsePayload) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            success: true,
            data: Some(payload),
            error: None,
        }
    }

    pub fn error(request_id: u64, error: ErrorInfo) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            success: false,
            data: None,
            error: Some(error),
        }
    }

    /// Collapse into a `Result`, treating a malformed envelope as an internal error
    pub fn into_result(self) -> Result<ResponsePayload, ErrorInfo> {
        match (self.success, self.data, self.error) {
            (true, Some(data), _) => Ok(data),
            (false, _, Some(err)) => Err(err),
            _ => Err(ErrorInfo::new(
                ErrorCode::InternalError,
                "response carried neither data nor error",
            )),
        }
    }
}

/// Error information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Error codes for the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidRequest,
    ValidationError,
    ChallengeNotFound,
    NoActiveGrant,
    CooldownActive,
    PermissionDenied,
    StoreError,
    HostError,
    InternalError,
}

/// All possible commands from clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    // Block list

    /// Add a domain to the individual block list
    BlockDomain { domain: String },

    /// Remove a domain from the individual block list
    RemoveBlockedDomain { domain: String },

    // Challenge-gated unblocking

    /// Start a challenge that grants temporary access to `domain` when solved
    StartUnblockChallenge { domain: String },

    /// Submit answers for an unblock challenge
    SubmitChallenge {
        challenge_id: ChallengeId,
        answers: Vec<String>,
        /// Grant length; the configured default when absent
        #[serde(default)]
        minutes: Option<u64>,
    },

    // Focus mode

    ActivateFocusMode {
        #[serde(default)]
        minutes: Option<u64>,
    },

    StartFocusDeactivationChallenge,

    SubmitFocusDeactivationChallenge {
        challenge_id: ChallengeId,
        answers: Vec<String>,
    },

    AddFocusDomain { domain: String },

    RemoveFocusDomain { domain: String },

    /// Add the domain to the focus set if absent, remove it otherwise
    ToggleFocusDomain { domain: String },

    // Temporary access

    GrantTempAccess {
        domain: String,
        #[serde(default)]
        minutes: Option<u64>,
    },

    ExtendTempAccess {
        domain: String,
        #[serde(default)]
        minutes: Option<u64>,
    },

    RevokeTempAccess { domain: String },

    /// List live grants
    GetTempAccess,

    GetBlockingStats,

    // Time tracking

    GetCurrentStatus,

    GetLiveSession,

    GetTodayData,

    GetTopWebsites {
        #[serde(default)]
        limit: Option<usize>,
    },

    GetTodayTotal,

    /// The rule set currently installed in the browser
    GetRules,

    /// Commit the in-flight session now
    ForceSave,

    /// Wipe all usage data (admin only)
    ClearData,

    // Browser events forwarded by the extension bridge

    TabUpdated {
        tab_id: TabId,
        url: String,
        #[serde(default)]
        active: bool,
    },

    TabActivated {
        tab_id: TabId,
        #[serde(default)]
        url: Option<String>,
    },

    TabRemoved { tab_id: TabId },

    WindowFocusChanged { focused: bool },

    // Connection management

    /// Subscribe to events (returns immediately, events stream separately)
    SubscribeEvents,

    /// Unsubscribe from events
    UnsubscribeEvents,

    GetHealth,

    /// Ping for keepalive
    Ping,
}

impl Command {
    /// Whether the command changes daemon state
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self,
            Command::GetTempAccess
                | Command::GetBlockingStats
                | Command::GetCurrentStatus
                | Command::GetLiveSession
                | Command::GetTodayData
                | Command::GetTopWebsites { .. }
                | Command::GetTodayTotal
                | Command::GetRules
                | Command::SubscribeEvents
                | Command::UnsubscribeEvents
                | Command::GetHealth
                | Command::Ping
        )
    }
}

/// Response payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponsePayload {
    BlockedDomains {
        blocked_domains: Vec<Domain>,
    },
    FocusDomains {
        focus_domains: Vec<Domain>,
    },
    Challenge(ChallengeView),
    /// Result of `SUBMIT_CHALLENGE`; `grant` is set when solved
    UnblockResult {
        outcome: ChallengeOutcome,
        grant: Option<GrantView>,
    },
    /// Result of `SUBMIT_FOCUS_DEACTIVATION_CHALLENGE`
    FocusDeactivationResult {
        outcome: ChallengeOutcome,
        focus_status: FocusStatusView,
    },
    FocusStatus(FocusStatusView),
    Grant(GrantView),
    Grants {
        grants: Vec<GrantView>,
    },
    Revoked {
        domain: Domain,
    },
    BlockingStats(BlockingStats),
    TrackingStatus(TrackingStatus),
    TodayData {
        date: String,
        sites: DayUsage,
    },
    TopWebsites {
        sites: Vec<TopSite>,
    },
    TodayTotal(TodayTotal),
    Rules(RuleSet),
    Saved,
    DataCleared,
    /// Browser event accepted
    Ack,
    /// Carries the current rules so a late subscriber starts in sync
    Subscribed {
        client_id: ClientId,
        rules: RuleSet,
    },
    Unsubscribed,
    Health(HealthStatus),
    Pong,
}

/// Client connection info (set by IPC layer)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub client_id: ClientId,
    pub role: ClientRole,
    /// Unix UID if available
    pub uid: Option<u32>,
}

impl ClientInfo {
    pub fn new(role: ClientRole) -> Self {
        Self {
            client_id: ClientId::new(),
            role,
            uid: None,
        }
    }

    pub fn with_uid(mut self, uid: u32) -> Self {
        self.uid = Some(uid);
        self
    }
}
