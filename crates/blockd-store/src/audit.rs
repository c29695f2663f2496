//! Audit event types

use blockd_api::ChallengeKind;
use blockd_util::Domain;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Why temporary access ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevokeReason {
    Manual,
    Expired,
}

/// Why focus mode ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusEndReason {
    /// Deactivation challenge solved
    Challenge,
    /// End time reached while running
    Expired,
    /// End time had already passed when the service started
    Stale,
}

/// Types of audit events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEventType {
    ServiceStarted,

    ServiceStopped,

    ConfigLoaded { focus_domains: usize },

    DomainBlocked { domain: Domain },

    DomainUnblocked { domain: Domain },

    FocusDomainAdded { domain: Domain },

    FocusDomainRemoved { domain: Domain },

    AccessGranted {
        domain: Domain,
        expires_at: DateTime<Local>,
    },

    AccessExtended {
        domain: Domain,
        expires_at: DateTime<Local>,
    },

    AccessRevoked { domain: Domain, reason: RevokeReason },

    FocusActivated { end_time: DateTime<Local> },

    FocusDeactivated { reason: FocusEndReason },

    ChallengeSolved {
        kind: ChallengeKind,
        subject: Option<Domain>,
    },

    ChallengeFailed {
        kind: ChallengeKind,
        subject: Option<Domain>,
        attempts_remaining: u32,
    },

    /// All attempts used; cooldown started
    ChallengeExhausted {
        kind: ChallengeKind,
        subject: Option<Domain>,
    },

    /// Usage history wiped on request
    UsageCleared,

    /// Old usage days dropped by retention
    UsagePurged { days: usize },

    ClientConnected {
        client_id: String,
        role: String,
        uid: Option<u32>,
    },

    ClientDisconnected { client_id: String },
}

/// Full audit event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID
    pub id: i64,

    /// Event timestamp
    pub timestamp: DateTime<Local>,

    /// Event type and details
    pub event: AuditEventType,
}

impl AuditEvent {
    pub fn new(event: AuditEventType) -> Self {
        Self::at(blockd_util::now(), event)
    }

    /// Event stamped with a caller-supplied time
    pub fn at(timestamp: DateTime<Local>, event: AuditEventType) -> Self {
        Self {
            id: 0, // Will be set by store
            timestamp,
            event,
        }
    }
}
