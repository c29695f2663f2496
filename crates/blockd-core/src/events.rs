//! Core events emitted by the engine

use blockd_api::FocusStatusView;
use blockd_store::RevokeReason;
use blockd_util::Domain;
use chrono::{DateTime, Local};

/// Events emitted by the core engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreEvent {
    /// Focus mode turned on, off, or got a new end time
    FocusModeChanged(FocusStatusView),

    /// Temporary access granted or extended
    AccessGranted {
        domain: Domain,
        expires_at: DateTime<Local>,
    },

    /// Temporary access ended
    AccessRevoked {
        domain: Domain,
        reason: RevokeReason,
    },
}
