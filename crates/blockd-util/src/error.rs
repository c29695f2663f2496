//! Error types for blockd

use std::time::Duration;

use thiserror::Error;

use crate::{ChallengeId, Domain, DomainError};

/// Core error type for blockd operations
#[derive(Debug, Error)]
pub enum BlockdError {
    #[error("Challenge not found: {0}")]
    ChallengeNotFound(ChallengeId),

    #[error("No active temporary access to extend for {0}")]
    NoActiveGrant(Domain),

    #[error("Too many failed attempts, try again in {}s", remaining.as_secs())]
    CooldownActive { remaining: Duration },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Host error: {0}")]
    HostError(String),

    #[error("IPC error: {0}")]
    IpcError(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BlockdError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::StoreError(msg.into())
    }

    pub fn host(msg: impl Into<String>) -> Self {
        Self::HostError(msg.into())
    }

    pub fn ipc(msg: impl Into<String>) -> Self {
        Self::IpcError(msg.into())
    }

    pub fn permission(msg: impl Into<String>) -> Self {
        Self::PermissionDenied(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error reports a missing resource rather than a failure
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ChallengeNotFound(_) | Self::NoActiveGrant(_))
    }
}

impl From<DomainError> for BlockdError {
    fn from(e: DomainError) -> Self {
        Self::ValidationError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BlockdError>;
