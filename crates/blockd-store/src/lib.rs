//! Persistence layer for blockd
//!
//! Provides:
//! - Keyed record storage (block lists, focus status, temporary access, usage)
//! - Typed helpers for each persisted record
//! - Audit log (append-only)
//! - SQLite and in-memory backends

mod audit;
mod memory;
mod records;
mod sqlite;
mod traits;

pub use audit::*;
pub use memory::*;
pub use records::*;
pub use sqlite::*;
pub use traits::*;

use thiserror::Error;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

impl From<StoreError> for blockd_util::BlockdError {
    fn from(e: StoreError) -> Self {
        blockd_util::BlockdError::store(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
