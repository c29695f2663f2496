//! Shared utilities for blockd
//!
//! This crate provides:
//! - ID types (ChallengeId, ClientId, TabId)
//! - Domain normalization and URL-to-domain extraction
//! - Clock abstraction (system clock with mock time, manual clock for tests)
//! - Error types
//! - Cooldown tracking for challenge lockouts
//! - Default paths for socket, data, and config directories

mod cooldown;
mod domain;
mod error;
mod ids;
mod paths;
mod time;

pub use cooldown::*;
pub use domain::*;
pub use error::*;
pub use ids::*;
pub use paths::*;
pub use time::*;
