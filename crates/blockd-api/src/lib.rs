//! Protocol types for blockd IPC
//!
//! This crate defines the stable API between blockd and its clients
//! (the browser extension bridge, popup and dashboard):
//! - Commands (requests from clients)
//! - Responses
//! - Events (service -> clients)
//! - Versioning

mod commands;
mod events;
mod types;

pub use commands::*;
pub use events::*;
pub use types::*;

/// Current API version
pub const API_VERSION: u32 = 1;
