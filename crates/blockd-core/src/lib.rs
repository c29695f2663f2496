//! Core engine for blockd
//!
//! This crate is the heart of blockd, containing:
//! - Blocking rule computation (individual blocks, focus set, temporary access)
//! - Temporary access grants with self-revoking timers
//! - Math challenges gating unblock and focus deactivation
//! - Focus mode state machine (Inactive -> Active -> Inactive)
//! - Per-domain time tracking driven by tab and window events
//! - A clock-driven scheduler for all delayed work

mod access;
mod challenge;
mod engine;
mod events;
mod focus;
mod problems;
mod rules;
mod scheduler;
mod tracking;

pub use access::*;
pub use challenge::*;
pub use engine::*;
pub use events::*;
pub use focus::*;
pub use problems::*;
pub use rules::*;
pub use scheduler::*;
pub use tracking::*;
