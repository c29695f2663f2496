//! blockdd internals
//!
//! The binary in `main.rs` only parses arguments, sets up logging and waits
//! for a signal; everything else lives here so it can be driven from tests.

pub mod bridge;
pub mod dispatch;
pub mod service;

pub use bridge::BrowserBridge;
pub use service::{Service, ServiceOptions};
