//! Browser host interfaces for blockd
//!
//! This crate defines the boundary between the daemon core and the browser:
//! installing redirect rules and enumerating or navigating tabs. It contains
//! no browser code itself; the daemon bridges these traits onto the
//! extension connection, and tests use the mocks.

mod blocked_page;
mod mock;
mod traits;

pub use blocked_page::*;
pub use mock::*;
pub use traits::*;
