//! Harvest Worker - HTTP surface of the harvest gate
//!
//! Receives delta notifications, extracts newly scheduled tasks and hands
//! them to the [`WorkQueue`](harvest_core::WorkQueue).

#![warn(unreachable_pub)]

pub mod logging;
pub mod routes;

pub use logging::init_logging;
pub use routes::routes;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
