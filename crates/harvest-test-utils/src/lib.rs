//! Testing utilities for the harvest workspace
//!
//! Shared test helpers, fixtures, and a recording store.

#![allow(missing_docs)]

pub mod fixtures;
pub mod store;

pub use fixtures::*;
pub use store::{Call, RecordingStore};
