//! Harvest SPARQL - graph store access
//!
//! - [`GraphStore`]: ASK/SELECT/CONSTRUCT/UPDATE with per-call headers and
//!   endpoint selection
//! - [`SparqlHttpClient`]: SPARQL 1.1 protocol over HTTP
//! - [`MemoryStore`]: embedded store for local runs and tests
//! - [`QueryStore`]: immutable table of named query templates

#![warn(unreachable_pub)]

pub mod client;
pub mod error;
pub mod escape;
pub mod http;
pub mod memory;
pub mod query_store;
mod results;

pub use client::{insert_data, Endpoint, GraphStore, RequestContext, Solution};
pub use error::StoreError;
pub use http::SparqlHttpClient;
pub use memory::MemoryStore;
pub use query_store::QueryStore;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for store access
    pub use crate::{Endpoint, GraphStore, QueryStore, RequestContext, Solution, StoreError};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
