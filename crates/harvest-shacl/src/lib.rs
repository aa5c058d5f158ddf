//! SHACL validation for harvested graphs
//!
//! Validation works by:
//! 1. Compiling a Turtle shape profile into [`CompiledShape`]s
//! 2. Selecting focus nodes for each shape (`sh:targetClass`, `sh:targetNode`, ...)
//! 3. Evaluating property and node constraints on each focus node
//! 4. Producing a [`ValidationReport`] that can be serialized as a graph
//!
//! [`filter`] derives the conforming subgraph from a report; the errored
//! statements are the set difference with the input.
//!
//! # Example
//!
//! ```rust,ignore
//! use harvest_shacl::{ShaclEngine, rdf};
//!
//! let engine = ShaclEngine::from_file("config/shapes.ttl".as_ref())?;
//! let data = rdf::parse_turtle(bytes)?;
//! let partition = engine.partition(&data);
//! if !partition.report.conforms {
//!     let report = engine.report_graph(&partition.report);
//! }
//! ```

#![warn(unreachable_pub)]

pub mod blank;
pub mod compile;
pub mod constraints;
pub mod engine;
pub mod error;
pub mod filter;
pub mod rdf;
pub mod report;
pub mod validate;
pub mod vocab;

pub use blank::replace_blank_nodes;
pub use compile::{compile, CompiledShape, NodeKind, PropertyPath, PropertyShape, Severity, TargetType};
pub use constraints::Constraint;
pub use engine::{Partition, ShaclEngine, DEFAULT_BLANK_PREFIX};
pub use error::{Result, ShaclError};
pub use filter::filter;
pub use report::{ValidationReport, ValidationResult};
pub use validate::validate;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
