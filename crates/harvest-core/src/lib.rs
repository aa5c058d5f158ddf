//! Harvest Core - task pipeline orchestration
//!
//! Reacts to scheduled harvesting tasks:
//! - Resolves the task and marks it busy
//! - Reads its input page by page (files or a named graph)
//! - Validates every unit concurrently against a shape profile
//! - Publishes conforming/errored triples and reports as linked containers
//! - Records success, or failure with a short error record
//!
//! # Example
//!
//! ```rust,ignore
//! use harvest_core::prelude::*;
//!
//! let config = WorkerConfig::from_toml_file("config/worker.toml".as_ref())?;
//! let engine = ShaclEngine::from_file(&config.shapes_path)?;
//! let orchestrator = PipelineOrchestrator::from_config(&config, store, engine)?;
//! let (queue, _dispatcher) = WorkQueue::start(Arc::new(orchestrator));
//! queue.submit("http://redpencil.data.gift/id/task/1")?;
//! ```

#![warn(unreachable_pub)]

pub mod composer;
pub mod config;
pub mod delta;
pub mod error;
pub mod fanout;
pub mod orchestrator;
pub mod paging;
pub mod pipeline;
pub mod queries;
pub mod queue;
pub mod repository;
pub mod state_machine;
pub mod storage;
pub mod types;
pub mod vocab;

pub use composer::ResultGraphComposer;
pub use config::{
    BatchFailurePolicy, PipelineConfig, PrefixConfig, ServerConfig, StorageConfig, StoreConfig,
    WorkerConfig,
};
pub use delta::{scheduled_subjects, ChangeSet, DeltaTerm, DeltaTriple};
pub use error::{ConfigError, PipelineError};
pub use fanout::{FanOutSettings, FanOutSummary, UnitFanOutProcessor, UnitHandler};
pub use orchestrator::{Ignored, PipelineOrchestrator, RunOutcome};
pub use paging::{ImportSummary, InputSource, PagingSettings, PaginatedGraphIO};
pub use pipeline::{FilteringPipeline, Pipeline, PipelineContext, ValidatingPipeline};
pub use queries::default_queries;
pub use queue::WorkQueue;
pub use repository::TaskRepository;
pub use storage::SharedStorage;
pub use types::{DataContainer, ModelByDerived, Operation, StoredFile, Task, TaskStatus};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for running the worker
    pub use crate::{
        DataContainer, Operation, PipelineError, PipelineOrchestrator, RunOutcome, Task,
        TaskStatus, WorkQueue, WorkerConfig,
    };
    pub use harvest_shacl::ShaclEngine;
    pub use std::sync::Arc;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
