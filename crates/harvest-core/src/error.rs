//! Error types for the pipeline
//!
//! Every failure inside a run surfaces as a [`PipelineError`] and is caught
//! once, at the orchestrator boundary:
//! - store failures (transport, HTTP status, malformed results)
//! - SHACL failures (malformed shapes or input)
//! - missing dependencies (input container, input file)
//! - unit and batch failures

use harvest_shacl::ShaclError;
use harvest_sparql::StoreError;

use crate::types::TaskStatus;

/// Main pipeline error type
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Store call failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Validation engine failed
    #[error("shacl error: {0}")]
    Shacl(#[from] ShaclError),

    /// A required resource is absent
    #[error("{0} not found")]
    NotFound(String),

    /// Shared storage I/O failed
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Input data could not be interpreted
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// One unit of a page failed
    #[error("unit {derived_from} failed: {source}")]
    UnitFailed {
        /// Provenance of the failing unit
        derived_from: String,
        /// Underlying failure
        #[source]
        source: Box<PipelineError>,
    },

    /// Some batches could not be inserted after all attempts
    #[error("{failed} of {total} batches could not be inserted into {graph}")]
    BatchesExhausted {
        /// Target graph
        graph: String,
        /// Batches that exhausted their attempts
        failed: usize,
        /// Batches issued
        total: usize,
    },

    /// A spawned unit panicked or was aborted
    #[error("join error: {0}")]
    Join(String),

    /// Status change not allowed by the task state machine
    #[error("invalid transition {from} -> {to}")]
    InvalidTransition {
        /// Current status
        from: TaskStatus,
        /// Requested status
        to: TaskStatus,
    },

    /// Configuration is invalid
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl PipelineError {
    /// Check if a batched insert ran out of attempts
    #[must_use]
    pub fn is_batch_exhaustion(&self) -> bool {
        match self {
            Self::BatchesExhausted { .. } => true,
            Self::UnitFailed { source, .. } => source.is_batch_exhaustion(),
            _ => false,
        }
    }

    /// Check if error is retryable
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Store(e) => e.is_retryable(),
            Self::UnitFailed { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// Wrap a unit failure with its provenance
    #[inline]
    pub fn unit(derived_from: impl Into<String>, source: PipelineError) -> Self {
        Self::UnitFailed {
            derived_from: derived_from.into(),
            source: Box::new(source),
        }
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("cannot read {path}: {source}")]
    Read {
        /// Path of the file
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// File is not valid TOML for the expected structure
    #[error("cannot parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// Environment override has an invalid value
    #[error("invalid value for {key}: {value}")]
    InvalidEnv {
        /// Variable name
        key: String,
        /// Offending value
        value: String,
    },

    /// A setting is out of range
    #[error("invalid setting {0}")]
    Invalid(String),
}
