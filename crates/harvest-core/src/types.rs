//! Core value types: tasks, containers and derived units
//!
//! All of these are plain immutable values. "Updating" a [`Task`] produces a
//! new value, so concurrent units never observe each other's changes.

use std::fmt;

use oxigraph::model::Graph;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::vocab;

/// Task lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Set upstream; the only status that is picked up
    Scheduled,
    /// A run is in progress
    Busy,
    /// Terminal: the run completed
    Success,
    /// Terminal: the run failed
    Failed,
}

impl TaskStatus {
    /// Status concept IRI
    #[inline]
    #[must_use]
    pub fn iri(self) -> &'static str {
        match self {
            Self::Scheduled => vocab::status::SCHEDULED,
            Self::Busy => vocab::status::BUSY,
            Self::Success => vocab::status::SUCCESS,
            Self::Failed => vocab::status::FAILED,
        }
    }

    /// Parse a status concept IRI
    #[must_use]
    pub fn from_iri(iri: &str) -> Option<Self> {
        match iri {
            vocab::status::SCHEDULED => Some(Self::Scheduled),
            vocab::status::BUSY => Some(Self::Busy),
            vocab::status::SUCCESS => Some(Self::Success),
            vocab::status::FAILED => Some(Self::Failed),
            _ => None,
        }
    }

    /// Check if the status ends a run
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Scheduled => "scheduled",
            Self::Busy => "busy",
            Self::Success => "success",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Operations this worker knows how to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Validate, split, publish conforming triples
    Filtering,
    /// Validate and publish the report
    Validating,
}

impl Operation {
    /// Operation concept IRI
    #[inline]
    #[must_use]
    pub fn iri(self) -> &'static str {
        match self {
            Self::Filtering => vocab::operation::FILTERING,
            Self::Validating => vocab::operation::VALIDATING,
        }
    }

    /// Parse an operation concept IRI; unknown operations yield `None`
    #[must_use]
    pub fn from_iri(iri: &str) -> Option<Self> {
        match iri {
            vocab::operation::FILTERING => Some(Self::Filtering),
            vocab::operation::VALIDATING => Some(Self::Validating),
            _ => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Filtering => f.write_str("filtering"),
            Self::Validating => f.write_str("validating"),
        }
    }
}

/// A task record as loaded from its metadata graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// Task IRI
    pub uri: String,
    /// Owning job IRI
    pub job: String,
    /// `mu:uuid` of the task
    pub id: String,
    /// Creation timestamp, as stored
    pub created: String,
    /// Last modification timestamp, as stored
    pub modified: String,
    /// Raw operation IRI
    pub operation_iri: String,
    /// Recognized operation, if any
    pub operation: Option<Operation>,
    /// Current status
    pub status: TaskStatus,
    /// Named graph holding the task's metadata
    pub graph: String,
    /// Linked error record, if any
    pub error: Option<String>,
    /// Position of the task within its job
    pub index: String,
}

impl Task {
    /// Copy of this task with another status
    #[inline]
    #[must_use]
    pub fn with_status(&self, status: TaskStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }

    /// Copy of this task with another modification stamp
    #[inline]
    #[must_use]
    pub fn with_modified(self, modified: impl Into<String>) -> Self {
        Self {
            modified: modified.into(),
            ..self
        }
    }

    /// Copy of this task linked to an error record
    #[inline]
    #[must_use]
    pub fn with_error(self, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..self
        }
    }
}

/// A named bundle pointing to one artifact (file or graph)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataContainer {
    /// Container id (`mu:uuid`)
    pub id: String,
    /// Container IRI
    pub uri: String,
    /// Artifact: a logical file IRI or a graph IRI
    pub graph_uri: String,
    /// Graph holding validation results for `graph_uri`
    pub validation_graph_uri: Option<String>,
}

impl DataContainer {
    /// Fresh container under `prefix`; the IRI is `{prefix}{id}`
    #[must_use]
    pub fn generate(prefix: &str, artifact: impl Into<String>) -> Self {
        let id = Uuid::new_v4().simple().to_string();
        Self {
            uri: Self::uri_for(prefix, &id),
            id,
            graph_uri: artifact.into(),
            validation_graph_uri: None,
        }
    }

    /// IRI of the container with `id` under `prefix`
    #[inline]
    #[must_use]
    pub fn uri_for(prefix: &str, id: &str) -> String {
        format!("{prefix}{id}")
    }

    /// Attach a validation graph
    #[inline]
    #[must_use]
    pub fn with_validation_graph(mut self, graph: impl Into<String>) -> Self {
        self.validation_graph_uri = Some(graph.into());
        self
    }
}

/// One independently validated sub-document of a task's input
#[derive(Debug, Clone)]
pub struct ModelByDerived {
    /// Provenance of the unit
    pub derived_from: String,
    /// Unit content
    pub graph: Graph,
}

impl ModelByDerived {
    /// Pair a graph with its provenance
    #[must_use]
    pub fn new(derived_from: impl Into<String>, graph: Graph) -> Self {
        Self {
            derived_from: derived_from.into(),
            graph,
        }
    }
}

/// File written to shared storage, with the metadata recorded for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// `mu:uuid` of the physical file
    pub physical_id: String,
    /// File name on the shared volume
    pub physical_name: String,
    /// `share://` IRI of the physical file
    pub physical_uri: String,
    /// `mu:uuid` of the logical file
    pub logical_id: String,
    /// Logical file IRI that other records point to
    pub logical_uri: String,
    /// Human-facing file name
    pub logical_name: String,
    /// Size in bytes
    pub size: u64,
    /// File extension
    pub extension: String,
    /// MIME type
    pub content_type: String,
}
