//! Error types for graph store access

/// Errors raised while talking to a graph store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Transport failure (connection refused, timeout, ...)
    #[error("transport error: {0}")]
    Transport(String),

    /// The endpoint answered with a non-success status
    #[error("endpoint returned {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response payload, possibly truncated
        body: String,
    },

    /// A value substituted into a query is not a valid IRI
    #[error("invalid IRI '{value}': {reason}")]
    InvalidIri {
        /// Offending value
        value: String,
        /// Parser message
        reason: String,
    },

    /// The response could not be decoded
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The query kind did not match the expected result form
    #[error("unexpected result form: expected {expected}")]
    UnexpectedResultForm {
        /// Expected form (boolean, solutions, graph)
        expected: &'static str,
    },

    /// Query evaluation failed inside an embedded store
    #[error("evaluation failed: {0}")]
    Evaluation(String),

    /// Unknown template name
    #[error("unknown query template: {0}")]
    UnknownTemplate(String),

    /// Template rendered with a placeholder left unbound
    #[error("template '{template}' is missing parameter '{parameter}'")]
    MissingParameter {
        /// Template name
        template: String,
        /// Placeholder name
        parameter: String,
    },

    /// Template directory could not be read
    #[error("failed to load query templates: {0}")]
    TemplateLoad(#[from] std::io::Error),
}

impl StoreError {
    /// Check if retrying the same call may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Self::Status {
                status: status.as_u16(),
                body: err.to_string(),
            },
            None if err.is_decode() => Self::MalformedResponse(err.to_string()),
            None => Self::Transport(err.to_string()),
        }
    }
}
