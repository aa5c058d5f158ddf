//! SHACL error types

/// Result type for SHACL operations
pub type Result<T> = std::result::Result<T, ShaclError>;

/// Shape compilation, parsing and validation errors
#[derive(Debug, thiserror::Error)]
pub enum ShaclError {
    /// RDF input could not be parsed
    #[error("failed to parse RDF: {0}")]
    Parse(String),

    /// Shape compilation error
    #[error("failed to compile shape {shape}: {message}")]
    Compilation {
        /// Shape identifier
        shape: String,
        /// What went wrong
        message: String,
    },

    /// Property path form not supported
    #[error("unsupported property path on shape {shape}")]
    UnsupportedPath {
        /// Shape identifier
        shape: String,
    },

    /// Invalid regex in `sh:pattern`
    #[error("invalid regex pattern '{pattern}': {message}")]
    InvalidPattern {
        /// Source pattern
        pattern: String,
        /// Regex error
        message: String,
    },

    /// Malformed RDF list
    #[error("malformed RDF list starting at {0}")]
    MalformedList(String),

    /// Shapes file could not be read
    #[error("failed to read shapes: {0}")]
    Io(#[from] std::io::Error),
}
