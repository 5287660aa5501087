//! Error types for topolay
//!
//! Uses `thiserror` for library errors; the CLI wraps them with `anyhow`.
//! Every failure aborts the current task as a whole — nothing is retried
//! internally, since the layout engine is deterministic and a retry with
//! the same input would reproduce the failure.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for topolay operations
pub type TopolayResult<T> = Result<T, TopolayError>;

/// Main error type for topolay operations
#[derive(Error, Debug)]
pub enum TopolayError {
    /// A deployment-graph invariant is broken (unresolved reference,
    /// cyclic type hierarchy, duplicate key)
    #[error("invalid deployment model: {0}")]
    Validation(String),

    /// The external layout engine is unavailable, exited non-zero,
    /// timed out, or produced unusable output
    #[error("layout engine failure: {0}")]
    LayoutEngine(String),

    /// Emission-time reference to a node absent from the topology
    #[error("missing reference: {0}")]
    MissingReference(String),

    /// Model file does not exist
    #[error("model file not found: {path}")]
    ModelNotFound { path: PathBuf },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl TopolayError {
    /// Stable failure-kind token reported at the task boundary
    pub fn kind(&self) -> &'static str {
        match self {
            TopolayError::Validation(_) => "validation",
            TopolayError::LayoutEngine(_) => "layout-engine",
            TopolayError::MissingReference(_) => "missing-reference",
            TopolayError::ModelNotFound { .. } => "model-not-found",
            TopolayError::Io(_) => "io",
            TopolayError::Yaml(_) => "yaml",
        }
    }
}
