//! Error types for the prediction core

use std::path::PathBuf;
use thiserror::Error;

/// Load-time artifact failures. Fatal: the process must not start serving
/// with a partial or corrupt artifact set.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Artifact file missing or unreadable
    #[error("failed to read artifact {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Artifact file is not valid JSON for the expected shape
    #[error("failed to parse artifact {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Model failed structural validation
    #[error("invalid model: {0}")]
    InvalidModel(String),

    /// Stored label encoder has an empty class vocabulary
    #[error("invalid encoder for column `{0}`: empty class vocabulary")]
    EmptyEncoder(String),
}

/// Per-request pipeline failures. Caught at the HTTP boundary and converted
/// to an `{"error": ...}` payload, never a crash of the serving process.
#[derive(Error, Debug)]
pub enum RequestError {
    /// One of the free-text source fields is absent from the input record
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    /// A non-encoded column holds a value the model cannot consume
    #[error("column `{column}` is not numeric (got {value})")]
    NonNumeric { column: String, value: String },

    /// Encoded vector length does not match the model's input width
    #[error("model expects {expected} features, got {actual}")]
    FeatureCountMismatch { expected: usize, actual: usize },
}
