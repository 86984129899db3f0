use crate::types::ObjectKey;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The FNOL stage found no committed policy identifiers.
    #[error("No policies found")]
    NoPolicies,

    #[error("Malformed record in {key} at line {line}: {source}")]
    MalformedRecord {
        key: ObjectKey,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Artifact not found: {bucket}/{key}")]
    ArtifactNotFound { bucket: String, key: ObjectKey },

    #[error("Invalid arrival notification: {reason}")]
    InvalidNotification { reason: String },

    #[error("Invalid object key '{key}'")]
    InvalidKey { key: ObjectKey },

    #[error("Identifier space '{space}' exhausted after {attempts} attempts")]
    IdSpaceExhausted { space: &'static str, attempts: u32 },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type PipelineResult<T> = Result<T, PipelineError>;
