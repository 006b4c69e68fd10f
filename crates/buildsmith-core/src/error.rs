//! Domain-level error taxonomy for buildsmith.

use thiserror::Error;

/// Errors returned to the caller of the job lifecycle.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The request references a symbol or define name the catalog does not
    /// know. Reported synchronously; no state mutation has occurred.
    #[error("invalid build configuration: {0}")]
    InvalidConfig(String),

    #[error("storage error: {0}")]
    Store(#[from] buildsmith_store::StoreError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for buildsmith domain operations.
pub type Result<T> = std::result::Result<T, BuildError>;

/// Errors from invoking the external build runner. These never reach the
/// caller that submitted the job; they are absorbed into an Error-status
/// job record and surfaced through polling.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("build command exited with {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },
}

/// Errors from release download/install management.
#[derive(Debug, Error)]
pub enum ReleaseError {
    #[error("release {0} already exists")]
    AlreadyExists(String),

    #[error("release not found: {0}")]
    NotFound(String),

    #[error("download failed for {name}: {source}")]
    Download {
        name: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("command `{command}` failed for {name}: {stderr}")]
    Command {
        name: String,
        command: String,
        stderr: String,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
