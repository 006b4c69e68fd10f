//! Error types for buildsmith-store.

use thiserror::Error;

/// Errors produced by the storage layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The index maps a fingerprint to a short id that has no job record.
    /// Surfaced as-is; never repaired, since repairing could mask data loss.
    #[error("inconsistent index for release {release}: fingerprint {fingerprint} points to unknown job {short_id}")]
    InconsistentIndex {
        release: String,
        fingerprint: String,
        short_id: String,
    },

    /// No catalog is available for the named release.
    #[error("catalog not found for release: {0}")]
    CatalogNotFound(String),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
