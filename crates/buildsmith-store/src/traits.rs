//! Storage trait definitions for buildsmith.
//!
//! These traits define the storage abstractions the job lifecycle builds on:
//! - `IndexStore`: per-release build index with serialized writes
//! - `ArtifactStore`: job request and build configuration documents
//! - `CatalogSource`: release symbol/define catalogs
//!
//! All traits are async and backend-agnostic. In-memory fakes are provided
//! for testing via the `fakes` module.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::catalog::ReleaseCatalog;
use crate::error::StoreError;
use crate::index::{BuildIndex, JobRecord, JobStatus, ShortId};

/// Result type for storage operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Outcome of the atomic check-then-create path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GetOrCreate {
    /// The fingerprint was already mapped; nothing was written.
    Existing(JobRecord),
    /// A new Pending record was inserted and persisted.
    Created(JobRecord),
}

impl GetOrCreate {
    pub fn record(&self) -> &JobRecord {
        match self {
            GetOrCreate::Existing(record) | GetOrCreate::Created(record) => record,
        }
    }
}

/// Durable per-release build index.
///
/// Guarantees:
/// - `read` on a release with no persisted document returns an empty index.
/// - Writes for one release are serialized: a writer always starts from the
///   latest durable state, so no update is lost. Different releases never
///   share a lock.
/// - Readers may proceed together but are mutually exclusive with writers.
#[async_trait]
pub trait IndexStore: Send + Sync {
    /// Load the index for a release. Absence is not a failure.
    async fn read(&self, release: &str) -> StoreResult<BuildIndex>;

    /// Atomically set `ids[fingerprint] = short_id` and insert or update the
    /// job record (fresh records get `created = updated = now`; existing
    /// records only change `status` and `updated`). Returns the new index.
    async fn update(
        &self,
        release: &str,
        fingerprint: &str,
        short_id: &ShortId,
        status: JobStatus,
    ) -> StoreResult<BuildIndex>;

    /// Membership check and Pending insert in one critical section.
    ///
    /// If `fingerprint` is already mapped, returns the existing record
    /// without writing (integrity-checked). Otherwise inserts the mapping
    /// and a Pending record for `short_id` and persists. Two concurrent
    /// calls with the same fingerprint resolve to one `Created` and one
    /// `Existing`; duplicate job creation is impossible.
    async fn get_or_create(
        &self,
        release: &str,
        fingerprint: &str,
        short_id: &ShortId,
    ) -> StoreResult<GetOrCreate>;
}

/// Persists request-derived build artifacts per (release, short id).
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Persist the job-request document as submitted by the caller.
    async fn write_job_request(
        &self,
        release: &str,
        short_id: &ShortId,
        data: &[u8],
    ) -> StoreResult<()>;

    /// Persist the derived full build-configuration document and return the
    /// path handed to the build runner.
    async fn write_build_config(
        &self,
        release: &str,
        short_id: &ShortId,
        data: &[u8],
    ) -> StoreResult<PathBuf>;

    /// Destination for the compiled artifact of a job.
    fn output_path(&self, release: &str, short_id: &ShortId) -> PathBuf;
}

/// Read-only source of release catalogs.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetch the catalog for a release. The returned catalog must be stable
    /// across reads of the same release.
    async fn get_catalog(&self, release: &str) -> StoreResult<ReleaseCatalog>;
}
