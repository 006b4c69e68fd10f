//! Build index document and job records.
//!
//! One index is persisted per release as a JSON document with exactly two
//! top-level fields: `ids` (fingerprint -> short id) and `jobs` (short id ->
//! job record). The index is the single source of truth for job existence
//! and state.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Opaque handle naming a specific build job. Random, unique per release,
/// usable as a filesystem key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ShortId(pub String);

impl ShortId {
    /// Generate a new random ShortId (40 bits of UUID v4 entropy).
    pub fn generate() -> Self {
        let simple = uuid::Uuid::new_v4().simple().to_string();
        ShortId(simple[..10].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ShortId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a build job. Pending transitions exactly once to
/// Complete or Error; both are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Complete,
    Error,
}

/// A single build job tracked by the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: ShortId,
    pub status: JobStatus,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

/// Per-release index mapping fingerprints to jobs.
///
/// Invariant: every value in `ids` exists as a key in `jobs`. A violation is
/// reported as `StoreError::InconsistentIndex`, never silently repaired.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildIndex {
    pub ids: BTreeMap<String, ShortId>,
    pub jobs: BTreeMap<ShortId, JobRecord>,
}

impl BuildIndex {
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty() && self.jobs.is_empty()
    }

    /// Look up the job for a fingerprint, enforcing referential integrity.
    ///
    /// Returns `Ok(None)` on a cache miss, `Ok(Some(record))` on a hit, and
    /// `InconsistentIndex` when `ids` references a short id that `jobs` does
    /// not recognize. `release` is only used for error context.
    pub fn job_for(
        &self,
        release: &str,
        fingerprint: &str,
    ) -> Result<Option<&JobRecord>, StoreError> {
        let Some(short_id) = self.ids.get(fingerprint) else {
            return Ok(None);
        };
        match self.jobs.get(short_id) {
            Some(record) => Ok(Some(record)),
            None => Err(StoreError::InconsistentIndex {
                release: release.to_string(),
                fingerprint: fingerprint.to_string(),
                short_id: short_id.to_string(),
            }),
        }
    }

    /// Apply the index mutation shared by every write path: map the
    /// fingerprint to the short id, then insert a fresh record
    /// (`created = updated = now`) or update `status`/`updated` in place.
    /// `created` is never touched for an existing record.
    pub fn upsert(
        &mut self,
        fingerprint: &str,
        short_id: &ShortId,
        status: JobStatus,
        now: DateTime<Utc>,
    ) {
        self.ids
            .insert(fingerprint.to_string(), short_id.clone());
        match self.jobs.get_mut(short_id) {
            Some(record) => {
                record.status = status;
                record.updated = now;
            }
            None => {
                self.jobs.insert(
                    short_id.clone(),
                    JobRecord {
                        id: short_id.clone(),
                        status,
                        created: now,
                        updated: now,
                    },
                );
            }
        }
    }
}
