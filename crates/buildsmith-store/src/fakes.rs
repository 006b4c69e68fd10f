//! In-memory fakes for storage traits (testing only)
//!
//! Provides `MemoryIndexStore`, `MemoryArtifactStore`, and
//! `MemoryCatalogSource` that satisfy the trait contracts without touching
//! the filesystem.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::catalog::ReleaseCatalog;
use crate::error::StoreError;
use crate::index::{BuildIndex, JobStatus, ShortId};
use crate::traits::{ArtifactStore, CatalogSource, GetOrCreate, IndexStore, StoreResult};

/// In-memory index store backed by a `HashMap<release, BuildIndex>`.
///
/// The single mutex serializes all operations, which trivially satisfies the
/// per-release write-serialization contract.
#[derive(Debug, Default)]
pub struct MemoryIndexStore {
    indexes: Mutex<HashMap<String, BuildIndex>>,
}

impl MemoryIndexStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any index holds any state. Used by tests asserting that a
    /// failed request performed no writes.
    pub fn is_empty(&self) -> bool {
        let indexes = self.indexes.lock().unwrap();
        indexes.values().all(BuildIndex::is_empty)
    }
}

#[async_trait]
impl IndexStore for MemoryIndexStore {
    async fn read(&self, release: &str) -> StoreResult<BuildIndex> {
        let indexes = self.indexes.lock().unwrap();
        Ok(indexes.get(release).cloned().unwrap_or_default())
    }

    async fn update(
        &self,
        release: &str,
        fingerprint: &str,
        short_id: &ShortId,
        status: JobStatus,
    ) -> StoreResult<BuildIndex> {
        let mut indexes = self.indexes.lock().unwrap();
        let index = indexes.entry(release.to_string()).or_default();
        index.upsert(fingerprint, short_id, status, chrono::Utc::now());
        Ok(index.clone())
    }

    async fn get_or_create(
        &self,
        release: &str,
        fingerprint: &str,
        short_id: &ShortId,
    ) -> StoreResult<GetOrCreate> {
        let mut indexes = self.indexes.lock().unwrap();
        let index = indexes.entry(release.to_string()).or_default();
        if let Some(existing) = index.job_for(release, fingerprint)? {
            return Ok(GetOrCreate::Existing(existing.clone()));
        }
        index.upsert(fingerprint, short_id, JobStatus::Pending, chrono::Utc::now());
        Ok(GetOrCreate::Created(index.jobs[short_id].clone()))
    }
}

/// In-memory artifact store that records written documents by key.
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    documents: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(release: &str, short_id: &ShortId, name: &str) -> String {
        format!("{release}/{short_id}/{name}")
    }

    /// Retrieve a written document (testing hook).
    pub fn document(&self, release: &str, short_id: &ShortId, name: &str) -> Option<Vec<u8>> {
        let documents = self.documents.lock().unwrap();
        documents.get(&Self::key(release, short_id, name)).cloned()
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn write_job_request(
        &self,
        release: &str,
        short_id: &ShortId,
        data: &[u8],
    ) -> StoreResult<()> {
        let mut documents = self.documents.lock().unwrap();
        documents.insert(Self::key(release, short_id, "request.json"), data.to_vec());
        Ok(())
    }

    async fn write_build_config(
        &self,
        release: &str,
        short_id: &ShortId,
        data: &[u8],
    ) -> StoreResult<PathBuf> {
        let key = Self::key(release, short_id, "build-config.json");
        let mut documents = self.documents.lock().unwrap();
        documents.insert(key.clone(), data.to_vec());
        Ok(PathBuf::from(key))
    }

    fn output_path(&self, release: &str, short_id: &ShortId) -> PathBuf {
        PathBuf::from(Self::key(release, short_id, "build.out"))
    }
}

/// In-memory catalog source seeded with fixed catalogs.
#[derive(Debug, Default)]
pub struct MemoryCatalogSource {
    catalogs: Mutex<HashMap<String, ReleaseCatalog>>,
}

impl MemoryCatalogSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, release: &str, catalog: ReleaseCatalog) {
        let mut catalogs = self.catalogs.lock().unwrap();
        catalogs.insert(release.to_string(), catalog);
    }
}

#[async_trait]
impl CatalogSource for MemoryCatalogSource {
    async fn get_catalog(&self, release: &str) -> StoreResult<ReleaseCatalog> {
        let catalogs = self.catalogs.lock().unwrap();
        catalogs
            .get(release)
            .cloned()
            .ok_or_else(|| StoreError::CatalogNotFound(release.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_index_store_honors_contract() {
        let store = MemoryIndexStore::new();
        assert!(store.read("v1").await.unwrap().is_empty());

        let id = ShortId("job1".to_string());
        let first = store.get_or_create("v1", "a.5", &id).await.unwrap();
        assert!(matches!(first, GetOrCreate::Created(_)));

        let second = store
            .get_or_create("v1", "a.5", &ShortId("job2".to_string()))
            .await
            .unwrap();
        assert!(matches!(second, GetOrCreate::Existing(_)));

        let index = store
            .update("v1", "a.5", &id, JobStatus::Complete)
            .await
            .unwrap();
        assert_eq!(index.jobs[&id].status, JobStatus::Complete);
    }

    #[tokio::test]
    async fn memory_artifact_store_records_documents() {
        let store = MemoryArtifactStore::new();
        let id = ShortId("job1".to_string());
        store.write_job_request("v1", &id, b"req").await.unwrap();
        assert_eq!(
            store.document("v1", &id, "request.json").unwrap(),
            b"req".to_vec()
        );
    }

    #[tokio::test]
    async fn memory_catalog_source_miss_is_not_found() {
        let source = MemoryCatalogSource::new();
        assert!(matches!(
            source.get_catalog("v1").await,
            Err(StoreError::CatalogNotFound(_))
        ));
    }
}
