//! Filesystem-backed storage.
//!
//! Index documents live at `<root>/<release>/index.json`, job artifacts at
//! `<root>/<release>/jobs/<short_id>/`, and catalogs are read from
//! `<root>/<release>/build/info.json` (written by release info generation).
//!
//! Every write goes to a temp file in the target directory followed by a
//! rename, so readers never observe a torn document.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tokio::sync::RwLock;
use tracing::debug;

use crate::catalog::ReleaseCatalog;
use crate::error::StoreError;
use crate::index::{BuildIndex, JobStatus, ShortId};
use crate::traits::{ArtifactStore, CatalogSource, GetOrCreate, IndexStore, StoreResult};

fn write_atomic(path: &Path, data: &[u8]) -> StoreResult<()> {
    let dir = path.parent().expect("storage paths always have a parent");
    std::fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
    Ok(())
}

/// Filesystem-backed index store with one read/write lock per release.
///
/// The lock registry is owned by the store object itself; construct one
/// store per process and share it by reference. Different releases hold
/// independent locks and never block each other.
pub struct FsIndexStore {
    root: PathBuf,
    locks: Mutex<HashMap<String, Arc<RwLock<()>>>>,
}

impl FsIndexStore {
    /// Create a store rooted at `root`. Creates the directory if needed.
    pub fn new(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            locks: Mutex::new(HashMap::new()),
        })
    }

    fn lock_for(&self, release: &str) -> Arc<RwLock<()>> {
        let mut locks = self.locks.lock().expect("lock registry poisoned");
        locks.entry(release.to_string()).or_default().clone()
    }

    fn index_path(&self, release: &str) -> PathBuf {
        self.root.join(release).join("index.json")
    }

    /// Load the durable index. Absence yields an empty index; any other
    /// read failure is surfaced.
    fn load(&self, release: &str) -> StoreResult<BuildIndex> {
        match std::fs::read(self.index_path(release)) {
            Ok(data) => Ok(serde_json::from_slice(&data)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BuildIndex::default()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    fn persist(&self, release: &str, index: &BuildIndex) -> StoreResult<()> {
        let data = serde_json::to_vec_pretty(index)?;
        write_atomic(&self.index_path(release), &data)
    }
}

#[async_trait]
impl IndexStore for FsIndexStore {
    async fn read(&self, release: &str) -> StoreResult<BuildIndex> {
        let lock = self.lock_for(release);
        let _guard = lock.read().await;
        self.load(release)
    }

    async fn update(
        &self,
        release: &str,
        fingerprint: &str,
        short_id: &ShortId,
        status: JobStatus,
    ) -> StoreResult<BuildIndex> {
        let lock = self.lock_for(release);
        let _guard = lock.write().await;
        // Re-read under the lock: a writer always starts from the latest
        // durable value, not one cached before the lock was acquired.
        let mut index = self.load(release)?;
        index.upsert(fingerprint, short_id, status, chrono::Utc::now());
        self.persist(release, &index)?;
        debug!(release = %release, fingerprint = %fingerprint, short_id = %short_id, status = ?status, "index updated");
        Ok(index)
    }

    async fn get_or_create(
        &self,
        release: &str,
        fingerprint: &str,
        short_id: &ShortId,
    ) -> StoreResult<GetOrCreate> {
        let lock = self.lock_for(release);
        let _guard = lock.write().await;
        let mut index = self.load(release)?;
        if let Some(existing) = index.job_for(release, fingerprint)? {
            return Ok(GetOrCreate::Existing(existing.clone()));
        }
        index.upsert(fingerprint, short_id, JobStatus::Pending, chrono::Utc::now());
        self.persist(release, &index)?;
        let record = index.jobs[short_id].clone();
        debug!(release = %release, fingerprint = %fingerprint, short_id = %short_id, "job created");
        Ok(GetOrCreate::Created(record))
    }
}

/// Filesystem-backed artifact store.
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn job_dir(&self, release: &str, short_id: &ShortId) -> PathBuf {
        self.root.join(release).join("jobs").join(short_id.as_str())
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn write_job_request(
        &self,
        release: &str,
        short_id: &ShortId,
        data: &[u8],
    ) -> StoreResult<()> {
        write_atomic(&self.job_dir(release, short_id).join("request.json"), data)
    }

    async fn write_build_config(
        &self,
        release: &str,
        short_id: &ShortId,
        data: &[u8],
    ) -> StoreResult<PathBuf> {
        let path = self.job_dir(release, short_id).join("build-config.json");
        write_atomic(&path, data)?;
        Ok(path)
    }

    fn output_path(&self, release: &str, short_id: &ShortId) -> PathBuf {
        self.job_dir(release, short_id).join("build.out")
    }
}

/// Reads catalogs from the `build/info.json` document inside each unpacked
/// release directory.
pub struct FsCatalogSource {
    root: PathBuf,
}

impl FsCatalogSource {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn info_path(&self, release: &str) -> PathBuf {
        self.root.join(release).join("build").join("info.json")
    }
}

#[async_trait]
impl CatalogSource for FsCatalogSource {
    async fn get_catalog(&self, release: &str) -> StoreResult<ReleaseCatalog> {
        match std::fs::read(self.info_path(release)) {
            Ok(data) => Ok(serde_json::from_slice(&data)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::CatalogNotFound(release.to_string()))
            }
            Err(e) => Err(StoreError::Io(e)),
        }
    }
}
