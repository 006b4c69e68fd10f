//! Job lifecycle orchestration.
//!
//! `JobService` turns a build request into a job record, guaranteeing at
//! most one build per distinct fingerprint per release. The caller is
//! unblocked as soon as the job is Pending; completion is observed by
//! polling the index.

use std::sync::Arc;

use tracing::{error, warn};

use buildsmith_store::{
    ArtifactStore, CatalogSource, GetOrCreate, IndexStore, JobRecord, JobStatus, ShortId,
};

use crate::error::Result;
use crate::fingerprint::encode;
use crate::obs;
use crate::request::{BuildConfig, BuildRequest};
use crate::runner::BuildRunner;

/// Orchestrates get-or-create over the storage traits and the build runner.
///
/// Cheap to clone; all collaborators are shared.
#[derive(Clone)]
pub struct JobService {
    index: Arc<dyn IndexStore>,
    catalogs: Arc<dyn CatalogSource>,
    artifacts: Arc<dyn ArtifactStore>,
    runner: Arc<dyn BuildRunner>,
}

impl JobService {
    pub fn new(
        index: Arc<dyn IndexStore>,
        catalogs: Arc<dyn CatalogSource>,
        artifacts: Arc<dyn ArtifactStore>,
        runner: Arc<dyn BuildRunner>,
    ) -> Self {
        Self {
            index,
            catalogs,
            artifacts,
            runner,
        }
    }

    /// Resolve a build request to its job, creating and starting the build
    /// if no job exists for the request's fingerprint.
    ///
    /// On a cache hit the existing record is returned unchanged, whatever
    /// its status: an Error job is a valid terminal answer, and a fresh
    /// build is only triggered by a distinct fingerprint. `InvalidConfig`
    /// is reported before any state is written.
    pub async fn get_or_create_job(
        &self,
        release: &str,
        request: &BuildRequest,
    ) -> Result<JobRecord> {
        let catalog = self.catalogs.get_catalog(release).await?;
        let fingerprint = encode(request, &catalog)?;

        // Fast path under the shared lock.
        let index = self.index.read(release).await?;
        if let Some(existing) = index.job_for(release, fingerprint.as_str())? {
            obs::emit_cache_hit(release, fingerprint.as_str(), existing.id.as_str());
            return Ok(existing.clone());
        }

        let short_id = ShortId::generate();
        self.artifacts
            .write_job_request(release, &short_id, &serde_json::to_vec_pretty(request)?)
            .await?;
        let config = BuildConfig::derive(request, &catalog);
        let config_path = self
            .artifacts
            .write_build_config(release, &short_id, &serde_json::to_vec_pretty(&config)?)
            .await?;

        // The membership check and the Pending insert happen in one
        // exclusive critical section per release, so two concurrent misses
        // for the same fingerprint cannot both create a job.
        match self
            .index
            .get_or_create(release, fingerprint.as_str(), &short_id)
            .await?
        {
            GetOrCreate::Existing(record) => {
                // Lost the race; the winner's job is authoritative. The
                // artifact files written above for the losing short id are
                // orphaned but inert.
                warn!(release = %release, fingerprint = %fingerprint, loser = %short_id, winner = %record.id, "concurrent job creation resolved to existing job");
                obs::emit_cache_hit(release, fingerprint.as_str(), record.id.as_str());
                Ok(record)
            }
            GetOrCreate::Created(record) => {
                obs::emit_job_created(release, fingerprint.as_str(), short_id.as_str());
                self.spawn_build(release, fingerprint.into_string(), short_id, config_path);
                Ok(record)
            }
        }
    }

    /// Run the build detached. The outcome, success or failure, funnels
    /// through the same locked update path so the job always reaches a
    /// terminal, queryable state.
    fn spawn_build(
        &self,
        release: &str,
        fingerprint: String,
        short_id: ShortId,
        config_path: std::path::PathBuf,
    ) {
        let release = release.to_string();
        let index = Arc::clone(&self.index);
        let runner = Arc::clone(&self.runner);
        let output_path = self.artifacts.output_path(&release, &short_id);

        tokio::spawn(async move {
            let status = match runner.run(&config_path, &output_path).await {
                Ok(()) => {
                    obs::emit_job_finished(&release, short_id.as_str(), true);
                    JobStatus::Complete
                }
                Err(e) => {
                    error!(release = %release, short_id = %short_id, error = %e, "build failed");
                    obs::emit_job_finished(&release, short_id.as_str(), false);
                    JobStatus::Error
                }
            };
            // The submitting caller is long gone; a store failure here can
            // only be logged.
            if let Err(e) = index
                .update(&release, &fingerprint, &short_id, status)
                .await
            {
                error!(release = %release, short_id = %short_id, error = %e, "failed to record build outcome");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::time::Duration;

    use async_trait::async_trait;

    use buildsmith_store::fakes::{MemoryArtifactStore, MemoryCatalogSource, MemoryIndexStore};
    use buildsmith_store::{DefineDescriptor, ReleaseCatalog, SymbolDescriptor};

    use crate::error::{BuildError, RunnerError};

    struct FakeRunner {
        fail: bool,
    }

    #[async_trait]
    impl BuildRunner for FakeRunner {
        async fn run(&self, _config: &Path, _output: &Path) -> std::result::Result<(), RunnerError> {
            // Yield so racing callers interleave.
            tokio::time::sleep(Duration::from_millis(1)).await;
            if self.fail {
                Err(RunnerError::Failed {
                    code: Some(1),
                    stderr: "boom".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    fn catalog() -> ReleaseCatalog {
        ReleaseCatalog::new(
            (0..4)
                .map(|i| SymbolDescriptor {
                    name: format!("symbol.{i}"),
                })
                .collect(),
            vec![DefineDescriptor {
                name: "define.0".to_string(),
                default: false,
            }],
        )
    }

    fn request(symbols: &[&str]) -> BuildRequest {
        BuildRequest {
            symbols: symbols.iter().map(|s| s.to_string()).collect(),
            defines: Default::default(),
        }
    }

    struct Fixture {
        index: Arc<MemoryIndexStore>,
        artifacts: Arc<MemoryArtifactStore>,
        service: JobService,
    }

    fn fixture(fail: bool) -> Fixture {
        let index = Arc::new(MemoryIndexStore::new());
        let catalogs = Arc::new(MemoryCatalogSource::new());
        catalogs.insert("v1", catalog());
        let artifacts = Arc::new(MemoryArtifactStore::new());
        let service = JobService::new(
            index.clone(),
            catalogs,
            artifacts.clone(),
            Arc::new(FakeRunner { fail }),
        );
        Fixture {
            index,
            artifacts,
            service,
        }
    }

    async fn wait_for_terminal(index: &MemoryIndexStore, release: &str, id: &ShortId) -> JobStatus {
        for _ in 0..200 {
            let snapshot = index.read(release).await.unwrap();
            if let Some(record) = snapshot.jobs.get(id) {
                if record.status != JobStatus::Pending {
                    return record.status;
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("job {id} never reached a terminal state");
    }

    #[tokio::test]
    async fn miss_creates_pending_job_and_writes_artifacts() {
        let fx = fixture(false);
        let record = fx
            .service
            .get_or_create_job("v1", &request(&["symbol.0"]))
            .await
            .unwrap();
        assert_eq!(record.status, JobStatus::Pending);
        assert_eq!(record.created, record.updated);

        assert!(fx
            .artifacts
            .document("v1", &record.id, "request.json")
            .is_some());
        assert!(fx
            .artifacts
            .document("v1", &record.id, "build-config.json")
            .is_some());
    }

    #[tokio::test]
    async fn identical_request_hits_cache() {
        let fx = fixture(false);
        let first = fx
            .service
            .get_or_create_job("v1", &request(&["symbol.0", "symbol.2"]))
            .await
            .unwrap();
        // Same effective selection, different request ordering.
        let second = fx
            .service
            .get_or_create_job("v1", &request(&["symbol.2", "symbol.0"]))
            .await
            .unwrap();
        assert_eq!(first.id, second.id);

        let index = fx.index.read("v1").await.unwrap();
        assert_eq!(index.jobs.len(), 1);
    }

    #[tokio::test]
    async fn distinct_requests_create_distinct_jobs() {
        let fx = fixture(false);
        let a = fx
            .service
            .get_or_create_job("v1", &request(&["symbol.0"]))
            .await
            .unwrap();
        let b = fx
            .service
            .get_or_create_job("v1", &request(&["symbol.1"]))
            .await
            .unwrap();
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn invalid_config_writes_nothing() {
        let fx = fixture(false);
        let err = fx
            .service
            .get_or_create_job("v1", &request(&["symbol.99"]))
            .await
            .unwrap_err();
        assert!(matches!(err, BuildError::InvalidConfig(_)));
        assert!(fx.index.is_empty(), "index must be untouched");
    }

    #[tokio::test]
    async fn successful_build_reaches_complete() {
        let fx = fixture(false);
        let record = fx
            .service
            .get_or_create_job("v1", &request(&["symbol.3"]))
            .await
            .unwrap();
        let status = wait_for_terminal(&fx.index, "v1", &record.id).await;
        assert_eq!(status, JobStatus::Complete);
    }

    #[tokio::test]
    async fn failed_build_reaches_error_not_stuck_pending() {
        let fx = fixture(true);
        let record = fx
            .service
            .get_or_create_job("v1", &request(&["symbol.3"]))
            .await
            .unwrap();
        let status = wait_for_terminal(&fx.index, "v1", &record.id).await;
        assert_eq!(status, JobStatus::Error);
    }

    #[tokio::test]
    async fn error_job_stays_cached_no_retry() {
        let fx = fixture(true);
        let record = fx
            .service
            .get_or_create_job("v1", &request(&["symbol.1"]))
            .await
            .unwrap();
        wait_for_terminal(&fx.index, "v1", &record.id).await;

        let again = fx
            .service
            .get_or_create_job("v1", &request(&["symbol.1"]))
            .await
            .unwrap();
        assert_eq!(again.id, record.id);
        assert_eq!(again.status, JobStatus::Error);

        let index = fx.index.read("v1").await.unwrap();
        assert_eq!(index.jobs.len(), 1, "no retry job may be created");
    }

    #[tokio::test]
    async fn concurrent_identical_requests_resolve_to_one_job() {
        let fx = fixture(false);
        let mut handles = Vec::new();
        for _ in 0..8 {
            let service = fx.service.clone();
            handles.push(tokio::spawn(async move {
                service
                    .get_or_create_job("v1", &request(&["symbol.0", "symbol.3"]))
                    .await
                    .unwrap()
            }));
        }

        let mut ids = std::collections::HashSet::new();
        for handle in handles {
            ids.insert(handle.await.unwrap().id);
        }
        assert_eq!(ids.len(), 1, "all callers must get the same short id");

        let index = fx.index.read("v1").await.unwrap();
        assert_eq!(index.jobs.len(), 1);
    }
}
