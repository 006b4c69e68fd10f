//! Structured observability hooks for the job lifecycle.
//!
//! Events are emitted at `info!` level with stable field names so the log
//! stream can be filtered per release or per job.

use tracing::info;

/// Emit event: an existing job satisfied the request.
pub fn emit_cache_hit(release: &str, fingerprint: &str, short_id: &str) {
    info!(event = "job.cache_hit", release = %release, fingerprint = %fingerprint, short_id = %short_id);
}

/// Emit event: a new Pending job was created for a fingerprint.
pub fn emit_job_created(release: &str, fingerprint: &str, short_id: &str) {
    info!(event = "job.created", release = %release, fingerprint = %fingerprint, short_id = %short_id);
}

/// Emit event: the build runner finished and the job reached a terminal state.
pub fn emit_job_finished(release: &str, short_id: &str, success: bool) {
    info!(event = "job.finished", release = %release, short_id = %short_id, success = success);
}
