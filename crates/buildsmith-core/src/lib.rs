//! buildsmith core library
//!
//! Fingerprints custom build configurations and deduplicates build jobs.
//! A build request (selected symbols plus define overrides) is encoded into
//! a canonical fingerprint; the job lifecycle guarantees at most one build
//! per distinct fingerprint per release.

pub mod error;
pub mod fingerprint;
pub mod lifecycle;
pub mod obs;
pub mod release;
pub mod request;
pub mod runner;
pub mod sync;

pub use error::{BuildError, ReleaseError, Result, RunnerError};
pub use fingerprint::{encode, Fingerprint};
pub use lifecycle::JobService;
pub use release::{Release, ReleaseState};
pub use request::{BuildConfig, BuildRequest};
pub use runner::{BuildRunner, ProcessBuildRunner};
pub use sync::{ReleaseSpec, ReleaseSync};

pub use buildsmith_store::{
    BuildIndex, DefineDescriptor, JobRecord, JobStatus, ReleaseCatalog, ShortId, StoreError,
    SymbolDescriptor,
};
