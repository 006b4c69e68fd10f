//! Persistence layer for buildsmith.
//!
//! Owns the shared persistence types and the storage abstractions:
//! - `IndexStore`: per-release build index (fingerprint -> job mapping)
//! - `ArtifactStore`: job request / build configuration documents
//! - `CatalogSource`: release symbol and define catalogs
//!
//! All traits are async and backend-agnostic. The filesystem backend lives
//! in the `fs` module; in-memory fakes are provided for testing via the
//! `fakes` module.

pub mod catalog;
pub mod error;
pub mod fakes;
pub mod fs;
pub mod index;
pub mod traits;

pub use catalog::{DefineDescriptor, ReleaseCatalog, SymbolDescriptor};
pub use error::StoreError;
pub use fs::{FsArtifactStore, FsCatalogSource, FsIndexStore};
pub use index::{BuildIndex, JobRecord, JobStatus, ShortId};
pub use traits::{ArtifactStore, CatalogSource, GetOrCreate, IndexStore, StoreResult};
