//! Release metadata.
//!
//! A release is a named, versioned library drop the service can build from.
//! Metadata is persisted as `<root>/<name>.json`; the unpacked release
//! itself lives in `<root>/<name>/`.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ReleaseError;

/// Download/install state of a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseState {
    Pending,
    Complete,
}

/// Persisted release metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub name: String,
    pub url: String,
    pub state: ReleaseState,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl Release {
    /// Construct a new Pending release.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            url: url.into(),
            state: ReleaseState::Pending,
            created: now,
            updated: now,
        }
    }

    /// Path to the metadata file for a release.
    pub fn metadata_path(root: &Path, name: &str) -> PathBuf {
        root.join(format!("{name}.json"))
    }

    /// Path to the directory containing an unpacked release.
    pub fn dir(root: &Path, name: &str) -> PathBuf {
        root.join(name)
    }

    /// Persist the metadata file.
    pub fn save(&self, root: &Path) -> Result<(), ReleaseError> {
        std::fs::create_dir_all(root)?;
        let data = serde_json::to_vec_pretty(self)?;
        std::fs::write(Self::metadata_path(root, &self.name), data)?;
        Ok(())
    }

    /// Load a release by name.
    pub fn load(root: &Path, name: &str) -> Result<Self, ReleaseError> {
        match std::fs::read(Self::metadata_path(root, name)) {
            Ok(data) => Ok(serde_json::from_slice(&data)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ReleaseError::NotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// All persisted releases, detected by their metadata files.
    pub fn all(root: &Path) -> Result<Vec<Self>, ReleaseError> {
        let entries = match std::fs::read_dir(root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut releases = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                let data = std::fs::read(&path)?;
                releases.push(serde_json::from_slice(&data)?);
            }
        }
        Ok(releases)
    }

    /// Remove the metadata file and the release directory.
    pub fn remove(&self, root: &Path) -> Result<(), ReleaseError> {
        for result in [
            std::fs::remove_file(Self::metadata_path(root, &self.name)),
            std::fs::remove_dir_all(Self::dir(root, &self.name)),
        ] {
            match result {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Mark the release Complete and persist. Refreshes `updated` only.
    pub fn mark_complete(&mut self, root: &Path) -> Result<(), ReleaseError> {
        self.state = ReleaseState::Complete;
        self.updated = Utc::now();
        self.save(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let release = Release::new("v1.2.3", "https://example.com/v1.2.3.tar.gz");
        release.save(dir.path()).unwrap();

        let loaded = Release::load(dir.path(), "v1.2.3").unwrap();
        assert_eq!(loaded, release);
    }

    #[test]
    fn load_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Release::load(dir.path(), "ghost"),
            Err(ReleaseError::NotFound(_))
        ));
    }

    #[test]
    fn all_skips_non_metadata_entries() {
        let dir = tempfile::tempdir().unwrap();
        Release::new("a", "u").save(dir.path()).unwrap();
        Release::new("b", "u").save(dir.path()).unwrap();
        std::fs::create_dir(dir.path().join("a")).unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

        let mut names: Vec<String> = Release::all(dir.path())
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        names.sort();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn all_on_missing_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let releases = Release::all(&dir.path().join("nope")).unwrap();
        assert!(releases.is_empty());
    }

    #[test]
    fn remove_clears_metadata_and_dir() {
        let dir = tempfile::tempdir().unwrap();
        let release = Release::new("v1", "u");
        release.save(dir.path()).unwrap();
        std::fs::create_dir(dir.path().join("v1")).unwrap();
        std::fs::write(dir.path().join("v1/file"), b"x").unwrap();

        release.remove(dir.path()).unwrap();
        assert!(!dir.path().join("v1.json").exists());
        assert!(!dir.path().join("v1").exists());
        // Idempotent.
        release.remove(dir.path()).unwrap();
    }

    #[test]
    fn mark_complete_refreshes_updated_only() {
        let dir = tempfile::tempdir().unwrap();
        let mut release = Release::new("v1", "u");
        let created = release.created;
        release.save(dir.path()).unwrap();

        release.mark_complete(dir.path()).unwrap();
        let loaded = Release::load(dir.path(), "v1").unwrap();
        assert_eq!(loaded.state, ReleaseState::Complete);
        assert_eq!(loaded.created, created);
        assert!(loaded.updated >= created);
    }

    #[test]
    fn state_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ReleaseState::Pending).unwrap(),
            "\"pending\""
        );
        assert_eq!(
            serde_json::to_string(&ReleaseState::Complete).unwrap(),
            "\"complete\""
        );
    }
}
