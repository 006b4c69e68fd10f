//! Release synchronization: download, unpack, install, generate info.
//!
//! On startup (or on demand) the configured release list is reconciled with
//! what is on disk: incomplete or no-longer-configured releases are removed,
//! then each new release is downloaded, unpacked, installed, and its catalog
//! document generated, before being marked Complete.

use std::io::Write;
use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::{info, warn};

use crate::error::ReleaseError;
use crate::release::{Release, ReleaseState};

/// One configured release: a name and the archive URL to fetch it from.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ReleaseSpec {
    pub name: String,
    pub url: String,
}

/// Reconciles configured releases with the on-disk release root.
pub struct ReleaseSync {
    root: PathBuf,
    client: reqwest::Client,
    /// Run in the unpacked release directory after download (e.g. a package
    /// install). Empty vector skips the step.
    install_command: Vec<String>,
    /// Run in the unpacked release directory to produce `build/info.json`.
    /// Empty vector skips the step.
    info_command: Vec<String>,
}

impl ReleaseSync {
    pub fn new(
        root: impl Into<PathBuf>,
        install_command: Vec<String>,
        info_command: Vec<String>,
    ) -> Self {
        Self {
            root: root.into(),
            client: reqwest::Client::new(),
            install_command,
            info_command,
        }
    }

    /// Remove stale releases, then fetch anything configured but missing.
    /// A failure aborts the sync of that release and is returned; releases
    /// already Complete are never touched.
    pub async fn sync(&self, configured: &[ReleaseSpec]) -> Result<(), ReleaseError> {
        self.remove_stale(configured)?;
        for spec in configured {
            if Release::metadata_path(&self.root, &spec.name).exists() {
                continue;
            }
            self.fetch(spec).await?;
        }
        Ok(())
    }

    /// Remove releases that are incomplete, no longer configured, or whose
    /// URL changed since they were fetched.
    fn remove_stale(&self, configured: &[ReleaseSpec]) -> Result<(), ReleaseError> {
        for release in Release::all(&self.root)? {
            let still_wanted = configured
                .iter()
                .any(|spec| spec.name == release.name && spec.url == release.url);
            if release.state == ReleaseState::Complete && still_wanted {
                continue;
            }
            warn!(release = %release.name, state = ?release.state, "removing outdated or incomplete release");
            release.remove(&self.root)?;
        }
        Ok(())
    }

    /// Download, unpack, install, and generate the catalog for one release.
    async fn fetch(&self, spec: &ReleaseSpec) -> Result<(), ReleaseError> {
        let dir = Release::dir(&self.root, &spec.name);
        if dir.exists() {
            return Err(ReleaseError::AlreadyExists(spec.name.clone()));
        }

        let mut release = Release::new(&spec.name, &spec.url);
        release.save(&self.root)?;
        std::fs::create_dir_all(&dir)?;

        info!(release = %spec.name, url = %spec.url, "downloading release");
        let archive = self.download(spec).await?;
        self.run_step(
            &spec.name,
            &self.root,
            &[
                "tar".to_string(),
                "-xzf".to_string(),
                archive.path().to_string_lossy().into_owned(),
                "-C".to_string(),
                dir.to_string_lossy().into_owned(),
            ],
        )
        .await?;

        if !self.install_command.is_empty() {
            info!(release = %spec.name, "installing release");
            self.run_step(&spec.name, &dir, &self.install_command).await?;
        }
        if !self.info_command.is_empty() {
            info!(release = %spec.name, "generating release info");
            self.run_step(&spec.name, &dir, &self.info_command).await?;
        }

        release.mark_complete(&self.root)?;
        info!(release = %spec.name, "release ready");
        Ok(())
    }

    /// Stream the archive into a temp file next to the release directories.
    async fn download(&self, spec: &ReleaseSpec) -> Result<tempfile::NamedTempFile, ReleaseError> {
        let wrap = |source| ReleaseError::Download {
            name: spec.name.clone(),
            source,
        };

        let mut response = self
            .client
            .get(&spec.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(wrap)?;

        let mut archive = tempfile::NamedTempFile::new_in(&self.root)?;
        while let Some(chunk) = response.chunk().await.map_err(wrap)? {
            archive.write_all(&chunk)?;
        }
        archive.flush()?;
        Ok(archive)
    }

    /// Run one subprocess step, capturing stderr for diagnostics.
    async fn run_step(
        &self,
        name: &str,
        dir: &Path,
        command: &[String],
    ) -> Result<(), ReleaseError> {
        let (program, args) = command
            .split_first()
            .expect("sync step commands are never empty");
        let output = Command::new(program)
            .args(args)
            .current_dir(dir)
            .output()
            .await
            .map_err(|e| ReleaseError::Command {
                name: name.to_string(),
                command: command.join(" "),
                stderr: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(ReleaseError::Command {
                name: name.to_string(),
                command: command.join(" "),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(())
    }
}
