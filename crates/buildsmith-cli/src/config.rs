//! CLI configuration file.
//!
//! A JSON document naming the releases to serve and the commands run inside
//! each unpacked release directory.

use std::path::Path;

use serde::{Deserialize, Serialize};

use buildsmith_core::ReleaseSpec;

fn default_install_command() -> Vec<String> {
    vec!["npm".to_string(), "install".to_string()]
}

fn default_info_command() -> Vec<String> {
    vec!["node".to_string(), "tasks/generate-info.js".to_string()]
}

fn default_build_command() -> Vec<String> {
    vec!["node".to_string(), "tasks/build.js".to_string()]
}

/// Parsed configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Releases to keep synced.
    #[serde(default)]
    pub releases: Vec<ReleaseSpec>,

    /// Run after unpacking a release (empty disables the step).
    #[serde(default = "default_install_command")]
    pub install_command: Vec<String>,

    /// Produces `build/info.json` in a release directory.
    #[serde(default = "default_info_command")]
    pub info_command: Vec<String>,

    /// Build runner command; the build-config path and output path are
    /// appended as the final two arguments.
    #[serde(default = "default_build_command")]
    pub build_command: Vec<String>,
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let data = std::fs::read(path)
            .map_err(|e| anyhow::anyhow!("failed to read config {}: {e}", path.display()))?;
        Ok(serde_json::from_slice(&data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_uses_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert!(config.releases.is_empty());
        assert_eq!(config.install_command, vec!["npm", "install"]);
        assert_eq!(config.build_command[0], "node");
    }

    #[test]
    fn full_config_parses() {
        let json = r#"{
            "releases": [
                {"name": "v1.2.3", "url": "https://example.com/v1.2.3.tar.gz"}
            ],
            "install_command": [],
            "info_command": ["make", "info"],
            "build_command": ["make", "build"]
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.releases[0].name, "v1.2.3");
        assert!(config.install_command.is_empty());
        assert_eq!(config.info_command, vec!["make", "info"]);
    }

    #[test]
    fn load_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load(&dir.path().join("absent.json")).is_err());
    }
}
