//! Build request and derived build configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use buildsmith_store::ReleaseCatalog;

/// A user's build selection: exported symbols plus define overrides.
///
/// `defines` is partial; only names present override the catalog default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRequest {
    #[serde(default)]
    pub symbols: Vec<String>,
    #[serde(default)]
    pub defines: BTreeMap<String, bool>,
}

/// Full build configuration handed to the build runner: the requested
/// exports and the complete effective define map (catalog defaults overlaid
/// with the request's overrides).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
    pub exports: Vec<String>,
    pub defines: BTreeMap<String, bool>,
}

impl BuildConfig {
    pub fn derive(request: &BuildRequest, catalog: &ReleaseCatalog) -> Self {
        let defines = catalog
            .defines
            .iter()
            .map(|d| {
                let value = request.defines.get(&d.name).copied().unwrap_or(d.default);
                (d.name.clone(), value)
            })
            .collect();
        Self {
            exports: request.symbols.clone(),
            defines,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use buildsmith_store::{DefineDescriptor, SymbolDescriptor};

    #[test]
    fn request_parses_submitted_json() {
        let json = r#"{"symbols": ["symbol.1", "symbol.3"], "defines": {"define.0": true}}"#;
        let request: BuildRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.symbols.len(), 2);
        assert_eq!(request.defines.get("define.0"), Some(&true));
    }

    #[test]
    fn request_fields_default_to_empty() {
        let request: BuildRequest = serde_json::from_str("{}").unwrap();
        assert!(request.symbols.is_empty());
        assert!(request.defines.is_empty());
    }

    #[test]
    fn derived_config_overlays_defaults() {
        let catalog = ReleaseCatalog::new(
            vec![SymbolDescriptor { name: "symbol.0".to_string() }],
            vec![
                DefineDescriptor { name: "define.0".to_string(), default: true },
                DefineDescriptor { name: "define.1".to_string(), default: false },
            ],
        );
        let request = BuildRequest {
            symbols: vec!["symbol.0".to_string()],
            defines: [("define.1".to_string(), true)].into_iter().collect(),
        };

        let config = BuildConfig::derive(&request, &catalog);
        assert_eq!(config.exports, vec!["symbol.0"]);
        assert_eq!(config.defines.get("define.0"), Some(&true));
        assert_eq!(config.defines.get("define.1"), Some(&true));
    }

    #[test]
    fn derived_config_covers_every_catalog_define() {
        let catalog = ReleaseCatalog::new(
            vec![],
            vec![
                DefineDescriptor { name: "define.0".to_string(), default: false },
                DefineDescriptor { name: "define.1".to_string(), default: false },
            ],
        );
        let config = BuildConfig::derive(&BuildRequest::default(), &catalog);
        assert_eq!(config.defines.len(), 2);
        assert!(config.defines.values().all(|v| !v));
    }
}
