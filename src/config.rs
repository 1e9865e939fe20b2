//! Compiler configuration

use crate::error::{CompilerError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StylableConfig {
    /// Joins a namespace and a local name into a scoped name
    pub delimiter: String,
    pub root_class: String,
    /// Keyframe names rejected in addition to the CSS-wide keywords
    pub keyframes_reserved: Vec<String>,
    /// Suffix generated namespaces with a hash of the file path
    pub namespace_hash: bool,
}

impl Default for StylableConfig {
    fn default() -> Self {
        Self {
            delimiter: "--".to_string(),
            root_class: "root".to_string(),
            keyframes_reserved: Vec::new(),
            namespace_hash: true,
        }
    }
}

pub fn load(config_path: &Path) -> Result<StylableConfig> {
    let config_content = fs::read_to_string(config_path).map_err(|e| CompilerError::FileNotFound {
        path: format!("Config file {}: {}", config_path.display(), e),
    })?;
    let config = parse(&config_content, config_path)?;
    log::info!("Loaded configuration from {}", config_path.display());
    Ok(config)
}

/// Parse config text, picking the format from the path's extension
pub fn parse(content: &str, config_path: &Path) -> Result<StylableConfig> {
    match config_path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => serde_json::from_str(content).map_err(|e| CompilerError::InvalidFormat {
            message: format!("Invalid JSON config: {}", e),
        }),
        Some("toml") => toml::from_str(content).map_err(|e| CompilerError::InvalidFormat {
            message: format!("Invalid TOML config: {}", e),
        }),
        _ => Err(CompilerError::InvalidFormat {
            message: "Config file must be .json or .toml format".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config = parse("{\"delimiter\": \"__\"}", Path::new("stylc.json")).unwrap();
        assert_eq!(config.delimiter, "__");
        assert_eq!(config.root_class, "root");
        assert!(config.namespace_hash);
    }

    #[test]
    fn test_toml_config() {
        let config = parse(
            "namespace_hash = false\nkeyframes_reserved = [\"spin\"]\n",
            Path::new("stylc.toml"),
        )
        .unwrap();
        assert!(!config.namespace_hash);
        assert_eq!(config.keyframes_reserved, vec!["spin".to_string()]);
    }

    #[test]
    fn test_unknown_extension_is_invalid() {
        let err = parse("", Path::new("stylc.yaml")).unwrap_err();
        assert!(matches!(err, CompilerError::InvalidFormat { .. }));
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stylc.json");
        fs::write(&path, "{\"root_class\": \"main\"}").unwrap();
        assert_eq!(load(&path).unwrap().root_class, "main");
        assert!(load(&dir.path().join("missing.json")).is_err());
    }
}
