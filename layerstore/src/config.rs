//! Configuration for layerstore

use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the layer store directory
    #[serde(default = "default_store_path", rename = "store-path")]
    pub store_path: PathBuf,

    /// Pretty-print exported GeoJSON
    #[serde(default = "default_pretty", rename = "pretty-export")]
    pub pretty_export: bool,
}

fn default_store_path() -> PathBuf {
    PathBuf::from("2_GIS_Layers")
}

fn default_pretty() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            pretty_export: default_pretty(),
        }
    }
}

impl Config {
    /// Explicit path, then `./layerstore.yml`, then the user config dir; defaults otherwise.
    /// Only an explicit path that fails to load is an error.
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        if let Some(explicit) = path {
            return Self::from_file(explicit);
        }

        let candidates = [
            Some(PathBuf::from("layerstore.yml")),
            dirs::config_dir().map(|p| p.join("layerstore").join("config.yml")),
        ];
        match candidates.into_iter().flatten().find(|p| p.is_file()) {
            Some(found) => Self::from_file(&found),
            None => Ok(Self::default()),
        }
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).wrap_err_with(|| format!("Cannot read {}", path.display()))?;
        serde_yaml::from_str(&content).wrap_err_with(|| format!("Invalid config in {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        fs::write(path, content).wrap_err_with(|| format!("Cannot write {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load_explicit_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("layerstore.yml");
        let config = Config {
            store_path: PathBuf::from("/data/layers"),
            pretty_export: false,
        };
        config.save(&path).unwrap();

        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded.store_path, PathBuf::from("/data/layers"));
        assert!(!loaded.pretty_export);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = serde_yaml::from_str("store-path: here").unwrap();
        assert_eq!(config.store_path, PathBuf::from("here"));
        assert!(config.pretty_export);
    }

    #[test]
    fn test_missing_explicit_path_is_an_error() {
        let temp = TempDir::new().unwrap();
        let err = Config::load(Some(&temp.path().join("absent.yml"))).unwrap_err();
        assert!(err.to_string().contains("absent.yml"));
    }
}
