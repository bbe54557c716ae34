//! EADST configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::import::DEFAULT_IMPORT_LAYER;
use crate::project::DEFAULT_CRS;
use crate::refdb::DB_FILE_NAME;
use crate::trace_links::DEFAULT_SEARCH_RADIUS;

/// Main EADST configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// Project location and CRS
    pub project: ProjectConfig,

    /// Import flow settings
    pub import: ImportConfig,

    /// Reference database settings
    pub reference: ReferenceConfig,

    /// Field tracing settings
    pub tracing: TracingConfig,
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .eadst.yml
        let local_config = PathBuf::from(".eadst.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/eadst/eadst.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("eadst").join("eadst.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read just the log level, before logging is set up. Errors are ignored;
    /// the full load reports them.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let candidates = match config_path {
            Some(path) => vec![path.clone()],
            None => {
                let mut paths = vec![PathBuf::from(".eadst.yml")];
                paths.extend(dirs::config_dir().map(|d| d.join("eadst").join("eadst.yml")));
                paths
            }
        };
        candidates
            .iter()
            .find(|p| p.exists())
            .and_then(|p| fs::read_to_string(p).ok())
            .and_then(|content| serde_yaml::from_str::<Config>(&content).ok())
            .and_then(|config| config.log_level)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;
        fs::write(path, content).context(format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}

/// Project location and CRS
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Project directory (holds 2_GIS_Layers)
    pub path: PathBuf,

    /// CRS for layers created outside a project
    pub crs: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("."),
            crs: DEFAULT_CRS.to_string(),
        }
    }
}

/// Import flow settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Destination layer for imported rows
    #[serde(rename = "layer-name")]
    pub layer_name: String,

    /// Field delimiter of source files
    pub delimiter: char,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            layer_name: DEFAULT_IMPORT_LAYER.to_string(),
            delimiter: ',',
        }
    }
}

impl ImportConfig {
    /// Delimiter as a single byte; non-ASCII delimiters are rejected
    pub fn delimiter_byte(&self) -> Result<u8> {
        u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| eyre::eyre!("Delimiter must be a single ASCII character, got {:?}", self.delimiter))
    }
}

/// Reference database settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceConfig {
    /// Path to the SQLite data standard
    #[serde(rename = "db-path")]
    pub db_path: PathBuf,
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        // Use XDG data directory (~/.local/share/eadst on Linux)
        let db_path = dirs::data_local_dir()
            .map(|d| d.join("eadst"))
            .unwrap_or_else(|| PathBuf::from(".eadst"))
            .join(DB_FILE_NAME);
        Self { db_path }
    }
}

/// Field tracing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TracingConfig {
    /// Pick radius around a clicked point, in layer units
    #[serde(rename = "search-radius")]
    pub search_radius: f64,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            search_radius: DEFAULT_SEARCH_RADIUS,
        }
    }
}
