//! Configuration for sixstep

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::preferences::{DEFAULT_MAX_SECTION_SIZE, DEFAULT_SIMILARITY_THRESHOLD, DEFAULT_SOFT_LIMIT};

/// Project-local config file name
const LOCAL_CONFIG: &str = ".sixstep.yml";

/// Main sixstep configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding sessions, meta logs, archives and the state record
    #[serde(rename = "root-dir")]
    pub root_dir: PathBuf,

    /// Input components directory (defaults to `<root-dir>/input_components`)
    #[serde(rename = "components-dir")]
    pub components_dir: Option<PathBuf>,

    /// Directory of `.pmt` prompt template overrides
    #[serde(rename = "prompts-dir")]
    pub prompts_dir: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// Preference consolidation limits
    pub preferences: PreferencesConfig,
}

fn default_root_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sixstep")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
            components_dir: None,
            prompts_dir: None,
            log_level: None,
            preferences: PreferencesConfig::default(),
        }
    }
}

impl Config {
    /// Build a config rooted at `root_dir` with every other setting at its default
    pub fn with_root(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            ..Default::default()
        }
    }

    /// Resolved input components directory
    pub fn components_dir(&self) -> PathBuf {
        self.components_dir
            .clone()
            .unwrap_or_else(|| self.root_dir.join("input_components"))
    }

    /// Load configuration with fallback chain
    ///
    /// 1. Explicit `--config` path (errors are fatal)
    /// 2. `./.sixstep.yml`
    /// 3. `~/.config/sixstep/sixstep.yml`
    /// 4. Defaults
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        debug!(?config_path, "Config::load: called");
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        for candidate in Self::default_paths() {
            if candidate.exists() {
                match Self::load_from_file(&candidate) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        warn!("Failed to load config from {}: {}", candidate.display(), e);
                    }
                }
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is set up
    ///
    /// Never fails; an unreadable config yields None here and is reported
    /// properly by [`Config::load`].
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let path = match config_path {
            Some(path) => Some(path.clone()),
            None => Self::default_paths().into_iter().find(|p| p.exists()),
        }?;
        let content = fs::read_to_string(path).ok()?;
        let config: Self = serde_yaml::from_str(&content).ok()?;
        config.log_level
    }

    fn default_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(LOCAL_CONFIG)];
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("sixstep").join("sixstep.yml"));
        }
        paths
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        fs::write(path, content).context(format!("Failed to write config to {}", path.display()))?;
        Ok(())
    }
}

/// Limits applied when merging preferences into a fragment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreferencesConfig {
    /// Budget for the rendered USER PREFERENCES section, in characters
    #[serde(rename = "max-section-size")]
    pub max_section_size: usize,

    /// Jaccard similarity at or above which two preferences are duplicates
    #[serde(rename = "similarity-threshold")]
    pub similarity_threshold: f64,

    /// Length above which a single preference is warned about
    #[serde(rename = "soft-limit")]
    pub soft_limit: usize,
}

impl Default for PreferencesConfig {
    fn default() -> Self {
        Self {
            max_section_size: DEFAULT_MAX_SECTION_SIZE,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            soft_limit: DEFAULT_SOFT_LIMIT,
        }
    }
}
