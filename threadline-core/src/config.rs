//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/threadline/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/threadline/` (~/.config/threadline/)
//! - State/Logs: `$XDG_STATE_HOME/threadline/` (~/.local/state/threadline/)

use crate::error::{Error, Result};
use crate::segment::KindConfig;
use crate::types::DelegationKind;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Segmentation thresholds and filler prefixes
    #[serde(default)]
    pub segmentation: SegmentationConfig,
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

/// Segmentation settings.
///
/// Every field is optional; anything left out keeps the built-in value of
/// the corresponding [`KindConfig`].
#[derive(Debug, Deserialize, Default, Clone)]
pub struct SegmentationConfig {
    #[serde(default)]
    pub research: KindOverrides,

    #[serde(default)]
    pub critique: KindOverrides,

    #[serde(default)]
    pub planning: KindOverrides,

    /// Replaces the default acknowledgement prefix list for every kind
    #[serde(default)]
    pub acknowledgement_prefixes: Option<Vec<String>>,
}

/// Threshold overrides for one delegation kind
#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct KindOverrides {
    pub min_terminal_len: Option<usize>,
    pub min_narrative_len: Option<usize>,
    pub count_unclassified_results: Option<bool>,
}

impl SegmentationConfig {
    pub fn overrides(&self, kind: DelegationKind) -> &KindOverrides {
        match kind {
            DelegationKind::Research => &self.research,
            DelegationKind::Critique => &self.critique,
            DelegationKind::Planning => &self.planning,
        }
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        for kind in DelegationKind::ALL {
            let overrides = self.overrides(kind);
            if overrides.min_terminal_len == Some(0) {
                return Err(Error::Config(format!(
                    "segmentation.{}.min_terminal_len must be at least 1",
                    kind
                )));
            }
            if overrides.min_narrative_len == Some(0) {
                return Err(Error::Config(format!(
                    "segmentation.{}.min_narrative_len must be at least 1",
                    kind
                )));
            }
        }

        if let Some(prefixes) = &self.acknowledgement_prefixes {
            if prefixes.iter().any(|p| p.trim().is_empty()) {
                return Err(Error::Config(
                    "segmentation.acknowledgement_prefixes must not contain empty entries"
                        .to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Built-in kind configurations with these overrides applied.
    pub fn kind_configs(&self) -> Vec<KindConfig> {
        DelegationKind::ALL
            .into_iter()
            .map(|kind| {
                let mut config = KindConfig::for_kind(kind);
                let overrides = self.overrides(kind);
                if let Some(len) = overrides.min_terminal_len {
                    config.min_terminal_len = len;
                }
                if let Some(len) = overrides.min_narrative_len {
                    config.min_narrative_len = len;
                }
                if let Some(count) = overrides.count_unclassified_results {
                    config.count_unclassified_results = count;
                }
                if let Some(prefixes) = &self.acknowledgement_prefixes {
                    // Matching is against lowercased text
                    config.acknowledgement_prefixes =
                        prefixes.iter().map(|p| p.to_lowercase()).collect();
                }
                config
            })
            .collect()
    }
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.validate()?;
        tracing::debug!(path = %path.display(), "Loaded config");

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.logging.max_files == 0 {
            return Err(Error::Config(
                "logging.max_files must be at least 1".to_string(),
            ));
        }
        self.segmentation.validate()
    }

    /// Kind configurations for the segmenter, with overrides applied
    pub fn kind_configs(&self) -> Vec<KindConfig> {
        self.segmentation.kind_configs()
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/threadline/config.toml` (~/.config/threadline/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("threadline").join("config.toml")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/threadline/` (~/.local/state/threadline/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("threadline")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/threadline/threadline.log` (~/.local/state/threadline/threadline.log)
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("threadline.log")
    }

    /// Ensure XDG base directory environment variables are set.
    ///
    /// Called by the CLI before logging starts so every component resolves
    /// the same directories.
    pub fn ensure_xdg_env() {
        let home = home_dir();

        if std::env::var("XDG_STATE_HOME").is_err() {
            std::env::set_var("XDG_STATE_HOME", home.join(".local/state"));
        }

        if std::env::var("XDG_CONFIG_HOME").is_err() {
            std::env::set_var("XDG_CONFIG_HOME", home.join(".config"));
        }
    }
}
