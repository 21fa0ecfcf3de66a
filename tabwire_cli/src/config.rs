//! CLI configuration management

use anyhow::{Context, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tabwire_core::{FileStore, TabStore};

/// Get the configuration directory path
pub fn config_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tabwire")
    }

    #[cfg(not(target_os = "windows"))]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".tabwire")
    }
}

/// Get the config file path
pub fn config_file() -> PathBuf {
    config_dir().join("config.yml")
}

/// Default location of the capture snapshot file
pub fn default_data_file() -> PathBuf {
    config_dir().join("captures.json")
}

/// Ensure the config directory exists
pub fn ensure_dirs() -> Result<()> {
    fs::create_dir_all(config_dir()).context("Failed to create config directory")?;
    Ok(())
}

/// Main configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Storage key namespace prefix
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Capacity bound of each tab's request log
    #[serde(default = "default_max_requests")]
    pub max_requests_per_tab: usize,

    /// Idle hours before a tab's data is cleaned up
    #[serde(default = "default_tab_max_age_hours")]
    pub tab_max_age_hours: i64,

    /// Live-view polling sweep interval
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Capture snapshot file (default: captures.json next to the config)
    #[serde(default)]
    pub data_file: Option<PathBuf>,
}

fn default_namespace() -> String {
    tabwire_core::DEFAULT_NAMESPACE.to_string()
}

fn default_max_requests() -> usize {
    tabwire_core::MAX_REQUESTS_PER_TAB
}

fn default_tab_max_age_hours() -> i64 {
    tabwire_core::TAB_MAX_AGE_HOURS
}

fn default_poll_interval_ms() -> u64 {
    tabwire_core::DEFAULT_POLL_INTERVAL.as_millis() as u64
}

impl Default for Config {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            max_requests_per_tab: default_max_requests(),
            tab_max_age_hours: default_tab_max_age_hours(),
            poll_interval_ms: default_poll_interval_ms(),
            data_file: None,
        }
    }
}

impl Config {
    /// Load config from file
    pub fn load() -> Result<Self> {
        let path = config_file();

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config: Config = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        ensure_dirs()?;
        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;
        fs::write(config_file(), content).context("Failed to write config file")?;
        Ok(())
    }

    pub fn data_file(&self) -> PathBuf {
        self.data_file.clone().unwrap_or_else(default_data_file)
    }

    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Open the tab store over the configured snapshot file
    pub fn open_store(&self) -> Result<TabStore> {
        let path = self.data_file();
        tracing::debug!("opening capture store at {}", path.display());
        let backend = FileStore::open(&path)
            .with_context(|| format!("Failed to open capture store at {}", path.display()))?;
        // an absurd configured age saturates instead of overflowing
        let max_age = Duration::try_hours(self.tab_max_age_hours).unwrap_or(Duration::MAX);
        Ok(TabStore::with_limits(
            Arc::new(backend),
            self.namespace.clone(),
            self.max_requests_per_tab,
            max_age,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_engine_constants() {
        let config = Config::default();
        assert_eq!(config.namespace, "tabwire_");
        assert_eq!(config.max_requests_per_tab, 1000);
        assert_eq!(config.tab_max_age_hours, 24);
        assert_eq!(config.poll_interval_ms, 2000);
    }

    #[test]
    fn partial_config_files_fill_in_defaults() {
        let config: Config = serde_yaml::from_str("poll_interval_ms: 500\n").unwrap();
        assert_eq!(config.poll_interval_ms, 500);
        assert_eq!(config.max_requests_per_tab, 1000);
    }
}
