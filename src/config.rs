use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::scan::DEFAULT_SNIFF_BYTES;

/// Top-level configuration for exif-browser.
///
/// Controls how directories are scanned and paged, how edits are written
/// back, and where user settings are stored.
///
/// # Loading
///
/// ```rust,no_run
/// use exif_browser::config::Config;
///
/// // From a JSON file
/// let config = Config::load(Some("config.json".as_ref())).unwrap();
///
/// // Or use defaults and customize
/// let mut config = Config::default();
/// config.scan.page_size = 50;
/// config.output.backup_originals = false;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// Directory scanning and paging.
    pub scan: ScanConfig,
    /// Write-back behavior (dry run, backups).
    pub output: OutputConfig,
    /// Where user settings are persisted. Defaults to `settings.json` next to
    /// the config file.
    pub settings_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScanConfig {
    /// Images per page when browsing.
    pub page_size: usize,
    /// Leading bytes read to sniff a file's type.
    pub sniff_bytes: usize,
}

/// Output and behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    /// If `true`, preview what would be written without modifying any files.
    pub dry_run: bool,
    /// If `true`, create a `.bak` backup before modifying an image.
    pub backup_originals: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            page_size: 20,
            sniff_bytes: DEFAULT_SNIFF_BYTES,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            backup_originals: true,
        }
    }
}

impl Config {
    /// Resolve the config file path: `config.json` beside the executable.
    pub fn config_path() -> Result<PathBuf> {
        let exe_path = std::env::current_exe().context("Failed to get executable path")?;
        let exe_dir = exe_path
            .parent()
            .context("Failed to get executable directory")?;
        Ok(exe_dir.join("config.json"))
    }

    /// Load config from the given path, or from the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            log::warn!(
                "Config file not found at {}. Using defaults.",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;
        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Save config to the given path, or to the default location.
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, contents).context("Failed to write config file")?;
        log::info!("Config saved to {}", config_path.display());
        Ok(())
    }

    /// Settings file location: explicit `settings_file`, else `settings.json`
    /// beside the config file (`config_file`, or the default config path).
    pub fn settings_path(&self, config_file: Option<&Path>) -> Result<PathBuf> {
        if let Some(p) = &self.settings_file {
            return Ok(p.clone());
        }
        let config_file = match config_file {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };
        Ok(config_file.with_file_name("settings.json"))
    }
}
