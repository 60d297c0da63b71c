//! User preferences: default directory and dark mode.
//!
//! [`SettingsService`] holds the persisted settings and the live dark-mode
//! flag as observable state. [`SettingsDialog`] is one edit session over it:
//! dark mode previews immediately, everything else only lands on save, and
//! cancel puts the persisted dark mode back.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    /// Directory opened at start-up. Empty means "no default".
    pub default_dir: String,
    pub dark_mode: bool,
}

impl Settings {
    pub fn default_dir(&self) -> Option<&Path> {
        if self.default_dir.is_empty() {
            None
        } else {
            Some(Path::new(&self.default_dir))
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("'{0}' is not a valid path")]
    InvalidPath(String),
    #[error("Failed to persist settings: {0:#}")]
    Persist(anyhow::Error),
}

/// Where settings live between runs.
pub trait SettingsStore: Send + Sync {
    fn load(&self) -> Result<Settings>;
    fn save(&self, settings: &Settings) -> Result<()>;
}

/// Settings as a pretty-printed JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for JsonFileStore {
    fn load(&self) -> Result<Settings> {
        if !self.path.exists() {
            log::debug!("No settings at {}, using defaults", self.path.display());
            return Ok(Settings::default());
        }
        let contents =
            std::fs::read_to_string(&self.path).context("Failed to read settings file")?;
        serde_json::from_str(&contents).context("Failed to parse settings file")
    }

    fn save(&self, settings: &Settings) -> Result<()> {
        let contents =
            serde_json::to_string_pretty(settings).context("Failed to serialize settings")?;
        std::fs::write(&self.path, contents).context("Failed to write settings file")?;
        log::info!("Settings saved to {}", self.path.display());
        Ok(())
    }
}

/// Keeps settings in memory only.
#[derive(Debug, Default)]
pub struct MemoryStore {
    saved: Mutex<Option<Settings>>,
}

impl MemoryStore {
    pub fn with(settings: Settings) -> Self {
        Self {
            saved: Mutex::new(Some(settings)),
        }
    }
}

impl SettingsStore for MemoryStore {
    fn load(&self) -> Result<Settings> {
        let saved = self
            .saved
            .lock()
            .map_err(|_| anyhow::anyhow!("settings lock poisoned"))?;
        Ok(saved.clone().unwrap_or_default())
    }

    fn save(&self, settings: &Settings) -> Result<()> {
        let mut saved = self
            .saved
            .lock()
            .map_err(|_| anyhow::anyhow!("settings lock poisoned"))?;
        *saved = Some(settings.clone());
        Ok(())
    }
}

pub struct SettingsService {
    store: Box<dyn SettingsStore>,
    settings: watch::Sender<Settings>,
    dark_mode: watch::Sender<bool>,
}

impl SettingsService {
    /// Load from `store`, falling back to defaults when it cannot be read.
    pub fn load(store: impl SettingsStore + 'static) -> Self {
        let settings = store.load().unwrap_or_else(|e| {
            log::warn!("Could not load settings, using defaults: {e:#}");
            Settings::default()
        });
        let (dark_mode, _) = watch::channel(settings.dark_mode);
        let (settings, _) = watch::channel(settings);
        Self {
            store: Box::new(store),
            settings,
            dark_mode,
        }
    }

    /// Last saved settings.
    pub fn current(&self) -> Settings {
        self.settings.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Settings> {
        self.settings.subscribe()
    }

    /// Dark mode as currently shown, which may be an unsaved preview.
    pub fn dark_mode(&self) -> bool {
        *self.dark_mode.borrow()
    }

    pub fn subscribe_dark_mode(&self) -> watch::Receiver<bool> {
        self.dark_mode.subscribe()
    }

    /// Switch the theme without persisting anything.
    pub fn set_dark_mode(&self, dark_mode: bool) {
        self.dark_mode.send_replace(dark_mode);
    }

    /// Persist and publish.
    pub fn save(&self, settings: Settings) -> Result<()> {
        self.store.save(&settings)?;
        self.dark_mode.send_replace(settings.dark_mode);
        self.settings.send_replace(settings);
        Ok(())
    }
}

/// One edit session of the settings.
pub struct SettingsDialog<'a> {
    service: &'a SettingsService,
    pub settings: Settings,
    invalid: bool,
}

impl<'a> SettingsDialog<'a> {
    pub fn open(service: &'a SettingsService) -> Self {
        Self {
            service,
            settings: service.current(),
            invalid: false,
        }
    }

    /// Whether the last save attempt was rejected for an invalid path.
    pub fn is_invalid(&self) -> bool {
        self.invalid
    }

    pub fn set_default_dir(&mut self, dir: impl Into<String>) {
        self.settings.default_dir = dir.into();
    }

    /// Take the result of a directory chooser; a cancelled chooser changes nothing.
    pub fn apply_selected_dir(&mut self, dir: Option<PathBuf>) {
        if let Some(dir) = dir {
            self.settings.default_dir = dir.to_string_lossy().into_owned();
        }
    }

    /// Live preview: applies immediately, persisted only on save.
    pub fn set_dark_mode(&mut self, dark_mode: bool) {
        self.settings.dark_mode = dark_mode;
        self.service.set_dark_mode(dark_mode);
    }

    /// Validate and persist. On error the dialog stays open with `is_invalid()` set.
    pub fn save(&mut self) -> Result<(), SettingsError> {
        let dir = &self.settings.default_dir;
        if !dir.is_empty() && !is_valid_path(dir) {
            self.invalid = true;
            return Err(SettingsError::InvalidPath(dir.clone()));
        }
        self.invalid = false;
        self.service
            .save(self.settings.clone())
            .map_err(SettingsError::Persist)
    }

    /// Drop the edits and restore the saved dark mode.
    pub fn cancel(self) {
        self.service.set_dark_mode(self.service.current().dark_mode);
    }
}

/// Syntactic path check.
///
/// Rejects control characters and `< > " | ? *` anywhere, and `:` anywhere
/// except in a leading drive prefix such as `C:`.
pub fn is_valid_path(path: &str) -> bool {
    if path.trim().is_empty() {
        return false;
    }

    let rest = match path.as_bytes() {
        [drive, b':', ..] if drive.is_ascii_alphabetic() => &path[2..],
        _ => path,
    };

    !rest
        .chars()
        .any(|c| c.is_control() || matches!(c, '<' | '>' | ':' | '"' | '|' | '?' | '*'))
}
