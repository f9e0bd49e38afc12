//! Persistent Settings Management
//!
//! Handles saving/loading the EQ state to disk.
//!
//! # Storage Locations
//! - Linux: `~/.config/trieq/settings.json`
//! - Windows: `%APPDATA%\trieq\config\settings.json`
//! - macOS: `~/Library/Application Support/com.trieq.trieq/settings.json`

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::config::AnalyzerConfig;
use crate::error::{EngineError, EngineResult};
use crate::params::ParameterSnapshot;

/// Root settings structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EqSettings {
    /// Raw parameter values keyed by name
    #[serde(default)]
    pub parameters: ParameterSnapshot,

    /// Analyzer display preferences
    #[serde(default)]
    pub analyzer: AnalyzerConfig,

    /// When this state was last written
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
}

impl EqSettings {
    /// Load settings from disk, or return default if missing/corrupt
    pub fn load() -> Self {
        match Self::get_config_path() {
            Some(path) => Self::load_from_or_default(&path),
            None => {
                info!("Using default settings");
                Self::default()
            }
        }
    }

    /// Load settings from an explicit file, falling back to defaults
    pub fn load_from_or_default(path: &Path) -> Self {
        if path.exists() {
            match Self::load_from(path) {
                Ok(settings) => return settings,
                Err(e) => error!("Failed to load settings file: {}", e),
            }
        }

        info!("Using default settings");
        Self::default()
    }

    /// Load settings from an explicit file
    pub fn load_from(path: &Path) -> EngineResult<Self> {
        let file = fs::File::open(path)?;
        let settings = serde_json::from_reader(file)?;
        info!("Settings loaded from {:?}", path);
        Ok(settings)
    }

    /// Save settings to the platform config directory
    pub fn save(&mut self) -> EngineResult<()> {
        let path = Self::get_config_path().ok_or(EngineError::NoConfigDir)?;
        self.save_to(&path)
    }

    /// Save settings to an explicit file, stamping `saved_at`
    pub fn save_to(&mut self, path: &Path) -> EngineResult<()> {
        // Ensure directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        self.saved_at = Some(Utc::now());
        let file = fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;

        info!("Settings saved to {:?}", path);
        Ok(())
    }

    /// Get the platform-specific configuration file path
    pub fn get_config_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "trieq", "trieq")
            .map(|proj| proj.config_dir().join("settings.json"))
    }
}
