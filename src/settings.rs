// Settings management and persistence
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::speech::VoiceName;

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Gemini API key. The GEMINI_API_KEY environment variable takes
    /// precedence over this value.
    pub api_key: Option<String>,
    pub default_voice: VoiceName,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            default_voice: VoiceName::default(),
        }
    }
}

impl AppSettings {
    /// Get the settings file path
    pub fn settings_path(app_dir: &Path) -> PathBuf {
        app_dir.join("settings.json")
    }

    /// Load settings from file, or return defaults if file doesn't exist
    pub fn load(app_dir: &Path) -> Result<Self> {
        let path = Self::settings_path(app_dir);

        if !path.exists() {
            log::info!("no settings file found, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read settings file {:?}", path))?;

        let settings: AppSettings =
            serde_json::from_str(&content).context("failed to parse settings")?;

        log::info!("loaded settings from {:?}", path);
        Ok(settings)
    }

    /// Save settings to file
    pub fn save(&self, app_dir: &Path) -> Result<()> {
        fs::create_dir_all(app_dir).context("failed to create settings directory")?;

        let path = Self::settings_path(app_dir);
        let content = serde_json::to_string_pretty(self).context("failed to serialize settings")?;

        fs::write(&path, content)
            .with_context(|| format!("failed to write settings file {:?}", path))?;

        log::info!("saved settings to {:?}", path);
        Ok(())
    }

    /// Resolve the API key, preferring the environment over the stored value.
    pub fn resolve_api_key(&self) -> Option<String> {
        std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| {
                self.api_key
                    .clone()
                    .filter(|key| !key.trim().is_empty())
            })
    }
}
