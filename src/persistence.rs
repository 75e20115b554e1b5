use std::path::{Path, PathBuf};
use anyhow::{Context, Result};

use crate::state::Settings;

const APP_DIR: &str = "ReadAloud";
const STORE_FILE: &str = "settings.json";

pub fn settings_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Cannot find configuration directory"))?;
    Ok(config_dir.join(APP_DIR).join(STORE_FILE))
}

pub fn load_settings() -> Settings {
    match settings_path() {
        Ok(path) => load_settings_from(&path),
        Err(e) => {
            tracing::warn!("{}. Using default settings.", e);
            Settings::default()
        }
    }
}

pub fn load_settings_from(path: &Path) -> Settings {
    if !path.exists() {
        tracing::info!("No stored settings found. Using defaults.");
        return Settings::default();
    }

    let data = match std::fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) => {
            tracing::warn!("Failed to read settings from {}: {}. Using defaults.", path.display(), e);
            return Settings::default();
        }
    };

    match serde_json::from_str::<Settings>(&data) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!("Failed to deserialize stored settings: {}. Using defaults.", e);
            Settings::default()
        }
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    save_settings_to(&settings_path()?, settings)
}

pub fn save_settings_to(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .context("Failed to create settings directory")?;
    }
    let data = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, data)
        .with_context(|| format!("Failed to write settings to {}", path.display()))?;
    Ok(())
}
