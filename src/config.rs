use crate::forecast::DEFAULT_MIN_ENTRIES;
use crate::models::DATE_FMT;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PathsConfig {
    pub store_json: PathBuf,
    pub backup_dir: PathBuf,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BackupConfig {
    pub keep_recent: usize,
    pub keep_historical: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WeightsConfig {
    /// Persist weights rescaled to sum 1 instead of raw row averages.
    pub normalize: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ForecastConfig {
    pub min_entries: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct UiConfig {
    pub date_format: String,
    pub default_theme: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Settings {
    pub paths: PathsConfig,
    pub backup: BackupConfig,
    pub weights: WeightsConfig,
    pub forecast: ForecastConfig,
    pub ui: UiConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub settings: Settings,
    pub base_dir: PathBuf,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let dirs = project_dirs()?;
        Self::load_from(dirs.data_dir())
    }

    /// Reads `settings.json` under `base_dir`, writing defaults first if it
    /// does not exist yet.
    pub fn load_from(base_dir: &Path) -> Result<Self> {
        fs::create_dir_all(base_dir)
            .with_context(|| format!("Failed to create {}", base_dir.display()))?;
        let settings_path = base_dir.join("settings.json");
        let settings: Settings = load_or_write(&settings_path, default_settings(base_dir))?;

        fs::create_dir_all(settings.paths.backup_dir.as_path())?;
        if let Some(parent) = settings.paths.store_json.parent() {
            fs::create_dir_all(parent)?;
        }
        log::debug!("loaded settings from {}", settings_path.display());

        Ok(AppConfig {
            settings,
            base_dir: base_dir.to_path_buf(),
        })
    }
}

/// Reads settings from `path`, or writes `default` there on first run.
fn load_or_write<T>(path: &Path, default: T) -> Result<T>
where
    T: Serialize + DeserializeOwned,
{
    match fs::read_to_string(path) {
        Ok(text) => {
            serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
        }
        Err(err) if err.kind() == ErrorKind::NotFound => {
            write_pretty(path, &default)?;
            log::info!("wrote default settings to {}", path.display());
            Ok(default)
        }
        Err(err) => Err(err).with_context(|| format!("Failed to read {}", path.display())),
    }
}

fn write_pretty<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("com", "example", "wellbeing_planner")
        .context("Unable to determine platform data directory")
}

pub fn default_settings(base_dir: &Path) -> Settings {
    Settings {
        paths: PathsConfig {
            store_json: base_dir.join("data").join("store.json"),
            backup_dir: base_dir.join("backups"),
        },
        backup: BackupConfig {
            keep_recent: 3,
            keep_historical: 3,
        },
        weights: WeightsConfig { normalize: true },
        forecast: ForecastConfig {
            min_entries: DEFAULT_MIN_ENTRIES,
        },
        ui: UiConfig {
            date_format: DATE_FMT.into(),
            default_theme: "light".into(),
        },
    }
}
