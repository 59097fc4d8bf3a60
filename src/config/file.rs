//! TOML configuration file loading
//!
//! Supports `~/.config/habit-chime/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct ChimeConfigFile {
    /// Sound cue configuration
    #[serde(default)]
    pub sound: SoundFileConfig,

    /// Reward display preferences
    #[serde(default)]
    pub display: DisplayFileConfig,
}

/// Sound cue configuration
#[derive(Debug, Default, Deserialize)]
pub struct SoundFileConfig {
    /// Asset pack name, or "off"
    pub theme: Option<String>,

    /// Base URL of the asset packs
    pub asset_base_url: Option<String>,

    /// Directory downloaded cues are kept in
    pub cache_dir: Option<String>,

    /// Per-request timeout in seconds
    pub fetch_timeout_secs: Option<u64>,
}

/// Reward display preferences
#[derive(Debug, Default, Deserialize)]
pub struct DisplayFileConfig {
    /// Skip the reward summary after scoring a task
    pub hide_task_results: Option<bool>,
}

/// Load the TOML config file from the standard path
///
/// Returns `ChimeConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> ChimeConfigFile {
    config_file_path().map_or_else(ChimeConfigFile::default, |path| load_config_file_from(&path))
}

/// Load a TOML config file from `path`, falling back to defaults
pub fn load_config_file_from(path: &Path) -> ChimeConfigFile {
    if !path.exists() {
        return ChimeConfigFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                ChimeConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            ChimeConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/habit-chime/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("habit-chime").join("config.toml"))
}
