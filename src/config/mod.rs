//! Configuration management for habit-chime
//!
//! Values resolve as environment > TOML file > default.

pub mod file;

use std::path::PathBuf;
use std::time::Duration;

use crate::sound::{DEFAULT_ASSET_BASE_URL, SoundTheme};
use crate::{Error, Result};

use file::ChimeConfigFile;

/// Default per-request timeout for cue downloads
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 15;

/// habit-chime configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Sound cue configuration
    pub sound: SoundConfig,

    /// Reward display preferences
    pub display: DisplayConfig,
}

/// Sound cue configuration
#[derive(Debug, Clone)]
pub struct SoundConfig {
    /// Active theme; "off" disables cues
    pub theme: SoundTheme,

    /// Base URL of the asset packs
    pub asset_base_url: String,

    /// Directory downloaded cues are kept in
    pub cache_dir: PathBuf,

    /// Per-request download timeout
    pub fetch_timeout: Duration,
}

impl Default for SoundConfig {
    fn default() -> Self {
        Self {
            theme: SoundTheme::off(),
            asset_base_url: DEFAULT_ASSET_BASE_URL.to_string(),
            cache_dir: default_cache_dir(),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
        }
    }
}

/// Reward display preferences
#[derive(Debug, Clone, Copy, Default)]
pub struct DisplayConfig {
    /// Skip the reward summary after scoring a task
    pub hide_task_results: bool,
}

/// Default cue directory: `~/.cache/habit-chime/sounds/`
fn default_cache_dir() -> PathBuf {
    directories::BaseDirs::new().map_or_else(
        || PathBuf::from(".cache/habit-chime/sounds"),
        |d| d.cache_dir().join("habit-chime").join("sounds"),
    )
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Config {
    /// Load configuration from the environment and the config file
    ///
    /// # Errors
    ///
    /// Returns error if the configured theme name is invalid
    pub fn load() -> Result<Self> {
        let fc = file::load_config_file();
        Self::from_sources(fc, |key| std::env::var(key).ok())
    }

    /// Merge a parsed config file with variables from `env`
    ///
    /// # Errors
    ///
    /// Returns error if the configured theme name is invalid
    pub fn from_sources(fc: ChimeConfigFile, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = SoundConfig::default();

        let theme = env("CHIME_SOUND_THEME")
            .or(fc.sound.theme)
            .map(SoundTheme::new)
            .transpose()
            .map_err(|e| Error::Config(e.to_string()))?
            .unwrap_or(defaults.theme);

        let sound = SoundConfig {
            theme,
            asset_base_url: env("CHIME_ASSET_URL")
                .or(fc.sound.asset_base_url)
                .unwrap_or(defaults.asset_base_url),
            cache_dir: env("CHIME_CACHE_DIR")
                .or(fc.sound.cache_dir)
                .map_or(defaults.cache_dir, PathBuf::from),
            fetch_timeout: env("CHIME_FETCH_TIMEOUT")
                .and_then(|s| s.parse().ok())
                .or(fc.sound.fetch_timeout_secs)
                .map_or(defaults.fetch_timeout, Duration::from_secs),
        };

        let display = DisplayConfig {
            hide_task_results: env("CHIME_HIDE_TASK_RESULTS")
                .and_then(|s| parse_bool(&s))
                .or(fc.display.hide_task_results)
                .unwrap_or(false),
        };

        Ok(Self { sound, display })
    }
}
