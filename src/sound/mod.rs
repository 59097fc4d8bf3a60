//! Sound cues for in-app events
//!
//! A cue is identified by a [`SoundEvent`] and resolved against the active
//! [`SoundTheme`]. Resolved cues are kept as decoded [`SoundFile`]s by the
//! [`AudioAssetCache`].

pub mod cache;
mod decode;
mod loader;

pub use cache::{AudioAssetCache, PlayOutcome};
pub use decode::{Pcm, decode};
pub use loader::{DEFAULT_ASSET_BASE_URL, HttpSoundLoader};

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::{Error, Result};

/// A semantic in-app event that may have an audio cue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SoundEvent {
    AchievementUnlocked,
    Chat,
    Daily,
    Death,
    ItemDrop,
    LevelUp,
    MinusHabit,
    PlusHabit,
    Reward,
    Todo,
}

impl SoundEvent {
    /// Every event with a cue in the standard asset packs
    pub const ALL: [Self; 10] = [
        Self::AchievementUnlocked,
        Self::Chat,
        Self::Daily,
        Self::Death,
        Self::ItemDrop,
        Self::LevelUp,
        Self::MinusHabit,
        Self::PlusHabit,
        Self::Reward,
        Self::Todo,
    ];

    /// File stem of the cue inside a theme's asset pack
    #[must_use]
    pub const fn file_stem(self) -> &'static str {
        match self {
            Self::AchievementUnlocked => "Achievement_Unlocked",
            Self::Chat => "Chat",
            Self::Daily => "Daily",
            Self::Death => "Death",
            Self::ItemDrop => "Item_Drop",
            Self::LevelUp => "Level_Up",
            Self::MinusHabit => "Minus_Habit",
            Self::PlusHabit => "Plus_Habit",
            Self::Reward => "Reward",
            Self::Todo => "Todo",
        }
    }
}

impl fmt::Display for SoundEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.file_stem())
    }
}

/// Lowercase with separators stripped, so `Level_Up`, `level-up` and `levelup` match
fn normalize_event_name(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

impl FromStr for SoundEvent {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = normalize_event_name(s);
        Self::ALL
            .into_iter()
            .find(|event| normalize_event_name(event.file_stem()) == wanted)
            .ok_or_else(|| Error::UnknownEvent(s.to_string()))
    }
}

/// Name of the asset pack cues are pulled from
///
/// The [`SoundTheme::OFF`] sentinel disables audio.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SoundTheme(String);

impl SoundTheme {
    /// Sentinel theme name that disables all sound
    pub const OFF: &'static str = "off";

    /// Create a theme from its name
    ///
    /// # Errors
    ///
    /// Returns error if the name is empty or contains a path separator
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(Error::Theme("theme name is empty".to_string()));
        }
        if trimmed.contains(['/', '\\']) || trimmed == ".." {
            return Err(Error::Theme(format!("{trimmed:?} is not a valid theme name")));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The disabled theme
    #[must_use]
    pub fn off() -> Self {
        Self(Self::OFF.to_string())
    }

    /// Whether this theme disables audio
    #[must_use]
    pub fn is_off(&self) -> bool {
        self.0 == Self::OFF
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SoundTheme {
    fn default() -> Self {
        Self::off()
    }
}

impl fmt::Display for SoundTheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl FromStr for SoundTheme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

/// A decoded sound cue for one event under one theme
#[derive(Debug, Clone)]
pub struct SoundFile {
    theme: SoundTheme,
    event: SoundEvent,
    samples: Arc<[f32]>,
    sample_rate: u32,
    path: Option<PathBuf>,
}

impl SoundFile {
    /// Wrap already decoded mono samples
    #[must_use]
    pub fn new(theme: SoundTheme, event: SoundEvent, pcm: Pcm) -> Self {
        Self {
            theme,
            event,
            samples: pcm.samples.into(),
            sample_rate: pcm.sample_rate,
            path: None,
        }
    }

    /// Record where the encoded cue lives on disk
    #[must_use]
    pub fn with_path(mut self, path: PathBuf) -> Self {
        self.path = Some(path);
        self
    }

    #[must_use]
    pub const fn theme(&self) -> &SoundTheme {
        &self.theme
    }

    #[must_use]
    pub const fn event(&self) -> SoundEvent {
        self.event
    }

    /// Mono samples in `[-1.0, 1.0]`
    #[must_use]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Cheap shared handle to the samples
    #[must_use]
    pub fn shared_samples(&self) -> Arc<[f32]> {
        Arc::clone(&self.samples)
    }

    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// On-disk location of the encoded cue, if it came from the loader
    #[must_use]
    pub fn path(&self) -> Option<&std::path::Path> {
        self.path.as_deref()
    }

    /// Playback length
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / f64::from(self.sample_rate))
    }
}

/// Resolves `(theme, event)` to a playable cue, possibly over the network
#[async_trait]
pub trait SoundFetcher: Send + Sync {
    /// Fetch and decode the cue for one event
    ///
    /// # Errors
    ///
    /// Returns error if the cue cannot be downloaded, read or decoded
    async fn fetch(&self, theme: &SoundTheme, event: SoundEvent) -> Result<SoundFile>;

    /// Fetcher name for logging
    fn name(&self) -> &'static str;
}
