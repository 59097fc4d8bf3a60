//! habit-chime - themed sound cues for a gamified habit tracker
//!
//! This library provides:
//! - A per-session cache of decoded sound cues keyed by in-app event
//! - An HTTP loader that keeps downloaded cues on disk
//! - Speaker playback through `cpal`
//! - The reward summary shown after a task is scored
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │        play(event) / preload_all(events)      │
//! └──────────────────────┬───────────────────────┘
//!                        │
//! ┌──────────────────────▼───────────────────────┐
//! │               AudioAssetCache                 │
//! │   hit → SoundPlayer   miss → SoundFetcher     │
//! └──────────┬──────────────────────┬────────────┘
//!            │                      │
//! ┌──────────▼─────────┐ ┌──────────▼────────────┐
//! │  AudioPlayback     │ │  HttpSoundLoader      │
//! │  cpal + rubato     │ │  reqwest + disk copy  │
//! └────────────────────┘ └───────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod playback;
pub mod report;
pub mod reward;
pub mod sound;

pub use config::Config;
pub use error::{Error, Result};
pub use playback::{AudioPlayback, SoundPlayer};
pub use report::{ErrorReporter, TracingReporter};
pub use reward::{RewardChip, RewardKind, RewardSummary, TaskScoringResult};
pub use sound::{
    AudioAssetCache, HttpSoundLoader, PlayOutcome, SoundEvent, SoundFetcher, SoundFile,
    SoundTheme,
};
