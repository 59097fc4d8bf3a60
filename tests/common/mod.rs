//! Shared test utilities

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use habit_chime::sound::Pcm;
use habit_chime::{
    AudioAssetCache, Error, ErrorReporter, Result, SoundEvent, SoundFetcher, SoundFile,
    SoundPlayer, SoundTheme,
};

/// Fetcher that counts calls, fails on demand and can be held in flight
#[derive(Default)]
pub struct FakeFetcher {
    calls: Mutex<HashMap<SoundEvent, usize>>,
    failing: Mutex<HashSet<SoundEvent>>,
    panicking: Mutex<HashSet<SoundEvent>>,
    gate: Option<Arc<Semaphore>>,
}

impl FakeFetcher {
    /// Fetches block until [`FakeFetcher::release`] hands out permits
    pub fn gated() -> Self {
        Self {
            gate: Some(Arc::new(Semaphore::new(0))),
            ..Self::default()
        }
    }

    pub fn release(&self, fetches: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(fetches);
        }
    }

    pub fn fail(&self, event: SoundEvent) {
        self.failing.lock().unwrap().insert(event);
    }

    pub fn heal(&self, event: SoundEvent) {
        self.failing.lock().unwrap().remove(&event);
    }

    /// The next fetch of `event` panics instead of returning
    pub fn panic_once(&self, event: SoundEvent) {
        self.panicking.lock().unwrap().insert(event);
    }

    pub fn calls(&self, event: SoundEvent) -> usize {
        self.calls.lock().unwrap().get(&event).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl SoundFetcher for FakeFetcher {
    async fn fetch(&self, theme: &SoundTheme, event: SoundEvent) -> Result<SoundFile> {
        *self.calls.lock().unwrap().entry(event).or_default() += 1;

        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }

        if self.panicking.lock().unwrap().remove(&event) {
            panic!("fetcher blew up on {event}");
        }

        if self.failing.lock().unwrap().contains(&event) {
            return Err(Error::Fetch(format!("{theme}/{event}: HTTP 404")));
        }

        Ok(SoundFile::new(theme.clone(), event, short_clip()))
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Player that records what it was asked to play
#[derive(Default)]
pub struct RecordingPlayer {
    played: Mutex<Vec<(String, SoundEvent)>>,
    broken: bool,
}

impl RecordingPlayer {
    pub fn broken() -> Self {
        Self {
            broken: true,
            ..Self::default()
        }
    }

    pub fn played(&self) -> Vec<SoundEvent> {
        self.played.lock().unwrap().iter().map(|(_, e)| *e).collect()
    }

    pub fn played_with_theme(&self) -> Vec<(String, SoundEvent)> {
        self.played.lock().unwrap().clone()
    }
}

impl SoundPlayer for RecordingPlayer {
    fn play(&self, sound: &SoundFile) -> Result<()> {
        if self.broken {
            return Err(Error::Audio("no output device".to_string()));
        }
        self.played
            .lock()
            .unwrap()
            .push((sound.theme().to_string(), sound.event()));
        Ok(())
    }
}

/// Reporter that keeps every report
#[derive(Default)]
pub struct RecordingReporter {
    reports: Mutex<Vec<String>>,
}

impl RecordingReporter {
    pub fn reports(&self) -> Vec<String> {
        self.reports.lock().unwrap().clone()
    }
}

impl ErrorReporter for RecordingReporter {
    fn report(&self, context: &str, error: &Error) {
        self.reports.lock().unwrap().push(format!("{context}: {error}"));
    }
}

/// A cache wired to fakes, with handles to inspect them
pub struct Harness {
    pub cache: AudioAssetCache,
    pub fetcher: Arc<FakeFetcher>,
    pub player: Arc<RecordingPlayer>,
    pub reporter: Arc<RecordingReporter>,
}

impl Harness {
    pub fn new(theme: &str) -> Self {
        Self::with(FakeFetcher::default(), RecordingPlayer::default(), theme)
    }

    pub fn with(fetcher: FakeFetcher, player: RecordingPlayer, theme: &str) -> Self {
        let fetcher = Arc::new(fetcher);
        let player = Arc::new(player);
        let reporter = Arc::new(RecordingReporter::default());

        let cache = AudioAssetCache::new(
            Arc::clone(&fetcher) as Arc<dyn SoundFetcher>,
            Arc::clone(&player) as Arc<dyn SoundPlayer>,
            Arc::clone(&reporter) as Arc<dyn ErrorReporter>,
        )
        .expect("test runs inside a tokio runtime");
        cache.set_theme(theme.parse().expect("valid theme"));

        Self {
            cache,
            fetcher,
            player,
            reporter,
        }
    }
}

/// 10ms of silence at 8kHz
pub fn short_clip() -> Pcm {
    Pcm {
        samples: vec![0.0; 80],
        sample_rate: 8_000,
    }
}

/// Encode mono samples as 16-bit WAV
pub fn wav_bytes(samples: &[f32], sample_rate: u32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for &sample in samples {
            #[allow(clippy::cast_possible_truncation)]
            let sample_i16 = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer.write_sample(sample_i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}
