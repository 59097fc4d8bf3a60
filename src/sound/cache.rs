//! Keyed cache of decoded sound cues with lazy fetch-and-play
//!
//! The cache holds at most one [`SoundFile`] per [`SoundEvent`], all for the
//! active theme. A cache hit plays immediately on the caller's thread; a miss
//! spawns one fetch on the runtime the cache was created in and plays the cue
//! once it lands.
//!
//! Every reset (theme switch, preload, shutdown) bumps a generation counter.
//! A fetch carries the generation it was issued under, and its result is
//! dropped if the counter moved on in the meantime, so entries from two themes
//! never coexist. A fetch that never yields a result, such as one whose
//! fetcher panicked, releases its in-flight mark when it is dropped.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;
use tokio::task::{AbortHandle, JoinHandle};

use super::{SoundEvent, SoundFetcher, SoundFile, SoundTheme};
use crate::playback::SoundPlayer;
use crate::report::ErrorReporter;
use crate::{Error, Result};

/// What [`AudioAssetCache::play`] did with a request
#[derive(Debug)]
pub enum PlayOutcome {
    /// Theme is off; nothing happened
    Disabled,
    /// Cue was resident and has been handed to the player
    Hit,
    /// Cue was missing; a fetch was started and will play on success
    Fetching(JoinHandle<()>),
    /// A fetch for this cue is already in flight; it will play when it lands
    Pending,
}

impl PlayOutcome {
    #[must_use]
    pub const fn is_hit(&self) -> bool {
        matches!(self, Self::Hit)
    }

    #[must_use]
    pub const fn is_disabled(&self) -> bool {
        matches!(self, Self::Disabled)
    }

    #[must_use]
    pub const fn is_fetching(&self) -> bool {
        matches!(self, Self::Fetching(_))
    }

    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Wait for the fetch started by this request, if any
    pub async fn wait(self) {
        if let Self::Fetching(handle) = self {
            await_task(handle).await;
        }
    }
}

async fn await_task(handle: JoinHandle<()>) {
    if let Err(e) = handle.await {
        if e.is_panic() {
            tracing::error!(error = %e, "sound fetch task panicked");
        }
    }
}

#[derive(Debug, Default)]
struct State {
    theme: SoundTheme,
    loaded: HashMap<SoundEvent, SoundFile>,
    /// Events with a fetch in flight, and whether to play on arrival
    in_flight: HashMap<SoundEvent, bool>,
    generation: u64,
    tasks: Vec<AbortHandle>,
}

impl State {
    /// Drop every entry and orphan every outstanding fetch
    fn invalidate(&mut self) {
        self.loaded.clear();
        self.in_flight.clear();
        self.generation = self.generation.wrapping_add(1);
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }

    fn track(&mut self, task: AbortHandle) {
        self.tasks.retain(|t| !t.is_finished());
        self.tasks.push(task);
    }
}

/// One outstanding fetch, issued under `generation`
///
/// Dropping it before it finishes (a panicking fetcher, a runtime going away)
/// clears the event's in-flight mark so a later play retries.
struct Fetch {
    inner: Arc<Inner>,
    theme: SoundTheme,
    event: SoundEvent,
    generation: u64,
    finished: bool,
}

impl Fetch {
    async fn run(mut self) {
        let result = self.inner.fetcher.fetch(&self.theme, self.event).await;
        self.finished = true;
        self.inner.complete(self.generation, self.event, result);
    }
}

impl Drop for Fetch {
    fn drop(&mut self) {
        if self.finished {
            return;
        }

        {
            let mut state = self.inner.lock();
            if state.generation != self.generation {
                return;
            }
            if state.in_flight.remove(&self.event).is_none() {
                return;
            }
        }

        let error = Error::Fetch(format!(
            "{}/{}: fetch ended without a result",
            self.theme, self.event
        ));
        self.inner.reporter.report("sound fetch", &error);
    }
}

struct Inner {
    fetcher: Arc<dyn SoundFetcher>,
    player: Arc<dyn SoundPlayer>,
    reporter: Arc<dyn ErrorReporter>,
    state: Mutex<State>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin_fetch(self: &Arc<Self>, state: &State, event: SoundEvent) -> Fetch {
        Fetch {
            inner: Arc::clone(self),
            theme: state.theme.clone(),
            event,
            generation: state.generation,
            finished: false,
        }
    }

    /// Apply a finished fetch issued under `generation`
    fn complete(&self, generation: u64, event: SoundEvent, result: Result<SoundFile>) {
        let file = match result {
            Ok(file) => file,
            Err(e) => {
                {
                    let mut state = self.lock();
                    if state.generation == generation {
                        state.in_flight.remove(&event);
                    }
                }
                self.reporter.report("sound fetch", &e);
                return;
            }
        };

        let play_now = {
            let mut state = self.lock();
            if state.generation != generation {
                tracing::debug!(event = %event, "discarding sound fetched before cache reset");
                return;
            }
            let play_now = state.in_flight.remove(&event).unwrap_or(false);
            state.loaded.insert(event, file.clone());
            play_now
        };

        tracing::debug!(event = %event, theme = %file.theme(), "sound cached");

        if play_now {
            self.play_file(&file);
        }
    }

    fn play_file(&self, file: &SoundFile) {
        if let Err(e) = self.player.play(file) {
            self.reporter.report("sound playback", &e);
        }
    }
}

/// Per-session cache of sound cues for the active theme
///
/// Dropping the cache aborts outstanding fetches.
pub struct AudioAssetCache {
    inner: Arc<Inner>,
    runtime: Handle,
}

impl AudioAssetCache {
    /// Create an empty cache with the theme off, bound to the current runtime
    ///
    /// # Errors
    ///
    /// Returns error if called outside a tokio runtime
    pub fn new(
        fetcher: Arc<dyn SoundFetcher>,
        player: Arc<dyn SoundPlayer>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| Error::Runtime(e.to_string()))?;
        Ok(Self::with_runtime(runtime, fetcher, player, reporter))
    }

    /// Create an empty cache whose fetches run on `runtime`
    #[must_use]
    pub fn with_runtime(
        runtime: Handle,
        fetcher: Arc<dyn SoundFetcher>,
        player: Arc<dyn SoundPlayer>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        tracing::debug!(fetcher = fetcher.name(), "audio asset cache created");
        Self {
            inner: Arc::new(Inner {
                fetcher,
                player,
                reporter,
                state: Mutex::new(State::default()),
            }),
            runtime,
        }
    }

    /// Active theme
    #[must_use]
    pub fn theme(&self) -> SoundTheme {
        self.inner.lock().theme.clone()
    }

    /// Switch the active theme
    ///
    /// Switching to a different theme drops resident cues and orphans
    /// in-flight fetches; nothing is fetched until the next preload or play.
    pub fn set_theme(&self, theme: SoundTheme) {
        let mut state = self.inner.lock();
        if state.theme == theme {
            return;
        }
        tracing::info!(from = %state.theme, to = %theme, "sound theme changed");
        state.theme = theme;
        state.invalidate();
    }

    /// Clear the cache and fetch every event in `known_events` in the background
    ///
    /// Returns `None` when the theme is off. Failures go to the error reporter
    /// and do not stop the remaining fetches. Cues a caller is already waiting
    /// on are fetched again as part of the batch and still play on arrival.
    pub fn preload_all(&self, known_events: &[SoundEvent]) -> Option<JoinHandle<()>> {
        let mut state = self.inner.lock();
        let waiting: Vec<SoundEvent> = state
            .in_flight
            .iter()
            .filter_map(|(&event, &play)| play.then_some(event))
            .collect();
        state.invalidate();

        if state.theme.is_off() {
            return None;
        }

        let mut seen = HashSet::new();
        let events: Vec<SoundEvent> = known_events
            .iter()
            .chain(&waiting)
            .copied()
            .filter(|event| seen.insert(*event))
            .collect();
        for &event in &events {
            state.in_flight.insert(event, waiting.contains(&event));
        }

        tracing::info!(theme = %state.theme, count = events.len(), "preloading sounds");

        let fetches: Vec<Fetch> = events
            .into_iter()
            .map(|event| self.inner.begin_fetch(&state, event))
            .collect();
        // A fetch dropped on spawn takes the lock
        drop(state);

        let handle = self.runtime.spawn(async move {
            futures::future::join_all(fetches.into_iter().map(Fetch::run)).await;
        });
        self.inner.lock().track(handle.abort_handle());

        Some(handle)
    }

    /// Play the cue for `event`, fetching it first if it is not resident
    pub fn play(&self, event: SoundEvent) -> PlayOutcome {
        let mut state = self.inner.lock();

        if state.theme.is_off() {
            return PlayOutcome::Disabled;
        }

        if let Some(file) = state.loaded.get(&event).cloned() {
            drop(state);
            tracing::debug!(event = %event, "sound cache hit");
            self.inner.play_file(&file);
            return PlayOutcome::Hit;
        }

        if let Some(play_on_arrival) = state.in_flight.get_mut(&event) {
            *play_on_arrival = true;
            tracing::debug!(event = %event, "sound fetch already in flight");
            return PlayOutcome::Pending;
        }

        state.in_flight.insert(event, true);
        tracing::debug!(event = %event, theme = %state.theme, "sound cache miss");

        let fetch = self.inner.begin_fetch(&state, event);
        drop(state);

        let handle = self.runtime.spawn(fetch.run());
        self.inner.lock().track(handle.abort_handle());

        PlayOutcome::Fetching(handle)
    }

    /// Whether the cue for `event` is resident
    #[must_use]
    pub fn is_cached(&self, event: SoundEvent) -> bool {
        self.inner.lock().loaded.contains_key(&event)
    }

    /// Whether a fetch for `event` is in flight
    #[must_use]
    pub fn is_fetching(&self, event: SoundEvent) -> bool {
        self.inner.lock().in_flight.contains_key(&event)
    }

    /// Resident events, sorted
    #[must_use]
    pub fn cached_events(&self) -> Vec<SoundEvent> {
        let mut events: Vec<_> = self.inner.lock().loaded.keys().copied().collect();
        events.sort_unstable();
        events
    }

    /// Resident cue for `event`
    #[must_use]
    pub fn get(&self, event: SoundEvent) -> Option<SoundFile> {
        self.inner.lock().loaded.get(&event).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().loaded.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().loaded.is_empty()
    }

    /// Abort outstanding fetches and drop every resident cue
    pub fn shutdown(&self) {
        self.inner.lock().invalidate();
    }
}

impl Drop for AudioAssetCache {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for AudioAssetCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("AudioAssetCache")
            .field("theme", &state.theme)
            .field("loaded", &state.loaded.len())
            .field("in_flight", &state.in_flight.len())
            .finish_non_exhaustive()
    }
}
