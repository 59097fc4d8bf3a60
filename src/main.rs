use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use habit_chime::playback::tone;
use habit_chime::reward::should_display;
use habit_chime::{
    AudioAssetCache, AudioPlayback, Config, HttpSoundLoader, PlayOutcome, RewardSummary,
    SoundEvent, SoundFile, SoundPlayer, SoundTheme, TaskScoringResult, TracingReporter,
};

/// chime - sound cues and reward summaries for habit tracking
#[derive(Parser)]
#[command(name = "chime", version, about)]
struct Cli {
    /// Sound theme to use; "off" disables sound
    #[arg(short, long, env = "CHIME_SOUND_THEME")]
    theme: Option<SoundTheme>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Play the cue for an event (e.g. "level-up")
    Play {
        /// Event name
        event: SoundEvent,
    },
    /// Download and decode every cue of the active theme
    Preload,
    /// List known events
    Events,
    /// Summarize a task scoring result stored as JSON
    Result {
        /// Path to the JSON file
        path: PathBuf,
    },
    /// Test speaker output
    TestSpeaker,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn,habit_chime=info",
        1 => "info,habit_chime=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load()?;
    if let Some(theme) = cli.theme {
        config.sound.theme = theme;
    }
    tracing::debug!(?config, "loaded configuration");

    match cli.command {
        Command::Play { event } => cmd_play(&config, event).await,
        Command::Preload => cmd_preload(&config).await,
        Command::Events => {
            cmd_events();
            Ok(())
        }
        Command::Result { path } => cmd_result(&config, &path),
        Command::TestSpeaker => test_speaker(),
    }
}

/// Player for commands that only fill the cache
struct Mute;

impl SoundPlayer for Mute {
    fn play(&self, _sound: &SoundFile) -> habit_chime::Result<()> {
        Ok(())
    }
}

fn build_cache(
    config: &Config,
    player: Arc<dyn SoundPlayer>,
) -> anyhow::Result<(AudioAssetCache, Arc<HttpSoundLoader>)> {
    let loader = Arc::new(HttpSoundLoader::new(
        &config.sound.asset_base_url,
        config.sound.cache_dir.clone(),
        config.sound.fetch_timeout,
    )?);

    let cache = AudioAssetCache::new(Arc::<HttpSoundLoader>::clone(&loader), player, Arc::new(TracingReporter))?;
    cache.set_theme(config.sound.theme.clone());
    Ok((cache, loader))
}

/// Play one cue and wait for it to finish
async fn cmd_play(config: &Config, event: SoundEvent) -> anyhow::Result<()> {
    if config.sound.theme.is_off() {
        println!("Sound theme is off; nothing to play.");
        return Ok(());
    }

    let (cache, _) = build_cache(config, Arc::new(AudioPlayback::new()?))?;
    match cache.play(event) {
        PlayOutcome::Disabled => return Ok(()),
        outcome => outcome.wait().await,
    }

    let Some(file) = cache.get(event) else {
        anyhow::bail!("could not load {event} for theme {}", config.sound.theme);
    };

    println!("Playing {event} ({}, {:.2}s)", file.theme(), file.duration().as_secs_f64());
    tokio::time::sleep(file.duration() + Duration::from_millis(300)).await;
    Ok(())
}

/// Fetch every cue of the active theme into the on-disk cache
async fn cmd_preload(config: &Config) -> anyhow::Result<()> {
    let (cache, loader) = build_cache(config, Arc::new(Mute))?;

    let Some(handle) = cache.preload_all(&SoundEvent::ALL) else {
        println!("Sound theme is off; nothing to preload.");
        return Ok(());
    };
    handle.await?;

    let loaded = cache.cached_events();
    for event in SoundEvent::ALL {
        let status = if loaded.contains(&event) { "ok" } else { "FAILED" };
        println!(
            "{status:>6}  {event:<22} {}",
            loader.path_for(&config.sound.theme, event).display()
        );
    }
    println!("\n{}/{} cues loaded", loaded.len(), SoundEvent::ALL.len());

    Ok(())
}

fn cmd_events() {
    for event in SoundEvent::ALL {
        println!("{event}");
    }
}

/// Print the reward summary for a scoring result
fn cmd_result(config: &Config, path: &std::path::Path) -> anyhow::Result<()> {
    if !should_display(&config.display) {
        tracing::info!("task results hidden by preference");
        return Ok(());
    }

    let result = TaskScoringResult::from_json_file(path)?;
    let summary = RewardSummary::from_result(&result);

    if summary.is_empty() {
        println!("No rewards.");
        return Ok(());
    }

    for chip in &summary.chips {
        println!("  {chip}");
    }
    if let Some(caption) = &summary.drop_caption {
        println!("  You found {caption}!");
    }

    Ok(())
}

/// Test speaker output with a sine wave
fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let playback = AudioPlayback::new()?;
    let samples = tone(440.0, Duration::from_secs(2), 0.3);
    playback.play_samples(&samples)?;

    println!("If you heard the tone, your speakers are working!");
    Ok(())
}
