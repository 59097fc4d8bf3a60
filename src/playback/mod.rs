//! Audio playback of decoded cues
//!
//! [`SoundPlayer`] is the seam the cache plays through. [`AudioPlayback`] is
//! the speaker backend.

mod resample;

pub use resample::resample;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, StreamConfig};

use crate::sound::SoundFile;
use crate::{Error, Result};

/// Output rate every cue is converted to before playback
pub const PLAYBACK_SAMPLE_RATE: u32 = 24000;

/// Produces audible output for a decoded cue
pub trait SoundPlayer: Send + Sync {
    /// Start playing `sound`; must not block until playback ends
    ///
    /// # Errors
    ///
    /// Returns error if playback cannot be started
    fn play(&self, sound: &SoundFile) -> Result<()>;
}

/// Plays cues on the default output device
#[derive(Debug, Clone)]
pub struct AudioPlayback {
    config: StreamConfig,
}

impl AudioPlayback {
    /// Create a new audio playback instance
    ///
    /// # Errors
    ///
    /// Returns error if audio device cannot be opened
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

        let supports = |channels: u16| {
            device.supported_output_configs().ok()?.find(|c| {
                c.channels() == channels
                    && c.min_sample_rate() <= SampleRate(PLAYBACK_SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(PLAYBACK_SAMPLE_RATE)
            })
        };

        let supported_config = supports(1)
            .or_else(|| supports(2))
            .ok_or_else(|| Error::Audio("no suitable output config found".to_string()))?;

        let config = supported_config
            .with_sample_rate(SampleRate(PLAYBACK_SAMPLE_RATE))
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = PLAYBACK_SAMPLE_RATE,
            channels = config.channels,
            "audio playback initialized"
        );

        Ok(Self { config })
    }

    /// Play a cue to completion on the current thread
    ///
    /// # Errors
    ///
    /// Returns error if resampling or playback fails
    pub fn play_blocking(&self, sound: &SoundFile) -> Result<()> {
        let samples = prepare(sound)?;
        play_samples_blocking(&self.config, &samples)
    }

    /// Play raw samples already at [`PLAYBACK_SAMPLE_RATE`]
    ///
    /// # Errors
    ///
    /// Returns error if playback fails
    pub fn play_samples(&self, samples: &[f32]) -> Result<()> {
        play_samples_blocking(&self.config, samples)
    }
}

impl SoundPlayer for AudioPlayback {
    fn play(&self, sound: &SoundFile) -> Result<()> {
        let samples = prepare(sound)?;
        let config = self.config.clone();
        let event = sound.event();

        std::thread::Builder::new()
            .name("chime-playback".to_string())
            .spawn(move || {
                if let Err(e) = play_samples_blocking(&config, &samples) {
                    tracing::error!(event = %event, error = %e, "sound playback failed");
                }
            })?;

        Ok(())
    }
}

/// Bring a cue to the playback rate
fn prepare(sound: &SoundFile) -> Result<Arc<[f32]>> {
    if sound.sample_rate() == PLAYBACK_SAMPLE_RATE {
        return Ok(sound.shared_samples());
    }
    Ok(resample(sound.samples(), sound.sample_rate(), PLAYBACK_SAMPLE_RATE)?.into())
}

/// Play samples and wait for the stream to drain
fn play_samples_blocking(config: &StreamConfig, samples: &[f32]) -> Result<()> {
    if samples.is_empty() {
        return Ok(());
    }

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| Error::Audio("no output device".to_string()))?;

    let channels = usize::from(config.channels);
    let shared: Arc<[f32]> = samples.into();
    let position = Arc::new(AtomicUsize::new(0));
    let finished = Arc::new(AtomicBool::new(false));

    let stream_samples = Arc::clone(&shared);
    let stream_position = Arc::clone(&position);
    let stream_finished = Arc::clone(&finished);

    let stream = device
        .build_output_stream(
            config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let mut pos = stream_position.load(Ordering::Relaxed);
                for frame in data.chunks_mut(channels) {
                    let sample = stream_samples.get(pos).copied().unwrap_or(0.0);
                    frame.fill(sample);
                    if pos < stream_samples.len() {
                        pos += 1;
                    }
                }
                stream_position.store(pos, Ordering::Relaxed);
                if pos >= stream_samples.len() {
                    stream_finished.store(true, Ordering::Release);
                }
            },
            |err| {
                tracing::error!(error = %err, "audio playback error");
            },
            None,
        )
        .map_err(|e| Error::Audio(e.to_string()))?;

    stream.play().map_err(|e| Error::Audio(e.to_string()))?;

    let duration_ms = (shared.len() as u64 * 1000) / u64::from(PLAYBACK_SAMPLE_RATE);
    let start = Instant::now();
    let timeout = Duration::from_millis(duration_ms + 500);

    while !finished.load(Ordering::Acquire) {
        if start.elapsed() > timeout {
            tracing::warn!("playback did not drain before timeout");
            break;
        }
        std::thread::sleep(Duration::from_millis(20));
    }

    // Let the device flush its last buffer
    std::thread::sleep(Duration::from_millis(100));

    drop(stream);
    tracing::debug!(samples = shared.len(), "playback complete");

    Ok(())
}

/// Sine tone at [`PLAYBACK_SAMPLE_RATE`], for speaker checks
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn tone(frequency: f32, duration: Duration, amplitude: f32) -> Vec<f32> {
    let rate = PLAYBACK_SAMPLE_RATE as f32;
    let count = (rate * duration.as_secs_f32()) as usize;
    (0..count)
        .map(|i| {
            let t = i as f32 / rate;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * amplitude
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tone_length_and_amplitude() {
        let samples = tone(440.0, Duration::from_millis(500), 0.3);
        assert_eq!(samples.len(), 12_000);
        assert!(samples.iter().all(|s| s.abs() <= 0.3 + f32::EPSILON));
        assert!(samples.iter().any(|s| s.abs() > 0.25));
    }

    #[test]
    fn test_prepare_skips_resampling_at_playback_rate() {
        use crate::sound::{Pcm, SoundEvent, SoundTheme};

        let file = SoundFile::new(
            SoundTheme::new("robot").unwrap(),
            SoundEvent::Chat,
            Pcm {
                samples: vec![0.1, 0.2, 0.3],
                sample_rate: PLAYBACK_SAMPLE_RATE,
            },
        );
        let prepared = prepare(&file).unwrap();
        assert_eq!(&*prepared, &[0.1, 0.2, 0.3]);
    }
}
