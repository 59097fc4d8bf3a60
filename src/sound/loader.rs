//! HTTP sound loader with an on-disk copy of every downloaded cue

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};

use super::{SoundEvent, SoundFetcher, SoundFile, SoundTheme, decode};
use crate::{Error, Result};

/// Public asset pack location
pub const DEFAULT_ASSET_BASE_URL: &str =
    "https://s3.amazonaws.com/habitica-assets/mobileApp/sounds";

/// Downloads cues as `{base}/{theme}/{stem}.mp3` and keeps them under `cache_dir`
#[derive(Debug, Clone)]
pub struct HttpSoundLoader {
    client: Client,
    base_url: Url,
    cache_dir: PathBuf,
}

impl HttpSoundLoader {
    /// Create a new loader
    ///
    /// # Errors
    ///
    /// Returns error if `base_url` is not a usable base URL or the HTTP
    /// client cannot be built
    pub fn new(base_url: &str, cache_dir: PathBuf, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("invalid asset base URL {base_url:?}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config(format!("{base_url} cannot be used as a base URL")));
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("habit-chime/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url,
            cache_dir,
        })
    }

    /// Remote location of a cue; the theme is percent-encoded as one segment
    #[must_use]
    pub fn url_for(&self, theme: &SoundTheme, event: SoundEvent) -> Url {
        let mut url = self.base_url.clone();
        // Checked in `new`
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .push(theme.as_str())
                .push(&format!("{}.mp3", event.file_stem()));
        }
        url
    }

    /// Local location of a cue
    #[must_use]
    pub fn path_for(&self, theme: &SoundTheme, event: SoundEvent) -> PathBuf {
        self.cache_dir
            .join(theme.as_str())
            .join(format!("{}.mp3", event.file_stem()))
    }

    /// Download a cue to `path`, writing through a temporary file
    async fn download(&self, url: Url, path: &Path) -> Result<Vec<u8>> {
        tracing::debug!(url = %url, "downloading sound file");

        let response = self.client.get(url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(Error::Fetch(format!("{url}: HTTP {}", response.status())));
        }
        let bytes = response.bytes().await?.to_vec();

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let partial = path.with_extension("mp3.part");
        tokio::fs::write(&partial, &bytes).await?;
        tokio::fs::rename(&partial, path).await?;

        tracing::debug!(path = %path.display(), bytes = bytes.len(), "sound file stored");
        Ok(bytes)
    }
}

#[async_trait]
impl SoundFetcher for HttpSoundLoader {
    async fn fetch(&self, theme: &SoundTheme, event: SoundEvent) -> Result<SoundFile> {
        if theme.is_off() {
            return Err(Error::Fetch("sound theme is off".to_string()));
        }

        let path = self.path_for(theme, event);
        let from_disk = tokio::fs::try_exists(&path).await.unwrap_or(false);
        let bytes = if from_disk {
            tokio::fs::read(&path).await?
        } else {
            self.download(self.url_for(theme, event), &path).await?
        };

        let decoded = tokio::task::spawn_blocking(move || decode(&bytes))
            .await
            .map_err(|e| Error::Runtime(format!("decode task failed: {e}")))?;

        let pcm = match decoded {
            Ok(pcm) => pcm,
            Err(e) => {
                // Drop the bad copy so the next attempt downloads it again
                if let Err(remove_err) = tokio::fs::remove_file(&path).await {
                    tracing::debug!(path = %path.display(), error = %remove_err, "could not remove undecodable sound file");
                }
                return Err(e);
            }
        };

        tracing::debug!(
            theme = %theme,
            event = %event,
            from_disk,
            samples = pcm.samples.len(),
            "sound file loaded"
        );

        Ok(SoundFile::new(theme.clone(), event, pcm).with_path(path))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
