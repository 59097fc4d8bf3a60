//! HTTP sound loader tests against a local mock server

use std::sync::Arc;
use std::time::Duration;

use habit_chime::{
    AudioAssetCache, Error, ErrorReporter, HttpSoundLoader, SoundEvent, SoundFetcher,
    SoundPlayer, SoundTheme,
};

mod common;

use common::{RecordingPlayer, RecordingReporter, wav_bytes};

fn robot() -> SoundTheme {
    SoundTheme::new("robot").unwrap()
}

fn loader(server: &mockito::Server, dir: &tempfile::TempDir) -> HttpSoundLoader {
    HttpSoundLoader::new(&server.url(), dir.path().to_path_buf(), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_downloads_and_keeps_copy() {
    let mut server = mockito::Server::new_async().await;
    let body = wav_bytes(&[0.0, 0.5, -0.5, 0.25], 24_000);
    let mock = server
        .mock("GET", "/robot/Level_Up.mp3")
        .with_status(200)
        .with_header("content-type", "audio/mpeg")
        .with_body(&body)
        .expect(1)
        .create_async()
        .await;

    let dir = tempfile::TempDir::new().unwrap();
    let loader = loader(&server, &dir);

    let file = loader.fetch(&robot(), SoundEvent::LevelUp).await.unwrap();
    assert_eq!(file.event(), SoundEvent::LevelUp);
    assert_eq!(file.sample_rate(), 24_000);
    assert_eq!(file.samples().len(), 4);

    let stored = dir.path().join("robot").join("Level_Up.mp3");
    assert_eq!(file.path(), Some(stored.as_path()));
    assert_eq!(std::fs::read(&stored).unwrap(), body);
    assert!(!dir.path().join("robot").join("Level_Up.mp3.part").exists());

    mock.assert_async().await;
}

#[tokio::test]
async fn test_existing_copy_skips_network() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/robot/Daily.mp3")
        .with_status(200)
        .with_body(wav_bytes(&[0.1; 32], 16_000))
        .expect(1)
        .create_async()
        .await;

    let dir = tempfile::TempDir::new().unwrap();
    let loader = loader(&server, &dir);

    loader.fetch(&robot(), SoundEvent::Daily).await.unwrap();
    let again = loader.fetch(&robot(), SoundEvent::Daily).await.unwrap();
    assert_eq!(again.samples().len(), 32);

    mock.assert_async().await;
}

#[tokio::test]
async fn test_http_error_writes_nothing() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/robot/Chat.mp3")
        .with_status(404)
        .create_async()
        .await;

    let dir = tempfile::TempDir::new().unwrap();
    let loader = loader(&server, &dir);

    let result = loader.fetch(&robot(), SoundEvent::Chat).await;
    assert!(matches!(result, Err(Error::Fetch(_))));
    assert!(!dir.path().join("robot").join("Chat.mp3").exists());
}

#[tokio::test]
async fn test_undecodable_copy_is_removed() {
    let server = mockito::Server::new_async().await;
    let dir = tempfile::TempDir::new().unwrap();
    let loader = loader(&server, &dir);

    let path = loader.path_for(&robot(), SoundEvent::Todo);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, b"RIFF but not really a wav").unwrap();

    let result = loader.fetch(&robot(), SoundEvent::Todo).await;
    assert!(matches!(result, Err(Error::Decode(_))));
    assert!(!path.exists());
}

#[tokio::test]
async fn test_cache_over_http_loader() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/robot/Reward.mp3")
        .with_status(200)
        .with_body(wav_bytes(&[0.2; 64], 24_000))
        .expect(1)
        .create_async()
        .await;

    let dir = tempfile::TempDir::new().unwrap();
    let loader: Arc<dyn SoundFetcher> = Arc::new(loader(&server, &dir));
    let player = Arc::new(RecordingPlayer::default());
    let reporter = Arc::new(RecordingReporter::default());

    let cache = AudioAssetCache::new(
        loader,
        Arc::clone(&player) as Arc<dyn SoundPlayer>,
        Arc::clone(&reporter) as Arc<dyn ErrorReporter>,
    )
    .unwrap();
    cache.set_theme(robot());

    cache.play(SoundEvent::Reward).wait().await;
    assert!(cache.play(SoundEvent::Reward).is_hit());

    assert_eq!(player.played(), vec![SoundEvent::Reward, SoundEvent::Reward]);
    assert!(reporter.reports().is_empty());
    mock.assert_async().await;
}
