pub mod stream;
pub mod timer;

pub use stream::StreamSource;
pub use timer::PlaybackTimer;

use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;

use crate::sources::{VideoMetadata, extract_video_id};

/// One queued track.
///
/// Metadata is fixed at creation. The timer and the resolved stream change
/// while the song is played, so a queue entry and the active slot share the
/// same `Arc<Song>`.
#[derive(Debug)]
pub struct Song {
    video_id: String,
    metadata: VideoMetadata,
    timer: Mutex<PlaybackTimer>,
    stream: Mutex<Option<StreamSource>>,
}

impl Song {
    pub fn new(metadata: VideoMetadata) -> Self {
        let video_id = extract_video_id(&metadata.url).unwrap_or_else(|| metadata.url.clone());
        Self::with_id(video_id, metadata)
    }

    pub fn with_id(video_id: impl Into<String>, metadata: VideoMetadata) -> Self {
        Self {
            video_id: video_id.into(),
            metadata,
            timer: Mutex::new(PlaybackTimer::new()),
            stream: Mutex::new(None),
        }
    }

    pub fn video_id(&self) -> &str {
        &self.video_id
    }

    pub fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    pub fn url(&self) -> &str {
        &self.metadata.url
    }

    pub fn title(&self) -> &str {
        &self.metadata.title
    }

    pub fn channel(&self) -> &str {
        &self.metadata.channel
    }

    pub fn thumbnail(&self) -> Option<&str> {
        self.metadata.thumbnail.as_deref()
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.metadata.duration)
    }

    pub fn start(&self) {
        self.timer.lock().start();
    }

    pub fn pause(&self) {
        self.timer.lock().pause();
    }

    pub fn resume(&self) {
        self.timer.lock().resume();
    }

    pub fn elapsed(&self) -> Duration {
        self.timer.lock().elapsed()
    }

    pub fn remaining(&self) -> Option<Duration> {
        self.timer.lock().remaining(self.duration())
    }

    pub fn is_running(&self) -> bool {
        self.timer.lock().is_running()
    }

    pub fn stream(&self) -> Option<StreamSource> {
        self.stream.lock().clone()
    }

    pub(crate) fn set_stream(&self, stream: StreamSource) {
        *self.stream.lock() = Some(stream);
    }

    pub fn info(&self) -> SongInfo {
        SongInfo {
            video_id: self.video_id.clone(),
            title: self.metadata.title.clone(),
            url: self.metadata.url.clone(),
            channel: self.metadata.channel.clone(),
            duration_ms: self.duration().as_millis() as u64,
            elapsed_ms: self.elapsed().as_millis() as u64,
        }
    }
}

/// Serializable view of a song for front-ends.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SongInfo {
    pub video_id: String,
    pub title: String,
    pub url: String,
    pub channel: String,
    pub duration_ms: u64,
    pub elapsed_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(url: &str) -> VideoMetadata {
        VideoMetadata {
            url: url.to_string(),
            title: "Never Gonna Give You Up".to_string(),
            duration: 212,
            views: 1_500_000_000,
            thumbnail: Some("https://i.ytimg.com/vi/dQw4w9WgXcQ/hqdefault.jpg".to_string()),
            channel: "Rick Astley".to_string(),
            channel_url: None,
        }
    }

    #[test]
    fn test_video_id_from_url() {
        let song = Song::new(metadata("https://www.youtube.com/watch?v=dQw4w9WgXcQ"));
        assert_eq!(song.video_id(), "dQw4w9WgXcQ");
        assert_eq!(song.duration(), Duration::from_secs(212));

        let other = Song::new(metadata("https://cdn.example.com/track.mp3"));
        assert_eq!(other.video_id(), "https://cdn.example.com/track.mp3");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_not_running_until_started() {
        let song = Song::new(metadata("https://youtu.be/dQw4w9WgXcQ"));
        assert!(!song.is_running());
        song.start();
        tokio::time::advance(Duration::from_secs(12)).await;
        song.pause();
        assert!(!song.is_running());
        assert_eq!(song.info().elapsed_ms, 12_000);
        assert_eq!(song.remaining(), Some(Duration::from_secs(200)));
    }
}
