//! In-memory collaborators for driving a player without Discord or YouTube.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{Notify, mpsc};

use crate::{
    cache::InMemoryMetadataCache,
    common::types::{ChannelId, GuildId, UserId},
    configs::PlayerConfig,
    events::{EventKind, EventManager, PlayerEvent},
    player::{MusicPlayer, PlayerServices},
    song::StreamSource,
    sources::{MetadataResolver, ResolveError, VideoMetadata},
    voice::{CompletionTx, TransportError, TransportFactory, VoiceTransport},
};

pub(crate) const BOT: UserId = UserId(1);
pub(crate) const CHANNEL: ChannelId = ChannelId(100);

/// Canonical watch URL for a short test name, padded to an 11 character id.
pub(crate) fn video_url(name: &str) -> String {
    format!("https://www.youtube.com/watch?v={:_<11}", name)
}

pub(crate) fn video(name: &str) -> VideoMetadata {
    VideoMetadata {
        url: video_url(name),
        title: name.to_string(),
        duration: 180,
        views: 1_000,
        thumbnail: None,
        channel: "test channel".to_string(),
        channel_url: None,
    }
}

#[derive(Default)]
pub(crate) struct MockTransport {
    connected: AtomicBool,
    paused: AtomicBool,
    connect_failures: AtomicU32,
    pub connect_calls: AtomicU32,
    pub stop_calls: AtomicU32,
    played: Mutex<Vec<String>>,
    completion: Mutex<Option<CompletionTx>>,
    members: Mutex<Vec<UserId>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Makes the next `n` connect calls fail.
    pub fn fail_next_connects(&self, n: u32) {
        self.connect_failures.store(n, Ordering::SeqCst);
    }

    /// Simulates the bot being kicked from voice.
    pub fn drop_link(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    pub fn set_members(&self, ids: &[u64]) {
        *self.members.lock() = ids.iter().copied().map(UserId).collect();
    }

    /// Lets the current track run out. Returns false if nothing was playing.
    pub fn finish_track(&self) -> bool {
        match self.completion.lock().take() {
            Some(tx) => tx.send(Ok(())).is_ok(),
            None => false,
        }
    }

    pub fn fail_track(&self, reason: &str) -> bool {
        match self.completion.lock().take() {
            Some(tx) => tx
                .send(Err(TransportError::Playback(reason.to_string())))
                .is_ok(),
            None => false,
        }
    }

    /// Takes the current completion without signalling it.
    pub fn take_completion(&self) -> Option<CompletionTx> {
        self.completion.lock().take()
    }

    pub fn played(&self) -> Vec<String> {
        self.played.lock().clone()
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
    }
}

#[async_trait]
impl VoiceTransport for MockTransport {
    async fn connect(&self, _channel: ChannelId) -> Result<(), TransportError> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .connect_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(TransportError::Connect("refused".to_string()));
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    async fn play(&self, stream_url: &str, on_complete: CompletionTx) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        self.played.lock().push(stream_url.to_string());
        self.paused.store(false, Ordering::SeqCst);
        *self.completion.lock() = Some(on_complete);
        Ok(())
    }

    fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    fn stop(&self) {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
        if let Some(tx) = self.completion.lock().take() {
            let _ = tx.send(Ok(()));
        }
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn channel_members(&self) -> Vec<UserId> {
        let mut members = self.members.lock().clone();
        if self.is_connected() {
            members.push(BOT);
        }
        members
    }
}

#[derive(Default)]
pub(crate) struct MockResolver {
    videos: Mutex<HashMap<String, VideoMetadata>>,
    playlists: Mutex<HashMap<String, Vec<String>>>,
    pub resolve_calls: AtomicUsize,
    pub stream_calls: AtomicUsize,
    fail_streams: AtomicBool,
    gated: AtomicBool,
    pub entered: Notify,
    pub release: Notify,
}

impl MockResolver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers `name` under both its URL and its title. Returns the URL.
    pub fn add_video(&self, name: &str) -> String {
        let metadata = video(name);
        let url = metadata.url.clone();
        let mut videos = self.videos.lock();
        videos.insert(url.clone(), metadata.clone());
        videos.insert(name.to_string(), metadata);
        url
    }

    pub fn add_playlist(&self, url: &str, entries: Vec<String>) {
        self.playlists.lock().insert(url.to_string(), entries);
    }

    pub fn fail_streams(&self, fail: bool) {
        self.fail_streams.store(fail, Ordering::SeqCst);
    }

    /// Holds every `resolve` call until `release` is notified.
    pub fn gate(&self) {
        self.gated.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl MetadataResolver for MockResolver {
    fn name(&self) -> &str {
        "mock"
    }

    async fn resolve(&self, query: &str) -> Result<Option<VideoMetadata>, ResolveError> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        if self.gated.load(Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
        Ok(self.videos.lock().get(query).cloned())
    }

    async fn resolve_playlist(&self, url: &str) -> Result<Vec<String>, ResolveError> {
        self.playlists
            .lock()
            .get(url)
            .cloned()
            .ok_or_else(|| ResolveError::InvalidPlaylist(url.to_string()))
    }

    async fn resolve_stream(&self, url: &str) -> Result<StreamSource, ResolveError> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_streams.load(Ordering::SeqCst) {
            return Err(ResolveError::backend("stream unavailable"));
        }
        Ok(StreamSource::new(format!("{}#stream", url), None))
    }
}

/// Hands out a fresh mock per guild and keeps them for inspection.
#[derive(Default)]
pub(crate) struct MockFactory {
    pub created: Mutex<HashMap<GuildId, Arc<MockTransport>>>,
}

impl TransportFactory for MockFactory {
    fn create(&self, guild_id: &GuildId) -> Arc<dyn VoiceTransport> {
        let transport = MockTransport::new();
        self.created
            .lock()
            .insert(guild_id.clone(), transport.clone());
        transport
    }
}

pub(crate) fn test_config() -> PlayerConfig {
    PlayerConfig {
        reconnect_attempts: 3,
        reconnect_delay_ms: 10,
    }
}

/// A player wired to mocks, plus handles on every collaborator.
pub(crate) struct Harness {
    pub player: Arc<MusicPlayer>,
    pub transport: Arc<MockTransport>,
    pub resolver: Arc<MockResolver>,
    pub cache: Arc<InMemoryMetadataCache>,
    pub events: EventManager,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: PlayerConfig) -> Self {
        let transport = MockTransport::new();
        let resolver = MockResolver::new();
        let cache = Arc::new(InMemoryMetadataCache::new(Duration::from_secs(3600)));
        let events = EventManager::new();
        let services = PlayerServices {
            resolver: resolver.clone(),
            cache: cache.clone(),
            events: events.clone(),
        };
        let player = MusicPlayer::new(
            GuildId::from("guild"),
            BOT,
            transport.clone(),
            services,
            config,
        );
        Self {
            player,
            transport,
            resolver,
            cache,
            events,
        }
    }

    pub async fn connected() -> Self {
        let harness = Self::new();
        harness.player.connect(CHANNEL).await.unwrap();
        harness
    }

    /// Collects every event of `kind` into a channel.
    pub fn record(&self, kind: EventKind) -> mpsc::UnboundedReceiver<Arc<PlayerEvent>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.events.subscribe_fn(kind, "recorder", move |event| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(event);
                Ok::<(), crate::common::types::AnyError>(())
            }
        });
        rx
    }

    /// Titles of the current queue, head first.
    pub fn titles(&self) -> Vec<String> {
        self.player
            .snapshot()
            .queue
            .into_iter()
            .map(|song| song.title)
            .collect()
    }

    pub fn active_title(&self) -> Option<String> {
        self.player.snapshot().now_playing.map(|song| song.title)
    }
}

/// Polls `cond` until it holds, failing the test after about a second.
pub(crate) async fn eventually(mut cond: impl FnMut() -> bool) {
    for _ in 0..100 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

/// Receives the next event, failing the test after a second.
pub(crate) async fn next_event(
    rx: &mut mpsc::UnboundedReceiver<Arc<PlayerEvent>>,
) -> Arc<PlayerEvent> {
    tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("event arrived in time")
        .expect("event channel open")
}
