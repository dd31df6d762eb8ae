use std::{
    collections::HashSet,
    sync::{
        Arc, Weak,
        atomic::{AtomicBool, Ordering},
    },
};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{
    PlayerError,
    guard::Preconditions,
    queue::SongQueue,
    state::{EndReason, LoopMode, PlayerSnapshot, PlayerStatus},
};
use crate::{
    cache::MetadataCache,
    common::types::{ChannelId, GuildId, UserId},
    configs::PlayerConfig,
    events::EventManager,
    song::Song,
    sources::MetadataResolver,
    voice::{VoiceLinkState, VoiceTransport},
};

/// Collaborators shared by every player of a registry.
#[derive(Clone)]
pub struct PlayerServices {
    pub resolver: Arc<dyn MetadataResolver>,
    pub cache: Arc<dyn MetadataCache>,
    pub events: EventManager,
}

/// Mutable session state. Only ever locked for short, non-async sections.
pub(super) struct SessionState {
    pub queue: SongQueue,
    /// The song currently handed to the transport.
    pub active: Option<Arc<Song>>,
    pub loop_mode: LoopMode,
    pub paused: bool,
    pub link: VoiceLinkState,
    pub channel: Option<ChannelId>,
    /// Last observed non-bot members of the voice channel.
    pub members: HashSet<UserId>,
    pub pending_end: Option<EndReason>,
    /// Bumped on every play; completions carrying an older value are ignored.
    pub track_generation: u64,
    /// False once the caller disconnected on purpose.
    pub voice_wanted: bool,
}

impl SessionState {
    fn new() -> Self {
        Self {
            queue: SongQueue::new(),
            active: None,
            loop_mode: LoopMode::Off,
            paused: false,
            link: VoiceLinkState::Disconnected,
            channel: None,
            members: HashSet::new(),
            pending_end: None,
            track_generation: 0,
            voice_wanted: false,
        }
    }
}

/// The playback session for one guild.
pub struct MusicPlayer {
    pub(super) guild_id: GuildId,
    pub(super) bot_id: UserId,
    pub(super) transport: Arc<dyn VoiceTransport>,
    pub(super) services: PlayerServices,
    pub(super) config: PlayerConfig,
    pub(super) state: Mutex<SessionState>,
    /// Serializes the "resolve stream, start transport, mark active" section.
    pub(super) play_lock: tokio::sync::Mutex<()>,
    pub(super) reconnect_lock: tokio::sync::Mutex<()>,
    pub(super) fetching: AtomicBool,
    pub(super) reconnect_cancel: Mutex<CancellationToken>,
    pub(super) track_task: Mutex<Option<tokio::task::JoinHandle<()>>>,
    pub(super) me: Weak<MusicPlayer>,
}

impl MusicPlayer {
    pub fn new(
        guild_id: GuildId,
        bot_id: UserId,
        transport: Arc<dyn VoiceTransport>,
        services: PlayerServices,
        config: PlayerConfig,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            guild_id,
            bot_id,
            transport,
            services,
            config,
            state: Mutex::new(SessionState::new()),
            play_lock: tokio::sync::Mutex::new(()),
            reconnect_lock: tokio::sync::Mutex::new(()),
            fetching: AtomicBool::new(false),
            reconnect_cancel: Mutex::new(CancellationToken::new()),
            track_task: Mutex::new(None),
            me: me.clone(),
        })
    }

    pub fn guild_id(&self) -> &GuildId {
        &self.guild_id
    }

    pub fn bot_id(&self) -> UserId {
        self.bot_id
    }

    pub fn events(&self) -> &EventManager {
        &self.services.events
    }

    pub fn loop_mode(&self) -> LoopMode {
        self.state.lock().loop_mode
    }

    pub fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    pub fn is_fetching(&self) -> bool {
        self.fetching.load(Ordering::Acquire)
    }

    pub fn link_state(&self) -> VoiceLinkState {
        self.state.lock().link
    }

    pub fn channel(&self) -> Option<ChannelId> {
        self.state.lock().channel
    }

    /// Last observed non-bot members, sorted.
    pub fn members(&self) -> Vec<UserId> {
        let mut members: Vec<UserId> = self.state.lock().members.iter().copied().collect();
        members.sort_unstable();
        members
    }

    pub fn status(&self) -> PlayerStatus {
        let connected = self.transport.is_connected();
        let state = self.state.lock();
        if !connected || state.link != VoiceLinkState::Connected {
            PlayerStatus::Disconnected
        } else if state.active.is_none() {
            PlayerStatus::Idle
        } else if state.paused {
            PlayerStatus::Paused
        } else {
            PlayerStatus::Playing
        }
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        let status = self.status();
        let fetching = self.is_fetching();
        let state = self.state.lock();
        PlayerSnapshot {
            guild_id: self.guild_id.clone(),
            status,
            loop_mode: state.loop_mode,
            paused: state.paused,
            fetching,
            link: state.link,
            now_playing: state.active.as_ref().map(|song| song.info()),
            queue: state.queue.iter().map(|song| song.info()).collect(),
        }
    }

    pub(super) fn is_link_usable(&self) -> bool {
        self.transport.is_connected() && self.state.lock().link == VoiceLinkState::Connected
    }

    /// Selecting the mode that is already active turns looping off.
    pub async fn change_loop_mode(&self, mode: LoopMode) -> Result<LoopMode, PlayerError> {
        self.check(Preconditions::connected()).await?;

        let mut state = self.state.lock();
        state.loop_mode = if state.loop_mode == mode {
            LoopMode::Off
        } else {
            mode
        };
        info!("[{}] Loop mode set to {:?}", self.guild_id, state.loop_mode);
        Ok(state.loop_mode)
    }

    pub async fn now_playing(&self) -> Result<Arc<Song>, PlayerError> {
        self.check(Preconditions::connected().with_now_playing())
            .await?;
        self.state
            .lock()
            .active
            .clone()
            .ok_or(PlayerError::NothingPlaying)
    }

    pub async fn current_queue(&self) -> Result<Vec<Arc<Song>>, PlayerError> {
        self.check(Preconditions::connected().with_queue()).await?;
        Ok(self.state.lock().queue.to_vec())
    }

    /// Shuffles upcoming entries. The head stays put while it is playing.
    pub async fn shuffle(&self) -> Result<Vec<Arc<Song>>, PlayerError> {
        self.check(Preconditions::connected().with_queue()).await?;

        let mut state = self.state.lock();
        let pinned = usize::from(state.active.is_some());
        state.queue.shuffle(pinned);
        debug!("[{}] Shuffled {} entries", self.guild_id, state.queue.len());
        Ok(state.queue.to_vec())
    }

    /// `0` removes the playing song by skipping it, `-1` clears everything,
    /// any other in-range index drops that entry.
    pub async fn remove(&self, index: isize) -> Result<Option<Arc<Song>>, PlayerError> {
        self.check(Preconditions::connected().with_queue()).await?;

        match index {
            0 => {
                let song = self.now_playing().await?;
                self.skip(1).await?;
                Ok(Some(song))
            }
            -1 => {
                self.halt();
                info!("[{}] Cleared the queue", self.guild_id);
                Ok(None)
            }
            i if i > 0 => {
                let removed = self.state.lock().queue.remove(i as usize);
                match removed {
                    Some(song) => {
                        debug!("[{}] Removed {} at {}", self.guild_id, song.title(), i);
                        Ok(Some(song))
                    }
                    None => Err(PlayerError::IndexOutOfRange(i)),
                }
            }
            i => Err(PlayerError::IndexOutOfRange(i)),
        }
    }

    pub async fn pause(&self, forced: bool) -> Result<Arc<Song>, PlayerError> {
        self.check(Preconditions::connected().with_queue().with_now_playing())
            .await?;

        let mut state = self.state.lock();
        let song = state.active.clone().ok_or(PlayerError::NothingPlaying)?;
        state.paused = self.sync_paused(&song, state.paused);
        if state.paused && !forced {
            return Err(PlayerError::AlreadyPaused);
        }

        self.transport.pause();
        song.pause();
        state.paused = true;
        info!("[{}] Paused {}", self.guild_id, song.title());
        Ok(song)
    }

    pub async fn resume(&self, forced: bool) -> Result<Arc<Song>, PlayerError> {
        self.check(Preconditions::connected().with_queue().with_now_playing())
            .await?;

        let mut state = self.state.lock();
        let song = state.active.clone().ok_or(PlayerError::NothingPlaying)?;
        state.paused = self.sync_paused(&song, state.paused);
        if !state.paused && !forced {
            return Err(PlayerError::NotPaused);
        }

        self.transport.resume();
        song.resume();
        state.paused = false;
        info!("[{}] Resumed {}", self.guild_id, song.title());
        Ok(song)
    }

    /// Reads the transport's pause flag and brings the song timer in line
    /// when it drifted from `cached`.
    fn sync_paused(&self, song: &Song, cached: bool) -> bool {
        let observed = self.transport.is_paused();
        if observed != cached {
            debug!("[{}] Transport pause state drifted to {}", self.guild_id, observed);
            if observed {
                song.pause();
            } else {
                song.resume();
            }
        }
        observed
    }

    /// Clears the queue and stops the transport. With `disconnect` the voice
    /// link is closed as well and no reconnect will be attempted.
    pub async fn stop(&self, disconnect: bool) -> Result<(), PlayerError> {
        self.check(Preconditions::connected()).await?;

        self.halt();
        if disconnect {
            self.release_voice();
            self.transport.disconnect().await?;
            info!("[{}] Left voice", self.guild_id);
        }
        Ok(())
    }

    /// Best-effort teardown, used when the player is being discarded.
    pub async fn cleanup(&self) {
        self.halt();
        self.release_voice();
        if let Some(task) = self.track_task.lock().take() {
            task.abort();
        }

        if self.transport.is_connected() {
            if let Err(e) = self.transport.disconnect().await {
                warn!("[{}] Disconnect during cleanup failed: {}", self.guild_id, e);
            }
        }
        debug!("[{}] Player cleaned up", self.guild_id);
    }

    /// Empties the queue and ends whatever the transport is playing without
    /// continuing.
    pub(super) fn halt(&self) {
        let was_playing = {
            let mut state = self.state.lock();
            state.queue.clear();
            state.paused = false;
            match state.active.take() {
                Some(song) => {
                    song.pause();
                    state.pending_end = Some(EndReason::Stopped);
                    true
                }
                None => false,
            }
        };
        if was_playing {
            self.transport.stop();
        }
    }

    /// Cancels pending reconnects and marks the link as intentionally down.
    fn release_voice(&self) {
        self.reconnect_cancel.lock().cancel();
        let mut state = self.state.lock();
        state.voice_wanted = false;
        state.link = VoiceLinkState::Disconnected;
        state.members.clear();
    }
}

impl Drop for MusicPlayer {
    fn drop(&mut self) {
        debug!("[{}] Dropping player", self.guild_id);
        self.reconnect_cancel.lock().cancel();
        if let Some(task) = self.track_task.lock().take() {
            task.abort();
        }
    }
}
