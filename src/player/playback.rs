use std::{sync::Arc, time::Instant};

use tokio::sync::oneshot;
use tracing::{Instrument, debug, error, info, info_span, warn};

use super::{
    MusicPlayer, PlayerError,
    context::SessionState,
    guard::{FetchGuard, Preconditions},
    state::EndReason,
};
use crate::{
    events::PlayerEvent,
    log_with_severity,
    song::Song,
    sources::{
        ResolveError, VideoMetadata, extract_playlist_id, extract_video_id, is_playlist_url,
    },
    voice::TrackOutcome,
};

/// What a `queue` call added.
#[derive(Debug, Clone)]
pub enum QueueOutcome {
    Single(Arc<Song>),
    Playlist { url: String, songs: Vec<Arc<Song>> },
}

/// The song that was active before a skip and the new head of the queue.
#[derive(Debug, Clone)]
pub struct SkipOutcome {
    pub previous: Option<Arc<Song>>,
    pub next: Option<Arc<Song>>,
}

/// What `skip` and `previous` still have to do once the queue is repositioned.
enum Handover {
    /// The queue ran out under an active track.
    Ended,
    /// Stop the track of this generation; its completion plays the head.
    Interrupt(u64),
    Start,
    Idle,
}

impl MusicPlayer {
    /// Resolves `query` (URL, search text or playlist URL), appends the
    /// result and starts playback if the player is idle.
    pub async fn queue(&self, query: &str) -> Result<QueueOutcome, PlayerError> {
        self.check(Preconditions::connected().not_fetching()).await?;
        let _fetching = FetchGuard::claim(&self.fetching).ok_or(PlayerError::LoadingStream)?;

        let span = info_span!("queue", guild = %self.guild_id);
        async {
            let started = Instant::now();
            let evicted = self.services.cache.run_cleanup();
            if evicted > 0 {
                debug!("[{}] Evicted {} stale cache entries", self.guild_id, evicted);
            }

            let outcome = if is_playlist_url(query) {
                self.queue_playlist(query).await
            } else {
                self.queue_single(query).await.map(QueueOutcome::Single)
            };
            debug!("[{}] Queue request took {:?}", self.guild_id, started.elapsed());
            outcome
        }
        .instrument(span)
        .await
    }

    async fn queue_playlist(&self, url: &str) -> Result<QueueOutcome, PlayerError> {
        let entries = match self.services.resolver.resolve_playlist(url).await {
            Ok(entries) if entries.is_empty() => {
                return Err(PlayerError::InvalidPlaylist {
                    url: url.to_string(),
                    source: ResolveError::InvalidPlaylist(url.to_string()),
                });
            }
            Ok(entries) => entries,
            Err(source) => {
                warn!("[{}] Failed to enumerate playlist {}: {}", self.guild_id, url, source);
                return Err(PlayerError::InvalidPlaylist {
                    url: url.to_string(),
                    source,
                });
            }
        };
        info!(
            "[{}] Loading {} entries from playlist {}",
            self.guild_id,
            entries.len(),
            extract_playlist_id(url).unwrap_or_default()
        );
        self.fire(PlayerEvent::LoadingPlaylist {
            guild_id: self.guild_id.clone(),
            song: None,
        });

        let mut songs = Vec::with_capacity(entries.len());
        for entry in &entries {
            match self.queue_single(entry).await {
                Ok(song) => {
                    self.fire(PlayerEvent::LoadingPlaylist {
                        guild_id: self.guild_id.clone(),
                        song: Some(song.clone()),
                    });
                    songs.push(song);
                }
                Err(PlayerError::NoResult(_)) => {
                    warn!("[{}] Skipping unavailable playlist entry {}", self.guild_id, entry);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(QueueOutcome::Playlist {
            url: url.to_string(),
            songs,
        })
    }

    pub(super) async fn queue_single(&self, query: &str) -> Result<Arc<Song>, PlayerError> {
        let metadata = self.lookup(query).await?;
        let song = Arc::new(Song::new(metadata));

        let should_start = {
            let mut state = self.state.lock();
            state.queue.push(song.clone());
            !state.paused && state.active.is_none()
        };
        info!("[{}] Added {} [{}]", self.guild_id, song.title(), song.url());

        if should_start {
            self.play_head(None).await?;
        }
        Ok(song)
    }

    /// Cache first, then the resolver. Resolver results are written back.
    async fn lookup(&self, query: &str) -> Result<VideoMetadata, PlayerError> {
        if let Some(id) = extract_video_id(query) {
            if let Some(hit) = self.services.cache.get(&id) {
                debug!("[{}] Cache hit for {}", self.guild_id, id);
                return Ok(hit);
            }
        }

        let metadata = match self.services.resolver.resolve(query).await {
            Ok(Some(metadata)) => metadata,
            Ok(None) | Err(ResolveError::NotFound(_)) => {
                return Err(PlayerError::NoResult(query.to_string()));
            }
            Err(e) => {
                warn!(
                    "[{}] Resolver {} failed for {}: {}",
                    self.guild_id,
                    self.services.resolver.name(),
                    query,
                    e
                );
                return Err(PlayerError::NoResult(query.to_string()));
            }
        };

        let id = extract_video_id(&metadata.url).unwrap_or_else(|| metadata.url.clone());
        self.services.cache.put(&id, metadata.clone());
        Ok(metadata)
    }

    /// Starts the queue head unless something is already active. Returns the
    /// song that started, if any.
    pub(super) async fn play_head(
        &self,
        previous: Option<Arc<Song>>,
    ) -> Result<Option<Arc<Song>>, PlayerError> {
        let _play = self.play_lock.lock().await;

        let song = {
            let state = self.state.lock();
            if state.active.is_some() {
                return Ok(None);
            }
            match state.queue.head() {
                Some(head) => head.clone(),
                None => return Ok(None),
            }
        };

        let started = Instant::now();
        let stream = match self.services.resolver.resolve_stream(song.url()).await {
            Ok(stream) => stream,
            Err(source) => {
                error!("[{}] Stream lookup failed for {}: {}", self.guild_id, song.url(), source);
                return Err(PlayerError::Stream {
                    url: song.url().to_string(),
                    source,
                });
            }
        };
        if stream.is_expired() {
            warn!("[{}] Stream for {} is already expired", self.guild_id, song.video_id());
        } else if let Some(ttl) = stream.expires_in() {
            debug!("[{}] Stream for {} expires in {:?}", self.guild_id, song.video_id(), ttl);
        }

        let (tx, rx) = oneshot::channel();
        if let Err(e) = self.transport.play(&stream.url, tx).await {
            error!("[{}] Transport refused {}: {}", self.guild_id, song.title(), e);
            return Err(e.into());
        }
        song.set_stream(stream);

        let (generation, listeners) = {
            let mut state = self.state.lock();
            state.track_generation += 1;
            state.active = Some(song.clone());
            state.paused = false;
            state.pending_end = None;
            let mut listeners: Vec<_> = state.members.iter().copied().collect();
            listeners.sort_unstable();
            (state.track_generation, listeners)
        };
        song.start();
        self.watch_track(generation, rx);

        info!(
            "[{}] Playing {} (took {:?})",
            self.guild_id,
            song.title(),
            started.elapsed()
        );
        self.fire(PlayerEvent::TrackStart {
            guild_id: self.guild_id.clone(),
            previous,
            current: song.clone(),
            listeners,
        });
        Ok(Some(song))
    }

    /// Waits for the transport's completion signal, then continues the queue.
    fn watch_track(&self, generation: u64, rx: oneshot::Receiver<TrackOutcome>) {
        let player = self.me.clone();
        let handle = tokio::spawn(async move {
            let outcome = rx.await.unwrap_or(Ok(()));
            let Some(player) = player.upgrade() else {
                return;
            };
            if let Err(e) = player.on_track_end(generation, outcome).await {
                log_with_severity!(
                    e.severity(),
                    "[{}] Track end handling failed: {}",
                    player.guild_id,
                    e
                );
            }
        });
        // The previous watcher may be the task running this very call, so it
        // is detached rather than aborted.
        let _ = self.track_task.lock().replace(handle);
    }

    pub(super) async fn on_track_end(
        &self,
        generation: u64,
        outcome: TrackOutcome,
    ) -> Result<(), PlayerError> {
        let previous = {
            let mut state = self.state.lock();
            if state.track_generation != generation {
                debug!("[{}] Ignoring stale completion #{}", self.guild_id, generation);
                return Ok(());
            }

            let reason = state.pending_end.take().unwrap_or(EndReason::Finished);
            let previous = state.active.take();
            if let Some(song) = &previous {
                song.pause();
            }

            if let Err(e) = outcome {
                if reason != EndReason::Stopped {
                    return Err(e.into());
                }
            }

            match reason {
                EndReason::Stopped => return Ok(()),
                EndReason::Skipped => {}
                EndReason::Finished => {
                    let mode = state.loop_mode;
                    state.queue.advance(1, mode);
                }
            }

            if state.queue.is_empty() {
                None
            } else {
                Some(previous)
            }
        };

        match previous {
            Some(previous) => self.play_head(previous).await.map(|_| ()),
            None => {
                info!("[{}] Queue ended", self.guild_id);
                self.fire(PlayerEvent::QueueEnded {
                    guild_id: self.guild_id.clone(),
                });
                Ok(())
            }
        }
    }

    /// Moves `n` positions forward according to the loop mode and plays the
    /// new head.
    pub async fn skip(&self, n: usize) -> Result<SkipOutcome, PlayerError> {
        self.check(Preconditions::connected().with_queue()).await?;

        let n = n.max(1);
        let (outcome, handover) = {
            let mut state = self.state.lock();
            let mode = state.loop_mode;
            state.queue.advance(n, mode);
            Self::prepare_handover(&mut state)
        };
        debug!("[{}] Skipping {} position(s)", self.guild_id, n);
        self.hand_over(outcome, handover).await
    }

    /// Rotates `n` entries from the tail back to the front and plays the new
    /// head. Works in every loop mode.
    pub async fn previous(&self, n: usize) -> Result<SkipOutcome, PlayerError> {
        self.check(Preconditions::connected().with_queue()).await?;

        let n = n.max(1);
        let (outcome, handover) = {
            let mut state = self.state.lock();
            state.queue.rotate_back(n);
            Self::prepare_handover(&mut state)
        };
        debug!("[{}] Going back {} position(s)", self.guild_id, n);
        self.hand_over(outcome, handover).await
    }

    /// Marks how the active track ends. Runs under the same lock that
    /// repositioned the queue.
    fn prepare_handover(state: &mut SessionState) -> (SkipOutcome, Handover) {
        let previous = state.active.clone();
        let next = state.queue.head().cloned();
        let handover = match (&previous, &next) {
            (Some(current), None) => {
                current.pause();
                state.active = None;
                state.paused = false;
                state.pending_end = Some(EndReason::Stopped);
                Handover::Ended
            }
            (Some(_), Some(_)) => {
                state.pending_end = Some(EndReason::Skipped);
                Handover::Interrupt(state.track_generation)
            }
            (None, Some(_)) => Handover::Start,
            (None, None) => Handover::Idle,
        };
        (SkipOutcome { previous, next }, handover)
    }

    /// Hands over to the already repositioned queue head. An interrupted
    /// track's completion starts the head; otherwise it starts here.
    async fn hand_over(
        &self,
        outcome: SkipOutcome,
        handover: Handover,
    ) -> Result<SkipOutcome, PlayerError> {
        match handover {
            Handover::Ended => {
                self.transport.stop();
                info!("[{}] Queue ended", self.guild_id);
                self.fire(PlayerEvent::QueueEnded {
                    guild_id: self.guild_id.clone(),
                });
            }
            Handover::Interrupt(generation) => {
                let state = self.state.lock();
                if state.track_generation == generation {
                    self.transport.stop();
                } else {
                    debug!(
                        "[{}] Track #{} already ended, not stopping its successor",
                        self.guild_id, generation
                    );
                }
            }
            Handover::Start => {
                self.play_head(None).await?;
            }
            Handover::Idle => {
                self.fire(PlayerEvent::QueueEnded {
                    guild_id: self.guild_id.clone(),
                });
            }
        }
        Ok(outcome)
    }

    pub(super) fn fire(&self, event: PlayerEvent) {
        self.services.events.fire(event);
    }
}
