use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, info};

use super::{EventHandler, PlayerEvent};
use crate::common::types::{AnyResult, UserId};

/// Logs every player event.
pub struct TraceListener;

#[async_trait]
impl EventHandler for TraceListener {
    fn name(&self) -> &str {
        "trace"
    }

    async fn handle(&self, event: Arc<PlayerEvent>) -> AnyResult<()> {
        match event.as_ref() {
            PlayerEvent::TrackStart {
                guild_id,
                previous,
                current,
                ..
            } => info!(
                "[{}] Now playing: {} [{}] (after: {})",
                guild_id,
                current.title(),
                current.url(),
                previous.as_ref().map(|s| s.title()).unwrap_or("nothing")
            ),
            PlayerEvent::QueueEnded { guild_id } => info!("[{}] Queue ended", guild_id),
            PlayerEvent::LoadingPlaylist { guild_id, song } => match song {
                Some(song) => debug!("[{}] Playlist entry queued: {}", guild_id, song.title()),
                None => debug!("[{}] Playlist enumerated", guild_id),
            },
            PlayerEvent::MemberJoinedVoice {
                guild_id, member, ..
            } => debug!("[{}] Member {} joined voice", guild_id, member),
            PlayerEvent::MemberLeftVoice { guild_id, member } => {
                debug!("[{}] Member {} left voice", guild_id, member)
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayEntry {
    pub video_id: String,
    pub title: String,
    pub played_at: SystemTime,
}

/// Keeps a per-member listening history.
///
/// A member is credited with a song when it starts while they are in the
/// channel, or when they join while it is playing.
pub struct ReplayRecorder {
    entries: DashMap<UserId, Vec<ReplayEntry>>,
    retention: Duration,
}

impl ReplayRecorder {
    pub fn new(retention: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            retention,
        }
    }

    pub fn from_config(config: &crate::configs::HistoryConfig) -> Self {
        Self::new(config.retention())
    }

    fn record(&self, member: UserId, video_id: &str, title: &str, played_at: SystemTime) {
        debug!("Adding replay entry for member {}", member);
        self.entries.entry(member).or_default().push(ReplayEntry {
            video_id: video_id.to_string(),
            title: title.to_string(),
            played_at,
        });
    }

    /// Entries for `member` played within `within` of now, oldest first.
    pub fn history(&self, member: UserId, within: Duration) -> Vec<ReplayEntry> {
        let Some(cutoff) = SystemTime::now().checked_sub(within) else {
            return self.entries.get(&member).map(|e| e.value().clone()).unwrap_or_default();
        };
        self.entries
            .get(&member)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|e| e.played_at >= cutoff)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Drops entries older than the retention window; returns how many.
    pub fn prune(&self) -> usize {
        let Some(cutoff) = SystemTime::now().checked_sub(self.retention) else {
            return 0;
        };
        let mut removed = 0;
        self.entries.retain(|_, entries| {
            let before = entries.len();
            entries.retain(|e| e.played_at >= cutoff);
            removed += before - entries.len();
            !entries.is_empty()
        });
        removed
    }
}

#[async_trait]
impl EventHandler for ReplayRecorder {
    fn name(&self) -> &str {
        "replay"
    }

    async fn handle(&self, event: Arc<PlayerEvent>) -> AnyResult<()> {
        let now = SystemTime::now();
        match event.as_ref() {
            PlayerEvent::TrackStart {
                current, listeners, ..
            } => {
                for member in listeners {
                    self.record(*member, current.video_id(), current.title(), now);
                }
            }
            PlayerEvent::MemberJoinedVoice {
                member,
                now_playing: Some(song),
                ..
            } => self.record(*member, song.video_id(), song.title(), now),
            _ => {}
        }
        Ok(())
    }
}
