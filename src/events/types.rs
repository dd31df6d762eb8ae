use std::sync::Arc;

use crate::{
    common::types::{GuildId, UserId},
    song::Song,
};

/// Every event a player can emit. Listeners subscribe per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    TrackStart,
    QueueEnded,
    LoadingPlaylist,
    MemberJoinedVoice,
    MemberLeftVoice,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        Self::TrackStart,
        Self::QueueEnded,
        Self::LoadingPlaylist,
        Self::MemberJoinedVoice,
        Self::MemberLeftVoice,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::TrackStart => "track_start",
            Self::QueueEnded => "queue_ended",
            Self::LoadingPlaylist => "loading_playlist",
            Self::MemberJoinedVoice => "member_joined_voice",
            Self::MemberLeftVoice => "member_left_voice",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub enum PlayerEvent {
    /// A new song reached the transport. `previous` is `None` when playback
    /// starts from idle.
    TrackStart {
        guild_id: GuildId,
        previous: Option<Arc<Song>>,
        current: Arc<Song>,
        /// Non-bot members in the channel when the track started.
        listeners: Vec<UserId>,
    },
    QueueEnded {
        guild_id: GuildId,
    },
    /// Playlist progress: `None` once when enumeration finishes, then one
    /// event per queued entry.
    LoadingPlaylist {
        guild_id: GuildId,
        song: Option<Arc<Song>>,
    },
    MemberJoinedVoice {
        guild_id: GuildId,
        member: UserId,
        now_playing: Option<Arc<Song>>,
    },
    MemberLeftVoice {
        guild_id: GuildId,
        member: UserId,
    },
}

impl PlayerEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::TrackStart { .. } => EventKind::TrackStart,
            Self::QueueEnded { .. } => EventKind::QueueEnded,
            Self::LoadingPlaylist { .. } => EventKind::LoadingPlaylist,
            Self::MemberJoinedVoice { .. } => EventKind::MemberJoinedVoice,
            Self::MemberLeftVoice { .. } => EventKind::MemberLeftVoice,
        }
    }

    pub fn guild_id(&self) -> &GuildId {
        match self {
            Self::TrackStart { guild_id, .. }
            | Self::QueueEnded { guild_id }
            | Self::LoadingPlaylist { guild_id, .. }
            | Self::MemberJoinedVoice { guild_id, .. }
            | Self::MemberLeftVoice { guild_id, .. } => guild_id,
        }
    }
}
