use serde::{Deserialize, Serialize};

use crate::{common::types::GuildId, song::SongInfo, voice::VoiceLinkState};

/// What happens to the queue when a track ends or is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopMode {
    /// Finished entries are discarded.
    #[default]
    Off,
    /// The head replays until the mode changes.
    Single,
    /// Finished entries rotate to the tail.
    All,
}

/// Coarse playback state, derived from the link, the active slot and the pause flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PlayerStatus {
    Disconnected,
    Idle,
    Playing,
    Paused,
}

/// Why the transport's current track is ending, set before `stop()` is called.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EndReason {
    /// Ran to completion; advance one position.
    Finished,
    /// The queue was already moved by skip/previous; play the new head.
    Skipped,
    /// Stopped or cleared; do not continue.
    Stopped,
}

/// Read-only view of a player for front-ends.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    pub guild_id: GuildId,
    pub status: PlayerStatus,
    pub loop_mode: LoopMode,
    pub paused: bool,
    pub fetching: bool,
    pub link: VoiceLinkState,
    pub now_playing: Option<SongInfo>,
    pub queue: Vec<SongInfo>,
}
