use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::common::types::{ChannelId, UserId};

#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("voice link is not connected")]
    NotConnected,
    #[error("voice connect failed: {0}")]
    Connect(String),
    #[error("playback failed: {0}")]
    Playback(String),
    #[error("voice disconnect failed: {0}")]
    Disconnect(String),
}

/// How a track left the transport. `Err` carries a mid-stream failure.
pub type TrackOutcome = Result<(), TransportError>;

/// Signalled exactly once when the track stops for any reason, `stop()`
/// included. Dropping it unsent counts as a clean end.
pub type CompletionTx = oneshot::Sender<TrackOutcome>;

/// The live audio link for one guild.
///
/// The player owns exactly one transport and is the only caller.
#[async_trait]
pub trait VoiceTransport: Send + Sync {
    async fn connect(&self, channel: ChannelId) -> Result<(), TransportError>;

    fn is_connected(&self) -> bool;

    /// Observed pause state of the audio link; authoritative over any cached flag.
    fn is_paused(&self) -> bool;

    /// Starts streaming `stream_url`, replacing nothing: the caller guarantees
    /// the previous track already ended.
    async fn play(&self, stream_url: &str, on_complete: CompletionTx) -> Result<(), TransportError>;

    fn pause(&self);

    fn resume(&self);

    /// Ends the current track, which fires its completion.
    fn stop(&self);

    async fn disconnect(&self) -> Result<(), TransportError>;

    /// Everyone currently in the connected channel, the bot included.
    fn channel_members(&self) -> Vec<UserId>;
}

/// Creates a transport for a guild when its player is first requested.
pub trait TransportFactory: Send + Sync {
    fn create(&self, guild_id: &crate::common::types::GuildId) -> std::sync::Arc<dyn VoiceTransport>;
}
