pub mod backoff;
pub mod transport;

pub use backoff::Backoff;
pub use transport::{CompletionTx, TrackOutcome, TransportError, TransportFactory, VoiceTransport};

use serde::Serialize;

/// Lifecycle of the player's voice link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum VoiceLinkState {
    Disconnected,
    Connecting,
    Connected,
}
