use crate::{
    common::{Severity, types::ChannelId},
    sources::ResolveError,
    voice::TransportError,
};

#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
    #[error("not connected to a voice channel")]
    NotConnected,
    #[error("nothing is playing")]
    NothingPlaying,
    #[error("the queue is empty")]
    EmptyQueue,
    #[error("playback is already paused")]
    AlreadyPaused,
    #[error("playback is not paused")]
    NotPaused,
    /// A `queue` request is already resolving for this guild.
    #[error("already loading a stream, please slow down")]
    LoadingStream,
    #[error("no results for `{0}`")]
    NoResult(String),
    #[error("invalid playlist `{url}`")]
    InvalidPlaylist {
        url: String,
        #[source]
        source: ResolveError,
    },
    #[error("failed to connect to voice channel {channel}")]
    FailedConnection {
        channel: ChannelId,
        #[source]
        source: TransportError,
    },
    #[error("no queue entry at index {0}")]
    IndexOutOfRange(isize),
    #[error("could not resolve a stream for `{url}`")]
    Stream {
        url: String,
        #[source]
        source: ResolveError,
    },
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl PlayerError {
    pub fn severity(&self) -> Severity {
        match self {
            Self::NotConnected
            | Self::NothingPlaying
            | Self::EmptyQueue
            | Self::AlreadyPaused
            | Self::NotPaused
            | Self::LoadingStream
            | Self::IndexOutOfRange(_) => Severity::Common,
            Self::NoResult(_) | Self::InvalidPlaylist { .. } | Self::Stream { .. } => {
                Severity::Suspicious
            }
            Self::FailedConnection { .. } | Self::Transport(_) => Severity::Fault,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_mapping() {
        assert_eq!(PlayerError::EmptyQueue.severity(), Severity::Common);
        assert_eq!(PlayerError::NoResult("x".into()).severity(), Severity::Suspicious);
        assert_eq!(
            PlayerError::Transport(TransportError::NotConnected).severity(),
            Severity::Fault
        );
    }

    #[test]
    fn test_messages_carry_context() {
        let err = PlayerError::FailedConnection {
            channel: ChannelId(42),
            source: TransportError::Connect("timeout".into()),
        };
        assert_eq!(err.to_string(), "failed to connect to voice channel 42");
        assert_eq!(
            std::error::Error::source(&err).map(|s| s.to_string()),
            Some("voice connect failed: timeout".to_string())
        );
    }
}
