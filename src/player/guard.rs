use std::sync::atomic::{AtomicBool, Ordering};

use super::{MusicPlayer, PlayerError};

/// What a command needs before it may run. Checked in field order, so the
/// first unmet condition decides the error.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Preconditions {
    pub now_playing: bool,
    pub connection: bool,
    pub not_fetching: bool,
    pub queue: bool,
}

impl Preconditions {
    pub fn connected() -> Self {
        Self {
            connection: true,
            ..Self::default()
        }
    }

    pub fn with_now_playing(mut self) -> Self {
        self.now_playing = true;
        self
    }

    pub fn with_queue(mut self) -> Self {
        self.queue = true;
        self
    }

    pub fn not_fetching(mut self) -> Self {
        self.not_fetching = true;
        self
    }
}

impl MusicPlayer {
    /// Fails with the first unmet precondition. A dropped link is given one
    /// round of reconnect attempts before `NotConnected` is reported.
    pub(crate) async fn check(&self, pre: Preconditions) -> Result<(), PlayerError> {
        if pre.now_playing && self.state.lock().active.is_none() {
            return Err(PlayerError::NothingPlaying);
        }

        if pre.connection && !self.is_link_usable() && !self.attempt_reconnect().await {
            return Err(PlayerError::NotConnected);
        }

        if pre.not_fetching && self.fetching.load(Ordering::Acquire) {
            return Err(PlayerError::LoadingStream);
        }

        if pre.queue && self.state.lock().queue.is_empty() {
            return Err(PlayerError::EmptyQueue);
        }

        Ok(())
    }
}

/// Holds the per-player "resolving" flag for the duration of a `queue` call.
pub(crate) struct FetchGuard<'a>(&'a AtomicBool);

impl<'a> FetchGuard<'a> {
    /// Returns `None` if another request already holds the flag.
    pub fn claim(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for FetchGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
