use std::collections::HashSet;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{MusicPlayer, PlayerError};
use crate::{
    common::types::{ChannelId, UserId},
    events::PlayerEvent,
    voice::{Backoff, VoiceLinkState},
};

impl MusicPlayer {
    /// Joins `channel`. Returns `false` if the link was already up.
    pub async fn connect(&self, channel: ChannelId) -> Result<bool, PlayerError> {
        if self.transport.is_connected() {
            let mut state = self.state.lock();
            state.link = VoiceLinkState::Connected;
            state.voice_wanted = true;
            state.channel.get_or_insert(channel);
            return Ok(false);
        }

        {
            let mut state = self.state.lock();
            state.link = VoiceLinkState::Connecting;
            state.channel = Some(channel);
        }
        *self.reconnect_cancel.lock() = CancellationToken::new();

        if let Err(source) = self.transport.connect(channel).await {
            self.state.lock().link = VoiceLinkState::Disconnected;
            error!("[{}] Failed to join channel {}: {}", self.guild_id, channel, source);
            return Err(PlayerError::FailedConnection { channel, source });
        }

        let members = self.present_members();
        {
            let mut state = self.state.lock();
            state.link = VoiceLinkState::Connected;
            state.voice_wanted = true;
            state.members = members;
        }
        info!("[{}] Joined channel {}", self.guild_id, channel);
        Ok(true)
    }

    /// Tries to restore the voice link to the last channel, sleeping the
    /// configured delay between attempts. Returns whether the link is up.
    pub(crate) async fn attempt_reconnect(&self) -> bool {
        let _reconnecting = self.reconnect_lock.lock().await;
        if self.is_link_usable() {
            return true;
        }

        let (channel, wanted) = {
            let state = self.state.lock();
            (state.channel, state.voice_wanted)
        };
        let Some(channel) = channel.filter(|_| wanted) else {
            return false;
        };

        let cancel = self.reconnect_cancel.lock().clone();
        let mut backoff = Backoff::from_config(&self.config);
        while let Some(attempt) = backoff.next_attempt() {
            if cancel.is_cancelled() {
                break;
            }

            self.state.lock().link = VoiceLinkState::Connecting;
            match self.transport.connect(channel).await {
                Ok(()) => {
                    let members = self.present_members();
                    let mut state = self.state.lock();
                    state.link = VoiceLinkState::Connected;
                    state.members = members;
                    info!("[{}] Reconnected on attempt {}", self.guild_id, attempt);
                    return true;
                }
                Err(e) => {
                    self.state.lock().link = VoiceLinkState::Disconnected;
                    warn!("[{}] Reconnect attempt {} failed: {}", self.guild_id, attempt, e);
                }
            }

            if backoff.is_exhausted() {
                break;
            }
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(backoff.delay()) => {}
            }
        }

        if cancel.is_cancelled() {
            debug!("[{}] Reconnect cancelled", self.guild_id);
        }
        false
    }

    /// Reacts to a voice state change of `member` in this guild.
    ///
    /// For the bot itself this restores a dropped link or resumes playback;
    /// for anyone else it diffs the channel roster and fires join/leave events.
    pub async fn handle_voice_state_update(&self, member: UserId) {
        if member == self.bot_id {
            self.handle_own_voice_update().await;
            return;
        }

        if !self.is_link_usable() {
            return;
        }

        let current = self.present_members();
        let (mut joined, mut left, now_playing) = {
            let mut state = self.state.lock();
            let joined: Vec<UserId> = current.difference(&state.members).copied().collect();
            let left: Vec<UserId> = state.members.difference(&current).copied().collect();
            state.members = current;
            (joined, left, state.active.clone())
        };
        joined.sort_unstable();
        left.sort_unstable();

        for member in joined {
            debug!("[{}] Member {} joined voice", self.guild_id, member);
            self.fire(PlayerEvent::MemberJoinedVoice {
                guild_id: self.guild_id.clone(),
                member,
                now_playing: now_playing.clone(),
            });
        }
        for member in left {
            debug!("[{}] Member {} left voice", self.guild_id, member);
            self.fire(PlayerEvent::MemberLeftVoice {
                guild_id: self.guild_id.clone(),
                member,
            });
        }
    }

    async fn handle_own_voice_update(&self) {
        if !self.transport.is_connected() {
            let wanted = {
                let mut state = self.state.lock();
                state.link = VoiceLinkState::Disconnected;
                state.voice_wanted
            };
            if !wanted {
                return;
            }

            warn!("[{}] Bot dropped out of voice, reconnecting", self.guild_id);
            if !self.attempt_reconnect().await {
                error!(
                    "[{}] Failed to reconnect after {} attempts",
                    self.guild_id, self.config.reconnect_attempts
                );
            }
            return;
        }

        let should_resume = {
            let state = self.state.lock();
            !state.paused && state.active.is_some()
        };
        if should_resume {
            if let Err(e) = self.resume(true).await {
                error!("[{}] Failed to resume after voice update: {}", self.guild_id, e);
            }
        }
    }

    fn present_members(&self) -> HashSet<UserId> {
        self.transport
            .channel_members()
            .into_iter()
            .filter(|member| *member != self.bot_id)
            .collect()
    }
}
