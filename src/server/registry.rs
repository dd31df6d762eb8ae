use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, info};

use crate::{
    cache::{InMemoryMetadataCache, MetadataCache},
    common::types::{GuildId, UserId},
    configs::{Config, PlayerConfig},
    events::EventManager,
    player::{MusicPlayer, PlayerServices},
    sources::MetadataResolver,
    voice::TransportFactory,
};

/// Alias for the guild to player map.
pub type PlayerMap = DashMap<GuildId, Arc<MusicPlayer>>;

/// Owns one player per guild and the collaborators they share.
pub struct PlayerRegistry {
    players: PlayerMap,
    factory: Arc<dyn TransportFactory>,
    services: PlayerServices,
    config: PlayerConfig,
}

impl PlayerRegistry {
    pub fn new(
        factory: Arc<dyn TransportFactory>,
        services: PlayerServices,
        config: PlayerConfig,
    ) -> Self {
        Self {
            players: DashMap::new(),
            factory,
            services,
            config,
        }
    }

    /// Wires an in-memory cache and a fresh event manager from `config`.
    pub fn from_config(
        config: &Config,
        factory: Arc<dyn TransportFactory>,
        resolver: Arc<dyn MetadataResolver>,
    ) -> Self {
        let cache: Arc<dyn MetadataCache> =
            Arc::new(InMemoryMetadataCache::from_config(&config.cache));
        let services = PlayerServices {
            resolver,
            cache,
            events: EventManager::new(),
        };
        Self::new(factory, services, config.player.clone())
    }

    pub fn events(&self) -> &EventManager {
        &self.services.events
    }

    pub fn cache(&self) -> &Arc<dyn MetadataCache> {
        &self.services.cache
    }

    /// Returns the guild's player, creating it with a new transport on first use.
    pub fn get_or_create(&self, guild_id: &GuildId, bot_id: UserId) -> Arc<MusicPlayer> {
        self.players
            .entry(guild_id.clone())
            .or_insert_with(|| {
                info!("[{}] Creating player", guild_id);
                MusicPlayer::new(
                    guild_id.clone(),
                    bot_id,
                    self.factory.create(guild_id),
                    self.services.clone(),
                    self.config.clone(),
                )
            })
            .clone()
    }

    pub fn get(&self, guild_id: &GuildId) -> Option<Arc<MusicPlayer>> {
        self.players.get(guild_id).map(|p| p.value().clone())
    }

    /// Removes the guild's player and tears it down. Returns `false` if
    /// there was none.
    pub async fn destroy(&self, guild_id: &GuildId) -> bool {
        let Some((_, player)) = self.players.remove(guild_id) else {
            return false;
        };
        player.cleanup().await;
        info!("[{}] Player destroyed", guild_id);
        true
    }

    /// Forwards a voice state change to the guild's player, if any.
    pub async fn handle_voice_state_update(&self, guild_id: &GuildId, member: UserId) {
        match self.get(guild_id) {
            Some(player) => player.handle_voice_state_update(member).await,
            None => debug!("[{}] Voice update for {} without a player", guild_id, member),
        }
    }

    pub async fn shutdown(&self) {
        info!("Shutting down {} player(s)", self.players.len());
        for guild_id in self.guild_ids() {
            self.destroy(&guild_id).await;
        }
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn guild_ids(&self) -> Vec<GuildId> {
        self.players.iter().map(|p| p.key().clone()).collect()
    }
}
