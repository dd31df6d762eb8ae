pub mod cache;
pub mod common;
pub mod configs;
pub mod events;
pub mod player;
pub mod server;
pub mod song;
pub mod sources;
pub mod voice;

#[cfg(test)]
pub(crate) mod testing;

pub use player::{LoopMode, MusicPlayer, PlayerError, PlayerServices, PlayerStatus};
pub use server::PlayerRegistry;
