pub mod context;
pub mod error;
pub(crate) mod guard;
pub mod playback;
pub mod queue;
pub mod state;
pub mod voice;


pub use context::{MusicPlayer, PlayerServices};
pub use error::PlayerError;
pub use playback::{QueueOutcome, SkipOutcome};
pub use queue::SongQueue;
pub use state::{LoopMode, PlayerSnapshot, PlayerStatus};
