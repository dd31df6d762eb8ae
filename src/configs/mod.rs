pub mod base;
pub mod cache;
pub mod logging;
pub mod player;

pub use base::*;
pub use cache::*;
pub use logging::*;
pub use player::*;
