pub mod registry;

pub use registry::{PlayerMap, PlayerRegistry};
