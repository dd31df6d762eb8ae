pub mod memory;

pub use memory::InMemoryMetadataCache;

use crate::sources::VideoMetadata;

/// Key-value store for resolved video metadata, keyed by video id.
///
/// Consulted by every player; owned by the registry.
pub trait MetadataCache: Send + Sync {
    fn get(&self, video_id: &str) -> Option<VideoMetadata>;

    fn put(&self, video_id: &str, metadata: VideoMetadata);

    /// Evicts stale entries and returns how many were removed.
    fn run_cleanup(&self) -> usize;
}
