use async_trait::async_trait;

use super::{ResolveError, VideoMetadata};
use crate::song::StreamSource;

/// Backend that turns user queries into playable metadata.
///
/// Implementations that block (scrapers, CLI extractors) must offload to
/// `tokio::task::spawn_blocking` so one guild's lookup never stalls another.
#[async_trait]
pub trait MetadataResolver: Send + Sync {
    /// Unique identifier for this backend (e.g. "youtube").
    fn name(&self) -> &str;

    /// Resolve a URL or free-text search into a single video.
    ///
    /// `Ok(None)` means the backend answered but found nothing.
    async fn resolve(&self, query: &str) -> Result<Option<VideoMetadata>, ResolveError>;

    /// Enumerate a playlist into its video URLs, oldest entry first.
    async fn resolve_playlist(&self, url: &str) -> Result<Vec<String>, ResolveError>;

    /// Resolve a short-lived direct stream for a video page URL.
    ///
    /// Called on every play; results are never reused across plays.
    async fn resolve_stream(&self, url: &str) -> Result<StreamSource, ResolveError>;
}
