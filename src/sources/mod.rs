pub mod plugin;
pub mod utils;

pub use plugin::MetadataResolver;
pub use utils::*;

use serde::{Deserialize, Serialize};

use crate::common::types::AnyError;

/// Display metadata for one video as returned by a resolver and stored in the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMetadata {
    pub url: String,
    pub title: String,
    /// Length in seconds. Zero for live streams.
    pub duration: u64,
    pub views: u64,
    pub thumbnail: Option<String>,
    pub channel: String,
    pub channel_url: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("no video matched `{0}`")]
    NotFound(String),
    #[error("playlist `{0}` could not be enumerated")]
    InvalidPlaylist(String),
    #[error("resolver backend failed: {0}")]
    Backend(#[source] AnyError),
}

impl ResolveError {
    pub fn backend<E>(err: E) -> Self
    where
        E: Into<AnyError>,
    {
        Self::Backend(err.into())
    }
}
