use std::time::{Duration, SystemTime};

use dashmap::DashMap;
use tracing::debug;

use super::MetadataCache;
use crate::sources::VideoMetadata;

struct CachedEntry {
    metadata: VideoMetadata,
    stored_at: SystemTime,
}

/// Process-local metadata cache with a fixed time-to-live.
pub struct InMemoryMetadataCache {
    entries: DashMap<String, CachedEntry>,
    ttl: Duration,
}

impl InMemoryMetadataCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn from_config(config: &crate::configs::CacheConfig) -> Self {
        Self::new(config.ttl())
    }

    fn is_fresh(&self, entry: &CachedEntry, now: SystemTime) -> bool {
        now.duration_since(entry.stored_at)
            .map(|age| age < self.ttl)
            .unwrap_or(true)
    }

    /// Bulk lookup; missing and expired ids are absent from the result.
    pub fn get_many(&self, video_ids: &[&str]) -> Vec<(String, VideoMetadata)> {
        video_ids
            .iter()
            .filter_map(|id| self.get(id).map(|meta| (id.to_string(), meta)))
            .collect()
    }

    pub(crate) fn put_at(&self, video_id: &str, metadata: VideoMetadata, stored_at: SystemTime) {
        self.entries.insert(
            video_id.to_string(),
            CachedEntry {
                metadata,
                stored_at,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl MetadataCache for InMemoryMetadataCache {
    fn get(&self, video_id: &str) -> Option<VideoMetadata> {
        let entry = self.entries.get(video_id)?;
        self.is_fresh(&entry, SystemTime::now())
            .then(|| entry.metadata.clone())
    }

    fn put(&self, video_id: &str, metadata: VideoMetadata) {
        self.put_at(video_id, metadata, SystemTime::now());
    }

    fn run_cleanup(&self) -> usize {
        let now = SystemTime::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| self.is_fresh(entry, now));
        let evicted = before.saturating_sub(self.entries.len());
        if evicted > 0 {
            debug!("Evicted {} stale metadata entries", evicted);
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    fn metadata(title: &str) -> VideoMetadata {
        VideoMetadata {
            url: format!("https://www.youtube.com/watch?v={:0>11}", title),
            title: title.to_string(),
            duration: 180,
            views: 10,
            thumbnail: None,
            channel: "channel".to_string(),
            channel_url: None,
        }
    }

    #[test]
    fn test_put_get() {
        let cache = InMemoryMetadataCache::new(28 * DAY);
        assert!(cache.get("aaaaaaaaaaa").is_none());
        cache.put("aaaaaaaaaaa", metadata("a"));
        assert_eq!(cache.get("aaaaaaaaaaa").unwrap().title, "a");
    }

    #[test]
    fn test_cleanup_evicts_only_stale() {
        let cache = InMemoryMetadataCache::new(28 * DAY);
        let now = SystemTime::now();
        cache.put_at("old", metadata("old"), now - 29 * DAY);
        cache.put_at("recent", metadata("recent"), now - 27 * DAY);
        cache.put("fresh", metadata("fresh"));

        assert!(cache.get("old").is_none());
        assert_eq!(cache.run_cleanup(), 1);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.run_cleanup(), 0);
        assert!(cache.get("recent").is_some());
    }

    #[test]
    fn test_get_many_skips_missing() {
        let cache = InMemoryMetadataCache::new(DAY);
        cache.put("a", metadata("a"));
        cache.put("b", metadata("b"));
        let found = cache.get_many(&["a", "missing", "b"]);
        let ids: Vec<&str> = found.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
