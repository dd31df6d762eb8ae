use std::time::Duration;

use serde::{Deserialize, Serialize};

const SECS_PER_DAY: u64 = 24 * 60 * 60;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CacheConfig {
    /// Resolved metadata older than this is evicted on cleanup.
    #[serde(default = "default_ttl_days")]
    pub ttl_days: u64,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_days * SECS_PER_DAY)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_days: default_ttl_days(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HistoryConfig {
    #[serde(default = "default_retention_days")]
    pub retention_days: u64,
}

impl HistoryConfig {
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_days * SECS_PER_DAY)
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            retention_days: default_retention_days(),
        }
    }
}

fn default_ttl_days() -> u64 {
    28
}

fn default_retention_days() -> u64 {
    30
}
