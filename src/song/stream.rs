use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::sources::query_param;

/// A resolved, time-limited direct media URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSource {
    pub url: String,
    pub expires_at: Option<SystemTime>,
}

impl StreamSource {
    pub fn new(url: impl Into<String>, expires_at: Option<SystemTime>) -> Self {
        Self {
            url: url.into(),
            expires_at,
        }
    }

    /// Reads the expiry from the `expire` query parameter (unix seconds),
    /// the way googlevideo style stream URLs carry it.
    pub fn from_url(url: impl Into<String>) -> Self {
        let url = url.into();
        let expires_at = query_param(&url, "expire")
            .and_then(|v| v.parse::<u64>().ok())
            .map(|secs| UNIX_EPOCH + Duration::from_secs(secs));
        Self { url, expires_at }
    }

    pub fn is_expired_at(&self, now: SystemTime) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(SystemTime::now())
    }

    /// Seconds until expiry, `None` when unknown or already past.
    pub fn expires_in(&self) -> Option<Duration> {
        self.expires_at?.duration_since(SystemTime::now()).ok()
    }
}
