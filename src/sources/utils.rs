use std::sync::LazyLock;

use regex::Regex;

static VIDEO_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:https?://)?(?:www\.|m\.|music\.)?(?:youtube\.com/watch\?(?:[^#\s]*&)?v=|youtu\.be/|youtube\.com/embed/|youtube\.com/v/|youtube\.com/shorts/)([A-Za-z0-9_-]{11})",
    )
    .expect("video id pattern is valid")
});

static PLAYLIST_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[?&]list=([A-Za-z0-9_-]+)").expect("playlist pattern is valid"));

/// Extracts the 11 character video id from the common YouTube URL shapes.
pub fn extract_video_id(url: &str) -> Option<String> {
    VIDEO_ID_RE
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_owned())
}

pub fn extract_playlist_id(url: &str) -> Option<String> {
    PLAYLIST_ID_RE
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_owned())
}

/// A query is a playlist request when its URL carries a `list` parameter.
pub fn is_playlist_url(query: &str) -> bool {
    query_param(query, "list").is_some_and(|v| !v.is_empty())
}

/// Returns the percent-decoded value of the first `key` query parameter.
pub fn query_param(url: &str, key: &str) -> Option<String> {
    let query = url.split_once('?')?.1;
    let query = query.split('#').next().unwrap_or(query);

    query.split('&').find_map(|kv| {
        let mut parts = kv.splitn(2, '=');
        if parts.next() != Some(key) {
            return None;
        }
        let raw = parts.next().unwrap_or("");
        Some(
            urlencoding::decode(raw)
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| raw.to_owned()),
        )
    })
}
