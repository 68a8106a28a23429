//! Source-URL canonicalization.
//!
//! Two superficially different URLs can name the same logical video. The
//! canonicalizer extracts the platform's natural identifier when one is
//! present; callers fall back to verbatim matching otherwise. Pure and
//! testable in isolation.

use once_cell::sync::Lazy;
use regex::Regex;

static YOUTUBE_ID: Lazy<Regex> = Lazy::new(|| {
    // Eleven URL-safe chars following any of the id-bearing path shapes.
    #[allow(clippy::unwrap_used)]
    Regex::new(r"(?:v=|youtu\.be/|/embed/|/v/|/shorts/)([A-Za-z0-9_-]{11})").unwrap()
});

/// Extract a YouTube video id from any of its URL surface forms.
///
/// Handles `youtube.com/watch?v=..`, `youtu.be/..`, `/embed/..`, `/v/..`
/// and `/shorts/..`. Returns `None` for non-YouTube URLs.
#[must_use]
pub fn extract_youtube_id(url: &str) -> Option<&str> {
    YOUTUBE_ID
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Whether a URL belongs to a YouTube host (cookie handling cares).
#[must_use]
pub fn is_youtube_url(url: &str) -> bool {
    url.contains("youtube.com") || url.contains("youtu.be")
}
