//! Video transcript fetching.
//!
//! Extracts a platform video identifier from a URL or bare id and pulls the
//! caption track as joined plain text. Everything here is best-effort: any
//! extraction or fetch failure yields an empty string, never an error.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

/// Caption endpoint for the timedtext service.
const TIMEDTEXT_URL: &str = "https://video.google.com/timedtext";

static ID_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"[?&]v=([A-Za-z0-9_-]{11})").expect("valid regex"),
        Regex::new(r"youtu\.be/([A-Za-z0-9_-]{11})").expect("valid regex"),
        Regex::new(r"youtube\.com/embed/([A-Za-z0-9_-]{11})").expect("valid regex"),
    ]
});

static BARE_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").expect("valid regex"));

static CAPTION_TEXT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<text[^>]*>(.*?)</text>").expect("valid regex"));

/// Extract an 11-character video id from a URL or bare id string.
pub fn extract_video_id(url_or_id: &str) -> Option<String> {
    for pattern in ID_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(url_or_id) {
            return Some(caps[1].to_string());
        }
    }

    if BARE_ID_RE.is_match(url_or_id) {
        return Some(url_or_id.to_string());
    }

    None
}

/// Fetch the transcript for a video as a single joined string.
///
/// Languages are tried in order; the first non-empty track wins.
/// Returns an empty string on any extraction or fetch failure.
pub async fn fetch_transcript(
    client: &reqwest::Client,
    url_or_id: &str,
    languages: &[&str],
) -> String {
    let Some(video_id) = extract_video_id(url_or_id) else {
        debug!(input = url_or_id, "no video id found");
        return String::new();
    };

    for lang in languages {
        match fetch_track(client, &video_id, lang).await {
            Some(text) if !text.is_empty() => return text,
            _ => {}
        }
    }

    String::new()
}

/// Fetch and flatten one caption track; `None` on any failure.
async fn fetch_track(client: &reqwest::Client, video_id: &str, lang: &str) -> Option<String> {
    let response = client
        .get(TIMEDTEXT_URL)
        .query(&[("lang", lang), ("v", video_id)])
        .send()
        .await
        .ok()?
        .error_for_status()
        .ok()?;

    let body = response.text().await.ok()?;
    Some(caption_text(&body))
}

/// Join the text of every `<text>` element, decoding basic XML entities.
fn caption_text(xml: &str) -> String {
    let parts: Vec<String> = CAPTION_TEXT_RE
        .captures_iter(xml)
        .map(|caps| decode_entities(caps[1].trim()))
        .filter(|s| !s.is_empty())
        .collect();

    parts.join(" ")
}

/// Decode the handful of entities the timedtext service emits.
fn decode_entities(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_id_from_watch_url() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".into())
        );
    }

    #[test]
    fn extract_id_from_short_link() {
        assert_eq!(
            extract_video_id("https://youtu.be/dQw4w9WgXcQ?t=30"),
            Some("dQw4w9WgXcQ".into())
        );
    }

    #[test]
    fn extract_id_from_embed_url() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/embed/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".into())
        );
    }

    #[test]
    fn extract_bare_id() {
        assert_eq!(
            extract_video_id("dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".into())
        );
    }

    #[test]
    fn extract_rejects_non_ids() {
        assert_eq!(extract_video_id("not a video"), None);
        assert_eq!(extract_video_id("https://example.com/page"), None);
        // Wrong length for a bare id.
        assert_eq!(extract_video_id("short"), None);
    }

    #[test]
    fn caption_text_joins_and_decodes() {
        let xml = r#"<?xml version="1.0"?>
<transcript>
  <text start="0.0" dur="2.0">Hello &amp; welcome</text>
  <text start="2.0" dur="2.0">it&#39;s a test</text>
  <text start="4.0" dur="1.0"> </text>
</transcript>"#;

        assert_eq!(caption_text(xml), "Hello & welcome it's a test");
    }

    #[test]
    fn caption_text_empty_on_no_captions() {
        assert_eq!(caption_text("<transcript></transcript>"), "");
        assert_eq!(caption_text("not xml at all"), "");
    }
}
