use url::Url;

/// Normalise a user-supplied video URL before it is stored.
///
/// Returns `None` when the value is empty or not a usable web URL; callers
/// treat that as "no video" and drop the association.
pub fn sanitize_video_url(raw: &str) -> Option<String> {
    let candidate = raw.trim();

    if candidate.is_empty() || candidate.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return None;
    }

    let parsed = if let Some(rest) = candidate.strip_prefix("//") {
        Url::parse(&format!("https://{rest}"))
    } else if candidate.starts_with('/') {
        Url::parse("http://localhost").and_then(|base| base.join(candidate))
    } else {
        Url::parse(candidate)
    };

    match parsed {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {
            Some(candidate.to_string())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_web_urls() {
        assert_eq!(
            sanitize_video_url("  https://vimeo.com/76979871 "),
            Some("https://vimeo.com/76979871".to_string())
        );
        assert_eq!(
            sanitize_video_url("http://example.com/clip.mp4?v=2"),
            Some("http://example.com/clip.mp4?v=2".to_string())
        );
        assert_eq!(
            sanitize_video_url("//cdn.example.com/clip.webm"),
            Some("//cdn.example.com/clip.webm".to_string())
        );
        assert_eq!(
            sanitize_video_url("/uploads/2024/clip.mp4"),
            Some("/uploads/2024/clip.mp4".to_string())
        );
    }

    #[test]
    fn test_rejects_unusable_values() {
        assert_eq!(sanitize_video_url(""), None);
        assert_eq!(sanitize_video_url("   "), None);
        assert_eq!(sanitize_video_url("javascript:alert(1)"), None);
        assert_eq!(sanitize_video_url("ftp://example.com/clip.mp4"), None);
        assert_eq!(sanitize_video_url("not a url"), None);
        assert_eq!(sanitize_video_url("clip.mp4"), None);
        assert_eq!(sanitize_video_url("https://exa mple.com/clip.mp4"), None);
    }
}
