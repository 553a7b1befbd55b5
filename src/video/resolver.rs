use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::debug;
use url::Url;

/// Extensions played through a native `<video>` element instead of an iframe.
pub const FILE_EXTENSIONS: [&str; 9] = [
    "mp4", "webm", "ogv", "ogg", "avi", "mov", "wmv", "flv", "m4v",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectiveKind {
    Embed,
    File,
}

/// How a video URL should be played back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaybackDirective {
    pub kind: DirectiveKind,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<&'static str>,
}

impl PlaybackDirective {
    pub fn is_file(&self) -> bool {
        self.kind == DirectiveKind::File
    }
}

struct ProviderMatcher {
    name: &'static str,
    pattern: Regex,
    embed: fn(&str) -> String,
}

static PROVIDERS: Lazy<Vec<ProviderMatcher>> = Lazy::new(|| {
    vec![
        ProviderMatcher {
            name: "youtube",
            pattern: Regex::new(
                r"(?:youtube\.com/(?:[^/]+/.+/|(?:v|e(?:mbed)?)/|.*[?&]v=)|youtu\.be/)([A-Za-z0-9_-]{11})(?:[^A-Za-z0-9_-]|$)",
            )
            .expect("youtube pattern is valid"),
            embed: |id| {
                format!("https://www.youtube.com/embed/{id}?autoplay=1&rel=0&modestbranding=1")
            },
        },
        ProviderMatcher {
            name: "vimeo",
            pattern: Regex::new(r"vimeo\.com/([0-9]+)").expect("vimeo pattern is valid"),
            embed: |id| {
                format!("https://player.vimeo.com/video/{id}?autoplay=1&title=0&byline=0&portrait=0")
            },
        },
        ProviderMatcher {
            name: "dailymotion",
            pattern: Regex::new(r"dailymotion\.com/video/([A-Za-z0-9]+)")
                .expect("dailymotion pattern is valid"),
            embed: |id| format!("https://www.dailymotion.com/embed/video/{id}?autoplay=1"),
        },
        ProviderMatcher {
            name: "wistia",
            pattern: Regex::new(r"wistia\.com/medias/([A-Za-z0-9]+)")
                .expect("wistia pattern is valid"),
            embed: |id| format!("https://fast.wistia.net/embed/iframe/{id}?autoplay=1"),
        },
    ]
});

/// Map a video URL to a playback directive.
///
/// Self-hosted files are recognised by extension. Everything else is treated
/// as an embed: provider page URLs are rewritten to their canonical player
/// URL, URLs that already look like a player get `autoplay=1` appended, and
/// anything unrecognised is passed through for a direct embed attempt.
pub fn resolve(url: &str) -> PlaybackDirective {
    if let Some(extension) = file_extension(url) {
        return PlaybackDirective {
            kind: DirectiveKind::File,
            url: url.to_string(),
            mime_type: Some(mime_for_extension(&extension)),
        };
    }

    PlaybackDirective {
        kind: DirectiveKind::Embed,
        url: embed_url(url),
        mime_type: None,
    }
}

/// True when the URL points at a media file a `<video>` element can load.
pub fn is_self_hosted(url: &str) -> bool {
    file_extension(url).is_some()
}

// Relative and scheme-relative links are resolved against this so only the path is inspected.
static RELATIVE_BASE: Lazy<Url> =
    Lazy::new(|| Url::parse("https://localhost/").expect("base url is valid"));

fn file_extension(url: &str) -> Option<String> {
    let parsed = match Url::options().base_url(Some(&*RELATIVE_BASE)).parse(url) {
        Ok(parsed) => parsed,
        Err(e) => {
            debug!(url, "cannot parse video url: {}", e);
            return None;
        }
    };
    let file_name = parsed.path().rsplit('/').next()?;
    let (_, extension) = file_name.rsplit_once('.')?;
    let extension = extension.to_ascii_lowercase();

    FILE_EXTENSIONS
        .contains(&extension.as_str())
        .then_some(extension)
}

// avi, mov, wmv, flv and m4v are handed to the browser as mp4. Playback of
// those containers is best effort.
fn mime_for_extension(extension: &str) -> &'static str {
    match extension {
        "webm" => "video/webm",
        "ogv" | "ogg" => "video/ogg",
        _ => "video/mp4",
    }
}

fn embed_url(url: &str) -> String {
    for provider in PROVIDERS.iter() {
        if let Some(id) = provider.pattern.captures(url).and_then(|c| c.get(1)) {
            debug!(provider = provider.name, id = id.as_str(), "matched video provider");
            return (provider.embed)(id.as_str());
        }
    }

    if url.contains("embed") || url.contains("player") {
        let separator = if url.contains('?') { '&' } else { '?' };
        return format!("{url}{separator}autoplay=1");
    }

    debug!(url, "no video provider matched, embedding directly");
    url.to_string()
}
