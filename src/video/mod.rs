pub mod player;
mod resolver;
mod sanitize;

pub use resolver::{DirectiveKind, FILE_EXTENSIONS, PlaybackDirective, is_self_hosted, resolve};
pub use sanitize::sanitize_video_url;

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use tracing::warn;

/// Where gallery videos play: over the page or in place of the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    Modal,
    #[default]
    Inline,
}

impl DisplayMode {
    /// Parse a stored setting. Unknown values fall back to inline.
    pub fn from_setting(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "modal" => DisplayMode::Modal,
            "inline" => DisplayMode::Inline,
            other => {
                warn!(value = other, "unknown display mode, using inline");
                DisplayMode::Inline
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayMode::Modal => "modal",
            DisplayMode::Inline => "inline",
        }
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DisplayMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(DisplayMode::from_setting(&value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_mode_setting() {
        assert_eq!(DisplayMode::from_setting("modal"), DisplayMode::Modal);
        assert_eq!(DisplayMode::from_setting(" Modal "), DisplayMode::Modal);
        assert_eq!(DisplayMode::from_setting("inline"), DisplayMode::Inline);
        assert_eq!(DisplayMode::from_setting("lightbox"), DisplayMode::Inline);
        assert_eq!(DisplayMode::default(), DisplayMode::Inline);
    }

    #[test]
    fn test_display_mode_deserializes_leniently() {
        let mode: DisplayMode = serde_json::from_str("\"modal\"").unwrap();
        assert_eq!(mode, DisplayMode::Modal);
        let mode: DisplayMode = serde_json::from_str("\"popup\"").unwrap();
        assert_eq!(mode, DisplayMode::Inline);
        assert_eq!(serde_json::to_string(&DisplayMode::Modal).unwrap(), "\"modal\"");
    }
}
