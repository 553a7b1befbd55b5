use std::fmt;
use std::time::Duration;

use super::{PlaybackError, Timer};
use crate::video::PlaybackDirective;

/// The container a player session renders into.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Slot {
    /// The page-wide modal dialog.
    Modal,
    /// The overlay sitting on top of one gallery image, keyed by the image's element id.
    Inline(String),
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Modal => f.write_str("modal"),
            Slot::Inline(owner) => write!(f, "inline:{owner}"),
        }
    }
}

/// Elements inside (or next to) a slot whose visibility the controller toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Part {
    /// The modal root or the inline overlay container itself.
    Root,
    Iframe,
    FileVideo,
    /// The gallery image an inline overlay covers.
    Image,
    PlayButton,
    CloseControl,
}

/// Which player element an inline overlay is built around. Fixed when the
/// overlay is first mounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlayShape {
    FileVideo,
    IframeContainer,
}

impl OverlayShape {
    pub fn for_directive(directive: &PlaybackDirective) -> Self {
        if directive.is_file() {
            OverlayShape::FileVideo
        } else {
            OverlayShape::IframeContainer
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaSource<'a> {
    pub url: &'a str,
    pub mime_type: &'a str,
}

/// The rendering host driven by the player controllers.
///
/// In a browser this is the DOM; tests use a recording double. Every method
/// is a fire-and-forget mutation. Asynchronous outcomes come back to the
/// controller as media events and fired timers carrying a session token.
pub trait PlayerSurface {
    /// Create the modal dialog with its iframe, file-video and error slots.
    fn mount_modal(&mut self);

    /// Create the overlay for a gallery image.
    fn mount_overlay(&mut self, owner: &str, shape: OverlayShape);

    /// Create the close control of an inline embed overlay.
    fn mount_close_control(&mut self, owner: &str);

    fn set_visible(&mut self, slot: &Slot, part: Part, visible: bool);

    fn set_iframe_src(&mut self, slot: &Slot, src: Option<&str>);

    fn set_video_src(&mut self, slot: &Slot, source: Option<MediaSource<'_>>);

    /// Ask the file video to start. Autoplay refusals are the host's business.
    fn play(&mut self, slot: &Slot);

    /// Pause the file video and rewind it to the start.
    fn stop(&mut self, slot: &Slot);

    fn set_loading(&mut self, slot: &Slot, loading: bool);

    fn show_error(&mut self, slot: &Slot, error: PlaybackError);

    fn clear_error(&mut self, slot: &Slot);

    fn set_scroll_locked(&mut self, locked: bool);

    /// Deliver `timer` back to the controller once `after` has elapsed.
    fn schedule(&mut self, after: Duration, timer: Timer);
}
