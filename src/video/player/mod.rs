//! Player lifecycle for gallery videos.
//!
//! The controllers here own the modal dialog and the inline overlays, move
//! each playback attempt through its loading states, and guarantee that only
//! one video plays on the page at a time. They never touch the DOM directly:
//! all rendering goes through a [`PlayerSurface`], and asynchronous outcomes
//! (media events, timers) are fed back in tagged with the [`SessionToken`]
//! of the session that requested them. Callbacks carrying a superseded token
//! are ignored.

mod inline;
mod modal;
mod session;
mod surface;


pub use inline::InlinePlayer;
pub use modal::ModalPlayer;
pub use session::PlayerSession;
pub use surface::{MediaSource, OverlayShape, Part, PlayerSurface, Slot};

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use super::DisplayMode;

/// How long a self-hosted file may take to signal it can play.
pub const LOAD_TIMEOUT: Duration = Duration::from_secs(10);

/// How long an embed keeps its loading mark after the iframe source is set.
pub const EMBED_SETTLE: Duration = Duration::from_secs(2);

/// A play control bound to one gallery image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoReference {
    pub source_url: String,
    pub display_mode: DisplayMode,
    pub owner_element_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionToken(u64);

/// Generation counter handing out session tokens.
#[derive(Debug, Default)]
pub struct TokenSource {
    last: u64,
}

impl TokenSource {
    pub fn next(&mut self) -> SessionToken {
        self.last += 1;
        SessionToken(self.last)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PlaybackError {
    #[error("Unable to load video")]
    LoadFailed,

    #[error("Video loading timeout")]
    Timeout,
}

impl PlaybackError {
    pub fn title(&self) -> &'static str {
        match self {
            PlaybackError::LoadFailed => "Unable to load video",
            PlaybackError::Timeout => "Video loading timeout",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            PlaybackError::LoadFailed => "Please check the video URL and try again.",
            PlaybackError::Timeout => "The video is taking too long to load.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadingState {
    Idle,
    Loading,
    Ready,
    Playing,
    Error(PlaybackError),
    Closed,
}

/// Lifecycle signals reported by a file video element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaEvent {
    CanPlay,
    Playing,
    Error,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    LoadTimeout,
    EmbedSettle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timer {
    pub token: SessionToken,
    pub kind: TimerKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    Other,
}

/// Where a click inside the modal landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickTarget {
    CloseControl,
    /// The dimmed area around the player.
    Backdrop,
    Player,
}

/// Page-level entry point tying the modal and inline players together.
#[derive(Debug, Default)]
pub struct PlayerController {
    tokens: TokenSource,
    modal: ModalPlayer,
    inline: InlinePlayer,
}

impl PlayerController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn modal(&self) -> &ModalPlayer {
        &self.modal
    }

    pub fn inline(&self) -> &InlinePlayer {
        &self.inline
    }

    /// Handle a click on a play control.
    ///
    /// Any other session on the page is torn down before the new one starts.
    /// A control without a video URL is a markup problem upstream; it is
    /// logged and otherwise ignored.
    pub fn activate<S: PlayerSurface>(
        &mut self,
        reference: &VideoReference,
        surface: &mut S,
    ) -> Option<SessionToken> {
        if reference.source_url.trim().is_empty() {
            warn!(owner = %reference.owner_element_id, "play control has no video url");
            return None;
        }

        let token = self.tokens.next();
        match reference.display_mode {
            DisplayMode::Modal => {
                self.inline.close_all(surface);
                self.modal.open(&reference.source_url, token, surface);
                Some(token)
            }
            DisplayMode::Inline => {
                self.modal.close(surface);
                self.inline
                    .open(&reference.owner_element_id, &reference.source_url, token, surface)
                    .then_some(token)
            }
        }
    }

    pub fn handle_key<S: PlayerSurface>(&mut self, key: Key, surface: &mut S) {
        self.modal.handle_key(key, surface);
    }

    pub fn handle_modal_click<S: PlayerSurface>(&mut self, target: ClickTarget, surface: &mut S) {
        self.modal.handle_click(target, surface);
    }

    /// Click on an inline overlay's close control.
    pub fn close_inline<S: PlayerSurface>(&mut self, owner: &str, surface: &mut S) {
        self.inline.close(owner, surface);
    }

    pub fn dismiss_error<S: PlayerSurface>(&mut self, slot: &Slot, surface: &mut S) {
        match slot {
            Slot::Modal => self.modal.dismiss_error(surface),
            Slot::Inline(owner) => self.inline.dismiss_error(owner, surface),
        }
    }

    /// The gallery re-rendered its slides; nothing may keep playing.
    pub fn gallery_reset<S: PlayerSurface>(&mut self, surface: &mut S) {
        self.modal.close(surface);
        self.inline.close_all(surface);
    }

    /// Route a media element event. Returns false for stale tokens.
    pub fn media_event<S: PlayerSurface>(
        &mut self,
        token: SessionToken,
        event: MediaEvent,
        surface: &mut S,
    ) -> bool {
        let handled = self.modal.media_event(token, event, surface)
            || self.inline.media_event(token, event, surface);
        if !handled {
            debug!(?token, ?event, "dropping media event for superseded session");
        }
        handled
    }

    /// Route a fired timer. Returns false for stale tokens.
    pub fn timer_fired<S: PlayerSurface>(&mut self, timer: Timer, surface: &mut S) -> bool {
        let handled =
            self.modal.timer_fired(timer, surface) || self.inline.timer_fired(timer, surface);
        if !handled {
            debug!(?timer, "dropping timer for superseded session");
        }
        handled
    }
}
