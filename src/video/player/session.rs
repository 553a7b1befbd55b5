use tracing::{debug, warn};

use super::{
    EMBED_SETTLE, LOAD_TIMEOUT, LoadingState, MediaEvent, MediaSource, Part, PlaybackError,
    PlayerSurface, SessionToken, Slot, Timer, TimerKind,
};
use crate::video::PlaybackDirective;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum MediaOutcome {
    Applied,
    Ignored,
    Ended,
}

/// One playback attempt in one slot.
#[derive(Debug, Clone)]
pub struct PlayerSession {
    token: SessionToken,
    state: LoadingState,
    directive: PlaybackDirective,
    slot: Slot,
}

impl PlayerSession {
    pub(super) fn new(token: SessionToken, directive: PlaybackDirective, slot: Slot) -> Self {
        Self {
            token,
            state: LoadingState::Idle,
            directive,
            slot,
        }
    }

    pub fn token(&self) -> SessionToken {
        self.token
    }

    pub fn state(&self) -> LoadingState {
        self.state
    }

    pub fn directive(&self) -> &PlaybackDirective {
        &self.directive
    }

    pub fn slot(&self) -> &Slot {
        &self.slot
    }

    pub fn is_active(&self) -> bool {
        self.state != LoadingState::Closed
    }

    /// Point the file video at the directive and start the ready/error/timeout race.
    pub(super) fn begin_file_load<S: PlayerSurface>(&mut self, surface: &mut S, assign_source: bool) {
        surface.clear_error(&self.slot);
        surface.set_loading(&self.slot, true);
        if assign_source {
            let source = MediaSource {
                url: &self.directive.url,
                mime_type: self.directive.mime_type.unwrap_or("video/mp4"),
            };
            surface.set_video_src(&self.slot, Some(source));
        }
        surface.set_visible(&self.slot, Part::FileVideo, true);

        self.state = LoadingState::Loading;
        surface.schedule(
            LOAD_TIMEOUT,
            Timer {
                token: self.token,
                kind: TimerKind::LoadTimeout,
            },
        );
    }

    /// Cross-origin embeds give no load signal, so the loading mark is held
    /// for a fixed estimate and then dropped.
    pub(super) fn begin_embed_load<S: PlayerSurface>(&mut self, surface: &mut S) {
        surface.clear_error(&self.slot);
        surface.set_loading(&self.slot, true);
        surface.set_visible(&self.slot, Part::Iframe, true);
        surface.set_iframe_src(&self.slot, Some(self.directive.url.as_str()));

        self.state = LoadingState::Loading;
        surface.schedule(
            EMBED_SETTLE,
            Timer {
                token: self.token,
                kind: TimerKind::EmbedSettle,
            },
        );
    }

    /// Restart a file video whose source is already loaded.
    pub(super) fn resume<S: PlayerSurface>(&mut self, surface: &mut S) {
        surface.clear_error(&self.slot);
        surface.set_visible(&self.slot, Part::FileVideo, true);
        self.state = LoadingState::Ready;
        surface.play(&self.slot);
    }

    pub(super) fn apply_media_event<S: PlayerSurface>(
        &mut self,
        event: MediaEvent,
        surface: &mut S,
    ) -> MediaOutcome {
        match (event, self.state) {
            (MediaEvent::CanPlay, LoadingState::Loading) => {
                surface.set_loading(&self.slot, false);
                self.state = LoadingState::Ready;
                surface.play(&self.slot);
                MediaOutcome::Applied
            }
            (MediaEvent::Playing, LoadingState::Ready) => {
                self.state = LoadingState::Playing;
                MediaOutcome::Applied
            }
            (MediaEvent::Error, LoadingState::Loading) => {
                self.fail(PlaybackError::LoadFailed, surface);
                MediaOutcome::Applied
            }
            (MediaEvent::Ended, LoadingState::Ready | LoadingState::Playing) => {
                self.state = LoadingState::Ready;
                MediaOutcome::Ended
            }
            (event, state) => {
                debug!(slot = %self.slot, ?event, ?state, "ignoring media event");
                MediaOutcome::Ignored
            }
        }
    }

    pub(super) fn apply_timer<S: PlayerSurface>(&mut self, kind: TimerKind, surface: &mut S) {
        if self.state != LoadingState::Loading {
            debug!(slot = %self.slot, ?kind, "timer lost the race, ignoring");
            return;
        }

        match kind {
            TimerKind::LoadTimeout if self.directive.is_file() => {
                self.fail(PlaybackError::Timeout, surface);
            }
            TimerKind::EmbedSettle if !self.directive.is_file() => {
                surface.set_loading(&self.slot, false);
                self.state = LoadingState::Ready;
            }
            _ => debug!(slot = %self.slot, ?kind, "timer does not apply to this session"),
        }
    }

    fn fail<S: PlayerSurface>(&mut self, error: PlaybackError, surface: &mut S) {
        warn!(slot = %self.slot, url = %self.directive.url, "{}", error);
        surface.set_loading(&self.slot, false);
        surface.set_visible(&self.slot, Part::FileVideo, false);
        surface.show_error(&self.slot, error);
        self.state = LoadingState::Error(error);
    }

    pub(super) fn finish(&mut self) {
        self.state = LoadingState::Closed;
    }
}
