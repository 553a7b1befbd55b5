use tracing::info;

use super::session::PlayerSession;
use super::{
    ClickTarget, Key, LoadingState, MediaEvent, Part, PlayerSurface, SessionToken, Slot, Timer,
};
use crate::video::resolve;

/// Plays videos in the page-wide modal dialog.
///
/// The dialog is mounted on first use and reused for the lifetime of the page.
#[derive(Debug, Default)]
pub struct ModalPlayer {
    mounted: bool,
    open: bool,
    session: Option<PlayerSession>,
}

impl ModalPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn session(&self) -> Option<&PlayerSession> {
        self.session.as_ref()
    }

    pub fn state(&self) -> LoadingState {
        self.session
            .as_ref()
            .map(PlayerSession::state)
            .unwrap_or(LoadingState::Idle)
    }

    /// Show the dialog playing `url`, replacing whatever it was playing.
    pub fn open<S: PlayerSurface>(&mut self, url: &str, token: SessionToken, surface: &mut S) {
        let directive = resolve(url);

        if !self.mounted {
            surface.mount_modal();
            self.mounted = true;
        }

        if let Some(previous) = self.session.as_mut() {
            previous.finish();
        }
        reset_slots(surface);

        info!(kind = ?directive.kind, url = %directive.url, "opening video modal");
        let mut session = PlayerSession::new(token, directive, Slot::Modal);
        if session.directive().is_file() {
            session.begin_file_load(surface, true);
        } else {
            session.begin_embed_load(surface);
        }

        surface.set_visible(&Slot::Modal, Part::Root, true);
        surface.set_scroll_locked(true);
        self.open = true;
        self.session = Some(session);
    }

    /// Hide the dialog and release its sources. Does nothing when already closed.
    pub fn close<S: PlayerSurface>(&mut self, surface: &mut S) {
        if !self.open {
            return;
        }

        self.open = false;
        surface.set_visible(&Slot::Modal, Part::Root, false);
        reset_slots(surface);
        surface.set_scroll_locked(false);

        if let Some(session) = self.session.as_mut() {
            session.finish();
        }
        info!("closed video modal");
    }

    pub fn handle_key<S: PlayerSurface>(&mut self, key: Key, surface: &mut S) {
        if key == Key::Escape {
            self.close(surface);
        }
    }

    pub fn handle_click<S: PlayerSurface>(&mut self, target: ClickTarget, surface: &mut S) {
        match target {
            ClickTarget::CloseControl | ClickTarget::Backdrop => self.close(surface),
            ClickTarget::Player => {}
        }
    }

    /// Remove the error panel. The session stays failed until reopened.
    pub fn dismiss_error<S: PlayerSurface>(&mut self, surface: &mut S) {
        if matches!(self.state(), LoadingState::Error(_)) {
            surface.clear_error(&Slot::Modal);
        }
    }

    /// Returns false when `token` is not the live modal session.
    pub fn media_event<S: PlayerSurface>(
        &mut self,
        token: SessionToken,
        event: MediaEvent,
        surface: &mut S,
    ) -> bool {
        match self.live_session(token) {
            Some(session) => {
                session.apply_media_event(event, surface);
                true
            }
            None => false,
        }
    }

    pub fn timer_fired<S: PlayerSurface>(&mut self, timer: Timer, surface: &mut S) -> bool {
        match self.live_session(timer.token) {
            Some(session) => {
                session.apply_timer(timer.kind, surface);
                true
            }
            None => false,
        }
    }

    fn live_session(&mut self, token: SessionToken) -> Option<&mut PlayerSession> {
        self.session
            .as_mut()
            .filter(|session| session.token() == token && session.is_active())
    }
}

// Clearing the sources is what actually halts playback.
fn reset_slots<S: PlayerSurface>(surface: &mut S) {
    let slot = Slot::Modal;
    surface.set_iframe_src(&slot, None);
    surface.set_visible(&slot, Part::Iframe, false);
    surface.stop(&slot);
    surface.set_video_src(&slot, None);
    surface.set_visible(&slot, Part::FileVideo, false);
    surface.clear_error(&slot);
    surface.set_loading(&slot, false);
}
