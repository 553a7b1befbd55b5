use std::collections::HashMap;

use tracing::{info, warn};

use super::session::{MediaOutcome, PlayerSession};
use super::{
    LoadingState, MediaEvent, OverlayShape, Part, PlayerSurface, SessionToken, Slot, Timer,
};
use crate::video::resolve;

#[derive(Debug)]
struct Overlay {
    shape: OverlayShape,
    /// The file video holds a source that reached `CanPlay`.
    source_assigned: bool,
    close_control: bool,
    session: Option<PlayerSession>,
}

impl Overlay {
    fn new(shape: OverlayShape) -> Self {
        Self {
            shape,
            source_assigned: false,
            close_control: false,
            session: None,
        }
    }

    fn live_session(&mut self, token: SessionToken) -> Option<&mut PlayerSession> {
        self.session
            .as_mut()
            .filter(|session| session.token() == token && session.is_active())
    }

    fn is_active(&self) -> bool {
        self.session.as_ref().is_some_and(PlayerSession::is_active)
    }

    /// Stop playback and put the gallery image back.
    fn deactivate<S: PlayerSurface>(&mut self, surface: &mut S) {
        let Some(session) = self.session.as_mut().filter(|session| session.is_active()) else {
            return;
        };
        let slot = session.slot().clone();

        match self.shape {
            OverlayShape::FileVideo => {
                surface.stop(&slot);
                // Only a source that reported it can play is kept. Anything still
                // loading or failed is dropped so the next open loads it again.
                if !matches!(session.state(), LoadingState::Ready | LoadingState::Playing) {
                    surface.set_video_src(&slot, None);
                    self.source_assigned = false;
                }
            }
            OverlayShape::IframeContainer => {
                surface.set_iframe_src(&slot, None);
                surface.set_visible(&slot, Part::CloseControl, false);
            }
        }

        surface.set_loading(&slot, false);
        surface.clear_error(&slot);
        surface.set_visible(&slot, Part::Root, false);
        surface.set_visible(&slot, Part::Image, true);
        surface.set_visible(&slot, Part::PlayButton, true);
        session.finish();
    }
}

/// Plays videos in place of gallery images.
///
/// Overlays are created on first use and kept (hidden) afterwards. At most
/// one overlay plays at a time across the page.
#[derive(Debug, Default)]
pub struct InlinePlayer {
    overlays: HashMap<String, Overlay>,
}

impl InlinePlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_overlay(&self, owner: &str) -> bool {
        self.overlays.contains_key(owner)
    }

    pub fn state(&self, owner: &str) -> LoadingState {
        self.overlays
            .get(owner)
            .and_then(|overlay| overlay.session.as_ref())
            .map(PlayerSession::state)
            .unwrap_or(LoadingState::Idle)
    }

    /// The image whose overlay is currently showing, if any.
    pub fn active_owner(&self) -> Option<&str> {
        self.overlays
            .iter()
            .find(|(_, overlay)| overlay.is_active())
            .map(|(owner, _)| owner.as_str())
    }

    /// Replace the image `owner` with a player for `url`.
    ///
    /// Every other inline session is stopped first. Returns false when the
    /// overlay already built for this image cannot play `url`.
    pub fn open<S: PlayerSurface>(
        &mut self,
        owner: &str,
        url: &str,
        token: SessionToken,
        surface: &mut S,
    ) -> bool {
        let directive = resolve(url);
        let shape = OverlayShape::for_directive(&directive);

        if let Some(existing) = self.overlays.get(owner)
            && existing.shape != shape
        {
            warn!(owner, url, "video link does not match the overlay built for this image");
            return false;
        }

        self.close_all(surface);

        let overlay = self.overlays.entry(owner.to_string()).or_insert_with(|| {
            surface.mount_overlay(owner, shape);
            Overlay::new(shape)
        });

        let slot = Slot::Inline(owner.to_string());
        surface.set_visible(&slot, Part::Image, false);
        surface.set_visible(&slot, Part::PlayButton, false);
        surface.set_visible(&slot, Part::Root, true);

        info!(owner, kind = ?directive.kind, url = %directive.url, "opening inline video");
        let mut session = PlayerSession::new(token, directive, slot.clone());
        match shape {
            OverlayShape::FileVideo if overlay.source_assigned => session.resume(surface),
            OverlayShape::FileVideo => {
                session.begin_file_load(surface, true);
                overlay.source_assigned = true;
            }
            OverlayShape::IframeContainer => {
                if !overlay.close_control {
                    surface.mount_close_control(owner);
                    overlay.close_control = true;
                }
                surface.set_visible(&slot, Part::CloseControl, true);
                session.begin_embed_load(surface);
            }
        }

        overlay.session = Some(session);
        true
    }

    pub fn close<S: PlayerSurface>(&mut self, owner: &str, surface: &mut S) {
        if let Some(overlay) = self.overlays.get_mut(owner) {
            overlay.deactivate(surface);
        }
    }

    pub fn close_all<S: PlayerSurface>(&mut self, surface: &mut S) {
        for overlay in self.overlays.values_mut() {
            overlay.deactivate(surface);
        }
    }

    pub fn dismiss_error<S: PlayerSurface>(&mut self, owner: &str, surface: &mut S) {
        if matches!(self.state(owner), LoadingState::Error(_)) {
            surface.clear_error(&Slot::Inline(owner.to_string()));
        }
    }

    /// Returns false when `token` belongs to no live inline session.
    pub fn media_event<S: PlayerSurface>(
        &mut self,
        token: SessionToken,
        event: MediaEvent,
        surface: &mut S,
    ) -> bool {
        let Some(overlay) = self.overlays.values_mut().find(|overlay| {
            overlay
                .session
                .as_ref()
                .is_some_and(|session| session.is_active() && session.token() == token)
        }) else {
            return false;
        };

        let outcome = overlay
            .live_session(token)
            .map(|session| session.apply_media_event(event, surface));
        if outcome == Some(MediaOutcome::Ended) {
            overlay.deactivate(surface);
        }
        true
    }

    pub fn timer_fired<S: PlayerSurface>(&mut self, timer: Timer, surface: &mut S) -> bool {
        for overlay in self.overlays.values_mut() {
            if let Some(session) = overlay.live_session(timer.token) {
                session.apply_timer(timer.kind, surface);
                return true;
            }
        }
        false
    }
}
