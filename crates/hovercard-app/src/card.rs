//! `Hovercard`: the fetcher and the hover controller wired onto a tokio runtime.

use std::sync::Arc;
use std::time::Duration;

use hovercard_api::{ApiError, HttpProfileApi};
use hovercard_core::{ProfileRecord, Rect, UserId};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::Instant;
use tracing::debug;

use crate::cache::TimeBoundedCache;
use crate::config::HovercardConfig;
use crate::fetcher::ProfileFetcher;
use crate::hover::{Anchor, FetchTicket, HoverIntentController, HoverState, HoverTimings};
use crate::panel::PanelRenderer;
use crate::rate_limit::RateLimiter;
use crate::source::ProfileSource;

#[derive(Debug)]
struct Completion {
    generation: u64,
    record: ProfileRecord,
}

/// Application surface for hover cards.
///
/// Pointer events go straight to the controller; [`Hovercard::poll`] must be
/// called regularly (each UI tick) to fire timers and paint finished fetches.
pub struct Hovercard<S, R> {
    fetcher: Arc<ProfileFetcher<S>>,
    controller: HoverIntentController<R>,
    runtime: Handle,
    completed_tx: UnboundedSender<Completion>,
    completed_rx: UnboundedReceiver<Completion>,
}

impl<R: PanelRenderer> Hovercard<HttpProfileApi, R> {
    /// Build a hover card stack talking to the configured HTTP API.
    ///
    /// # Errors
    /// Returns an error when the HTTP client cannot be constructed.
    pub fn from_config(
        config: &HovercardConfig,
        renderer: R,
        viewer: Option<UserId>,
        runtime: Handle,
    ) -> Result<Self, ApiError> {
        let api = HttpProfileApi::new(&config.api.base_url, &config.api.user_info_path, config.api.timeout())?;
        let fetcher = ProfileFetcher::with_parts(
            api,
            TimeBoundedCache::new(config.cache.ttl(), config.cache.capacity),
            RateLimiter::new(config.rate_limit.min_gap()),
        );
        let mut controller = HoverIntentController::new(renderer, config.hover.timings());
        controller.set_viewer(viewer);
        Ok(Self::new(Arc::new(fetcher), controller, runtime))
    }
}

impl<S: ProfileSource, R: PanelRenderer> Hovercard<S, R> {
    /// Combine an existing fetcher and controller.
    pub fn new(fetcher: Arc<ProfileFetcher<S>>, controller: HoverIntentController<R>, runtime: Handle) -> Self {
        let (completed_tx, completed_rx) = mpsc::unbounded_channel();
        Self {
            fetcher,
            controller,
            runtime,
            completed_tx,
            completed_rx,
        }
    }

    /// Convenience constructor with default timings on the current runtime.
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime.
    pub fn with_source(source: S, renderer: R) -> Self {
        Self::new(
            Arc::new(ProfileFetcher::new(source)),
            HoverIntentController::new(renderer, HoverTimings::default()),
            Handle::current(),
        )
    }

    /// Pointer entered the anchor for `subject_key` at `anchor_rect`.
    pub fn show_card(&mut self, subject_key: &str, anchor_rect: Rect, force_refresh: bool) {
        self.controller
            .anchor_enter(Anchor::new(subject_key, anchor_rect), force_refresh, Instant::now());
    }

    /// Hide after `delay` (immediately when `None`); pointer activity does not cancel it.
    pub fn hide_card(&mut self, delay: Option<Duration>) {
        self.controller.hide(delay.unwrap_or_default(), Instant::now());
    }

    /// Hide after `delay` (the configured soft-hide delay when `None`) unless
    /// the pointer moves onto the panel first.
    pub fn soft_hide_card(&mut self, delay: Option<Duration>) {
        let delay = delay.unwrap_or(self.controller.timings().soft_hide_delay);
        self.controller.soft_hide(delay, Instant::now());
    }

    /// Hide immediately.
    pub fn force_hide_card(&mut self) {
        self.controller.force_hide();
    }

    /// Pointer left the current anchor.
    pub fn anchor_leave(&mut self) {
        self.controller.anchor_leave(Instant::now());
    }

    /// Pointer entered the panel.
    pub fn panel_enter(&mut self) {
        self.controller.panel_enter();
    }

    /// Pointer left the panel.
    pub fn panel_leave(&mut self) {
        self.controller.panel_leave(Instant::now());
    }

    /// Activate the visible card's message affordance.
    pub fn activate_message(&mut self) -> bool {
        self.controller.activate_message()
    }

    /// Install the callback run by [`Self::activate_message`].
    pub fn register_message_handler(&mut self, handler: impl FnMut(&ProfileRecord) + Send + 'static) {
        self.controller.register_message_handler(handler);
    }

    /// Drop one cached profile.
    pub fn invalidate_cache(&self, subject_key: &str) {
        self.fetcher.invalidate(subject_key);
    }

    /// Drop every cached profile.
    pub fn clear_cache(&self) {
        self.fetcher.clear();
    }

    /// Paint finished fetches and fire due timers.
    pub fn poll(&mut self) {
        while let Ok(done) = self.completed_rx.try_recv() {
            self.controller
                .complete_fetch(done.generation, done.record, Instant::now());
        }
        if let Some(ticket) = self.controller.poll(Instant::now()) {
            self.dispatch(ticket);
        }
    }

    fn dispatch(&self, ticket: FetchTicket) {
        debug!(key = %ticket.key, generation = ticket.generation, "Dispatching hover fetch");
        let fetcher = Arc::clone(&self.fetcher);
        let completed = self.completed_tx.clone();
        self.runtime.spawn(async move {
            let record = fetcher.fetch(&ticket.key, ticket.force_refresh).await;
            // receiver only disappears together with the facade
            let _ = completed.send(Completion {
                generation: ticket.generation,
                record,
            });
        });
    }

    /// Controller state.
    pub fn state(&self) -> HoverState {
        self.controller.state()
    }

    /// Earliest pending timer.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.controller.next_deadline()
    }

    /// Record on the visible card.
    pub fn visible_record(&self) -> Option<&ProfileRecord> {
        self.controller.visible_record()
    }

    /// Subject of the current session.
    pub fn current_key(&self) -> Option<&str> {
        self.controller.current_key()
    }

    /// Renderer handle.
    pub const fn renderer(&self) -> &R {
        self.controller.renderer()
    }

    /// Mutable renderer handle.
    pub const fn renderer_mut(&mut self) -> &mut R {
        self.controller.renderer_mut()
    }

    /// Shared fetcher.
    pub const fn fetcher(&self) -> &Arc<ProfileFetcher<S>> {
        &self.fetcher
    }
}
