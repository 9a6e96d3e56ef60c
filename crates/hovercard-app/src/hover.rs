//! Hover-intent state machine.
//!
//! The controller never sleeps and never spawns: its owner feeds it pointer
//! events together with the current [`Instant`], calls [`HoverIntentController::poll`]
//! to fire due timers, and hands fetch results back through
//! [`HoverIntentController::complete_fetch`].

use std::fmt;
use std::time::Duration;

use hovercard_core::{ProfileRecord, Rect, UserId};
use tokio::time::Instant;
use tracing::debug;

use crate::panel::{MessageAffordance, PanelContent, PanelRenderer};

/// Callback invoked when the viewer activates the message affordance.
pub type MessageHandler = Box<dyn FnMut(&ProfileRecord) + Send>;

/// Delays governing the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoverTimings {
    /// Pointer must rest on an anchor this long before a fetch starts.
    pub show_delay: Duration,
    /// Grace period after the pointer leaves the anchor or panel.
    pub hide_delay: Duration,
    /// Default delay for [`HoverIntentController::soft_hide`].
    pub soft_hide_delay: Duration,
    /// A visible panel nobody interacts with is removed after this long.
    pub auto_hide: Duration,
}

impl Default for HoverTimings {
    fn default() -> Self {
        Self {
            show_delay: Duration::from_millis(60),
            hide_delay: Duration::from_millis(120),
            soft_hide_delay: Duration::from_millis(600),
            auto_hide: Duration::from_millis(2000),
        }
    }
}

/// Externally observable controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoverState {
    /// No session.
    Idle,
    /// Show delay running or fetch pending.
    Showing,
    /// Panel painted for the current session.
    Visible,
}

/// Hoverable element that names a subject.
#[derive(Debug, Clone, PartialEq)]
pub struct Anchor {
    /// Raw subject key; validated by the fetcher.
    pub key: String,
    /// Position of the element in viewport coordinates.
    pub rect: Rect,
}

impl Anchor {
    /// Build an anchor.
    pub fn new(key: impl Into<String>, rect: Rect) -> Self {
        Self {
            key: key.into(),
            rect,
        }
    }
}

/// Request for a profile emitted when the show delay elapses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    /// Subject to fetch.
    pub key: String,
    /// Bypass the cache.
    pub force_refresh: bool,
    /// Session the result belongs to.
    pub generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HideKind {
    /// Requested by the host; pointer activity does not cancel it.
    Hard,
    /// Pointer left; re-entering the panel or anchor cancels it.
    Soft,
}

#[derive(Debug, Clone, Copy)]
struct PendingHide {
    at: Instant,
    kind: HideKind,
}

#[derive(Debug)]
struct HoverSession {
    anchor: Anchor,
    generation: u64,
    force_refresh: bool,
    over_anchor: bool,
    over_panel: bool,
    show_at: Option<Instant>,
    hide: Option<PendingHide>,
    auto_hide_at: Option<Instant>,
    awaiting_fetch: bool,
    record: Option<ProfileRecord>,
}

impl HoverSession {
    fn cancel_all(&mut self) {
        self.show_at = None;
        self.hide = None;
        self.auto_hide_at = None;
    }

    const fn state(&self) -> HoverState {
        if self.record.is_some() {
            HoverState::Visible
        } else {
            HoverState::Showing
        }
    }

    fn next_deadline(&self) -> Option<Instant> {
        [self.show_at, self.hide.map(|hide| hide.at), self.auto_hide_at]
            .into_iter()
            .flatten()
            .min()
    }
}

/// Timer-driven controller deciding when the hover panel appears and disappears.
pub struct HoverIntentController<R> {
    renderer: R,
    timings: HoverTimings,
    viewer: Option<UserId>,
    session: Option<HoverSession>,
    next_generation: u64,
    painted: bool,
    message_handler: Option<MessageHandler>,
}

impl<R: fmt::Debug> fmt::Debug for HoverIntentController<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HoverIntentController")
            .field("renderer", &self.renderer)
            .field("timings", &self.timings)
            .field("viewer", &self.viewer)
            .field("session", &self.session)
            .field("painted", &self.painted)
            .field("message_handler", &self.message_handler.is_some())
            .finish_non_exhaustive()
    }
}

impl<R: PanelRenderer> HoverIntentController<R> {
    /// Create an idle controller painting through `renderer`.
    pub const fn new(renderer: R, timings: HoverTimings) -> Self {
        Self {
            renderer,
            timings,
            viewer: None,
            session: None,
            next_generation: 0,
            painted: false,
            message_handler: None,
        }
    }

    /// Set the identity used for the self-message guard.
    pub const fn set_viewer(&mut self, viewer: Option<UserId>) {
        self.viewer = viewer;
    }

    /// Identity used for the self-message guard.
    pub const fn viewer(&self) -> Option<UserId> {
        self.viewer
    }

    /// Configured timings.
    pub const fn timings(&self) -> HoverTimings {
        self.timings
    }

    /// Current state.
    pub fn state(&self) -> HoverState {
        self.session.as_ref().map_or(HoverState::Idle, HoverSession::state)
    }

    /// Subject key of the current session.
    pub fn current_key(&self) -> Option<&str> {
        self.session.as_ref().map(|session| session.anchor.key.as_str())
    }

    /// Record shown by the current session, once visible.
    pub fn visible_record(&self) -> Option<&ProfileRecord> {
        self.session.as_ref().and_then(|session| session.record.as_ref())
    }

    /// Whether a panel is painted (possibly for a superseded session).
    pub const fn is_painted(&self) -> bool {
        self.painted
    }

    /// Earliest pending timer, so hosts know when to poll next.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.session.as_ref().and_then(HoverSession::next_deadline)
    }

    /// Renderer handle.
    pub const fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Mutable renderer handle.
    pub const fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    /// Install the callback invoked by [`Self::activate_message`].
    pub fn register_message_handler(&mut self, handler: impl FnMut(&ProfileRecord) + Send + 'static) {
        self.message_handler = Some(Box::new(handler));
    }

    /// Pointer entered `anchor`.
    ///
    /// Re-entering the current anchor keeps the session; any other anchor, or
    /// a forced refresh, starts a new one.
    pub fn anchor_enter(&mut self, anchor: Anchor, force_refresh: bool, now: Instant) {
        if !force_refresh
            && let Some(session) = self.session.as_mut()
            && session.anchor.key == anchor.key
        {
            session.anchor.rect = anchor.rect;
            session.over_anchor = true;
            if session.state() == HoverState::Visible {
                if session.hide.is_some_and(|hide| hide.kind == HideKind::Soft) {
                    session.hide = None;
                }
                session.auto_hide_at = Some(now + self.timings.auto_hide);
            }
            return;
        }

        if let Some(previous) = self.session.as_mut() {
            debug!(from = %previous.anchor.key, to = %anchor.key, "Superseding hover session");
            previous.cancel_all();
        }

        let generation = self.next_generation;
        self.next_generation += 1;
        self.session = Some(HoverSession {
            anchor,
            generation,
            force_refresh,
            over_anchor: true,
            over_panel: false,
            show_at: Some(now + self.timings.show_delay),
            hide: None,
            auto_hide_at: None,
            awaiting_fetch: false,
            record: None,
        });
    }

    /// Pointer left the current anchor.
    pub fn anchor_leave(&mut self, now: Instant) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.over_anchor = false;
        match session.state() {
            HoverState::Showing => self.end_session(),
            HoverState::Visible if !session.over_panel => {
                self.request_hide(HideKind::Soft, self.timings.hide_delay, now);
            }
            HoverState::Visible | HoverState::Idle => {}
        }
    }

    /// Pointer entered the painted panel.
    pub fn panel_enter(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.state() != HoverState::Visible {
            return;
        }
        session.over_panel = true;
        session.auto_hide_at = None;
        if session.hide.is_some_and(|hide| hide.kind == HideKind::Soft) {
            session.hide = None;
        }
    }

    /// Pointer left the painted panel.
    pub fn panel_leave(&mut self, now: Instant) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.state() != HoverState::Visible {
            return;
        }
        session.over_panel = false;
        if session.over_anchor {
            session.auto_hide_at = Some(now + self.timings.auto_hide);
            return;
        }
        self.request_hide(HideKind::Soft, self.timings.hide_delay, now);
    }

    /// Hide after `delay`; pointer activity does not cancel it. A zero delay
    /// hides immediately.
    pub fn hide(&mut self, delay: Duration, now: Instant) {
        self.request_hide(HideKind::Hard, delay, now);
    }

    /// Hide after `delay` unless the pointer enters the panel or anchor first.
    pub fn soft_hide(&mut self, delay: Duration, now: Instant) {
        self.request_hide(HideKind::Soft, delay, now);
    }

    /// Hide immediately.
    pub fn force_hide(&mut self) {
        self.end_session();
    }

    /// Fire due timers. Returns a ticket when the show delay elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<FetchTicket> {
        let session = self.session.as_mut()?;

        if session.hide.is_some_and(|hide| hide.at <= now)
            || session.auto_hide_at.is_some_and(|at| at <= now)
        {
            self.end_session();
            return None;
        }

        if session.show_at.is_some_and(|at| at <= now) {
            session.show_at = None;
            session.awaiting_fetch = true;
            return Some(FetchTicket {
                key: session.anchor.key.clone(),
                force_refresh: session.force_refresh,
                generation: session.generation,
            });
        }
        None
    }

    /// Deliver a fetched record. Results for superseded sessions are dropped.
    ///
    /// Returns true when the panel was painted.
    pub fn complete_fetch(&mut self, generation: u64, record: ProfileRecord, now: Instant) -> bool {
        let Some(session) = self
            .session
            .as_mut()
            .filter(|session| session.generation == generation && session.awaiting_fetch)
        else {
            debug!(generation, username = %record.username, "Discarding stale profile result");
            return false;
        };

        session.awaiting_fetch = false;
        session.cancel_all();
        session.auto_hide_at = Some(now + self.timings.auto_hide);
        let content = PanelContent::layout(&self.renderer, record.clone(), session.anchor.rect, self.viewer);
        session.record = Some(record);
        self.renderer.render(&content);
        self.painted = true;
        true
    }

    /// Invoke the message handler for the visible record when messaging is allowed.
    ///
    /// Returns true when the handler ran.
    pub fn activate_message(&mut self) -> bool {
        let Some(record) = self.session.as_ref().and_then(|session| session.record.as_ref()) else {
            return false;
        };
        if !MessageAffordance::for_record(record, self.viewer).is_enabled() {
            debug!(username = %record.username, "Message affordance disabled");
            return false;
        }
        let Some(handler) = self.message_handler.as_mut() else {
            return false;
        };
        handler(record);
        true
    }

    fn request_hide(&mut self, kind: HideKind, delay: Duration, now: Instant) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if delay.is_zero() || session.state() == HoverState::Showing {
            self.end_session();
            return;
        }
        if kind == HideKind::Soft && session.hide.is_some_and(|hide| hide.kind == HideKind::Hard) {
            return;
        }
        session.cancel_all();
        session.hide = Some(PendingHide { at: now + delay, kind });
    }

    fn end_session(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.cancel_all();
        }
        if self.painted {
            self.renderer.hide();
            self.painted = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::DisabledReason;
    use hovercard_core::Size;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq)]
    enum Paint {
        Render(String, MessageAffordance),
        Hide,
    }

    #[derive(Debug, Default)]
    struct Recorder {
        log: Vec<Paint>,
    }

    impl PanelRenderer for Recorder {
        fn viewport(&self) -> Size {
            Size::new(1280.0, 800.0)
        }

        fn panel_size(&self, _record: &ProfileRecord) -> Size {
            Size::new(280.0, 160.0)
        }

        fn render(&mut self, content: &PanelContent) {
            self.log
                .push(Paint::Render(content.record.username.clone(), content.message));
        }

        fn hide(&mut self) {
            self.log.push(Paint::Hide);
        }
    }

    const fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn anchor(key: &str) -> Anchor {
        Anchor::new(key, Rect::new(100.0, 400.0, 60.0, 18.0))
    }

    fn resolved(name: &str, id: u64) -> ProfileRecord {
        ProfileRecord {
            id: Some(UserId(id)),
            ..ProfileRecord::placeholder(name)
        }
    }

    fn controller() -> HoverIntentController<Recorder> {
        HoverIntentController::new(Recorder::default(), HoverTimings::default())
    }

    /// Enter `key` at `t0` and complete its fetch right after the show delay.
    fn show(ctl: &mut HoverIntentController<Recorder>, key: &str, id: u64, t0: Instant) -> Instant {
        ctl.anchor_enter(anchor(key), false, t0);
        let fired = t0 + ms(60);
        let ticket = ctl
            .poll(fired)
            .unwrap_or_else(|| panic!("show delay should emit a ticket"));
        assert_eq!(ticket.key, key);
        assert!(ctl.complete_fetch(ticket.generation, resolved(key, id), fired));
        fired
    }

    #[test]
    fn show_delay_gates_the_fetch() {
        let mut ctl = controller();
        let t0 = Instant::now();
        ctl.anchor_enter(anchor("alice"), false, t0);
        assert_eq!(ctl.state(), HoverState::Showing);
        assert_eq!(ctl.poll(t0 + ms(59)), None);

        let ticket = ctl.poll(t0 + ms(60));
        assert_eq!(
            ticket,
            Some(FetchTicket {
                key: "alice".into(),
                force_refresh: false,
                generation: 0
            })
        );
        assert_eq!(ctl.poll(t0 + ms(61)), None);
        assert_eq!(ctl.state(), HoverState::Showing);
    }

    #[test]
    fn leaving_before_show_delay_never_fetches() {
        let mut ctl = controller();
        let t0 = Instant::now();
        ctl.anchor_enter(anchor("alice"), false, t0);
        ctl.anchor_leave(t0 + ms(30));
        assert_eq!(ctl.state(), HoverState::Idle);
        assert_eq!(ctl.poll(t0 + ms(100)), None);
        assert!(ctl.renderer().log.is_empty());
    }

    #[test]
    fn completion_renders_and_auto_hides() {
        let mut ctl = controller();
        let shown = show(&mut ctl, "alice", 1, Instant::now());
        assert_eq!(ctl.state(), HoverState::Visible);
        assert_eq!(ctl.next_deadline(), Some(shown + ms(2000)));

        assert_eq!(ctl.poll(shown + ms(1999)), None);
        assert_eq!(ctl.state(), HoverState::Visible);
        let _ = ctl.poll(shown + ms(2000));
        assert_eq!(ctl.state(), HoverState::Idle);
        assert_eq!(
            ctl.renderer().log,
            vec![
                Paint::Render("alice".into(), MessageAffordance::Enabled),
                Paint::Hide
            ]
        );
    }

    #[test]
    fn leaving_while_fetch_pending_discards_result() {
        let mut ctl = controller();
        let t0 = Instant::now();
        ctl.anchor_enter(anchor("alice"), false, t0);
        let ticket = ctl.poll(t0 + ms(60)).unwrap_or_else(|| panic!("ticket"));
        ctl.anchor_leave(t0 + ms(80));

        assert!(!ctl.complete_fetch(ticket.generation, resolved("alice", 1), t0 + ms(200)));
        assert_eq!(ctl.state(), HoverState::Idle);
        assert!(ctl.renderer().log.is_empty());
    }

    #[test]
    fn panel_entry_cancels_soft_hide_and_auto_hide() {
        let mut ctl = controller();
        let shown = show(&mut ctl, "alice", 1, Instant::now());
        ctl.anchor_leave(shown + ms(100));
        ctl.panel_enter();

        assert_eq!(ctl.next_deadline(), None);
        let _ = ctl.poll(shown + ms(5000));
        assert_eq!(ctl.state(), HoverState::Visible);

        ctl.panel_leave(shown + ms(5000));
        let _ = ctl.poll(shown + ms(5119));
        assert_eq!(ctl.state(), HoverState::Visible);
        let _ = ctl.poll(shown + ms(5120));
        assert_eq!(ctl.state(), HoverState::Idle);
    }

    #[test]
    fn leaving_panel_back_onto_anchor_keeps_card() {
        let mut ctl = controller();
        let shown = show(&mut ctl, "alice", 1, Instant::now());
        ctl.anchor_leave(shown + ms(100));
        ctl.panel_enter();
        ctl.anchor_enter(anchor("alice"), false, shown + ms(200));
        ctl.panel_leave(shown + ms(250));

        assert_eq!(ctl.next_deadline(), Some(shown + ms(2250)));
        let _ = ctl.poll(shown + ms(1000));
        assert_eq!(ctl.state(), HoverState::Visible);

        ctl.anchor_leave(shown + ms(1000));
        let _ = ctl.poll(shown + ms(1120));
        assert_eq!(ctl.state(), HoverState::Idle);
    }

    #[test]
    fn hard_hide_survives_panel_entry() {
        let mut ctl = controller();
        let shown = show(&mut ctl, "alice", 1, Instant::now());
        ctl.hide(ms(300), shown);
        ctl.panel_enter();
        ctl.panel_leave(shown + ms(10));

        let _ = ctl.poll(shown + ms(300));
        assert_eq!(ctl.state(), HoverState::Idle);
    }

    #[test]
    fn soft_hide_is_cancelled_by_panel_entry() {
        let mut ctl = controller();
        let shown = show(&mut ctl, "alice", 1, Instant::now());
        ctl.soft_hide(ms(600), shown);
        assert_eq!(ctl.next_deadline(), Some(shown + ms(600)));
        ctl.panel_enter();
        let _ = ctl.poll(shown + ms(600));
        assert_eq!(ctl.state(), HoverState::Visible);
    }

    #[test]
    fn reentering_same_anchor_rearms_auto_hide() {
        let mut ctl = controller();
        let shown = show(&mut ctl, "alice", 1, Instant::now());
        ctl.anchor_leave(shown + ms(1000));
        ctl.anchor_enter(anchor("alice"), false, shown + ms(1050));

        assert_eq!(ctl.next_deadline(), Some(shown + ms(3050)));
        let _ = ctl.poll(shown + ms(2500));
        assert_eq!(ctl.state(), HoverState::Visible);
        assert_eq!(ctl.renderer().log.len(), 1);
    }

    #[test]
    fn reentering_same_anchor_while_showing_keeps_show_timer() {
        let mut ctl = controller();
        let t0 = Instant::now();
        ctl.anchor_enter(anchor("alice"), false, t0);
        ctl.anchor_enter(anchor("alice"), false, t0 + ms(40));
        assert!(ctl.poll(t0 + ms(60)).is_some());
    }

    #[test]
    fn hide_on_a_new_anchor_is_superseded() {
        let mut ctl = controller();
        let shown = show(&mut ctl, "alice", 1, Instant::now());

        ctl.anchor_leave(shown + ms(10));
        ctl.anchor_enter(anchor("bob"), false, shown + ms(60));
        assert_eq!(ctl.state(), HoverState::Showing);
        assert!(ctl.is_painted());

        let ticket = ctl
            .poll(shown + ms(120))
            .unwrap_or_else(|| panic!("bob's show delay should fire"));
        assert_eq!(ticket.key, "bob");
        assert!(ctl.complete_fetch(ticket.generation, resolved("bob", 2), shown + ms(125)));

        // alice's hide would have fired here
        assert_eq!(ctl.poll(shown + ms(130)), None);
        assert_eq!(ctl.state(), HoverState::Visible);
        assert_eq!(
            ctl.renderer().log,
            vec![
                Paint::Render("alice".into(), MessageAffordance::Enabled),
                Paint::Render("bob".into(), MessageAffordance::Enabled),
            ]
        );
    }

    #[test]
    fn superseded_completion_is_ignored() {
        let mut ctl = controller();
        let t0 = Instant::now();
        ctl.anchor_enter(anchor("alice"), false, t0);
        let stale = ctl.poll(t0 + ms(60)).unwrap_or_else(|| panic!("ticket"));
        ctl.anchor_enter(anchor("bob"), false, t0 + ms(70));

        assert!(!ctl.complete_fetch(stale.generation, resolved("alice", 1), t0 + ms(80)));
        assert_eq!(ctl.current_key(), Some("bob"));
        assert_eq!(ctl.state(), HoverState::Showing);
    }

    #[test]
    fn new_session_that_ends_early_hides_old_panel() {
        let mut ctl = controller();
        let shown = show(&mut ctl, "alice", 1, Instant::now());
        ctl.anchor_enter(anchor("bob"), false, shown + ms(10));
        ctl.anchor_leave(shown + ms(20));

        assert_eq!(ctl.state(), HoverState::Idle);
        assert!(!ctl.is_painted());
        assert_eq!(ctl.renderer().log.last(), Some(&Paint::Hide));
    }

    #[test]
    fn force_refresh_on_same_anchor_starts_new_session() {
        let mut ctl = controller();
        let shown = show(&mut ctl, "alice", 1, Instant::now());
        ctl.anchor_enter(anchor("alice"), true, shown + ms(10));
        let ticket = ctl
            .poll(shown + ms(70))
            .unwrap_or_else(|| panic!("forced refresh should emit a ticket"));
        assert!(ticket.force_refresh);
        assert_eq!(ticket.generation, 1);
    }

    #[test]
    fn zero_delay_hide_and_force_hide_are_immediate() {
        let mut ctl = controller();
        let shown = show(&mut ctl, "alice", 1, Instant::now());
        ctl.hide(Duration::ZERO, shown);
        assert_eq!(ctl.state(), HoverState::Idle);

        let shown = show(&mut ctl, "bob", 2, shown);
        ctl.force_hide();
        assert_eq!(ctl.state(), HoverState::Idle);
        assert_eq!(ctl.poll(shown + ms(5000)), None);
        assert_eq!(ctl.renderer().log.iter().filter(|p| **p == Paint::Hide).count(), 2);
    }

    #[test]
    fn message_activation_respects_affordance() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut ctl = controller();
        ctl.set_viewer(Some(UserId(1)));
        let sink = Arc::clone(&calls);
        ctl.register_message_handler(move |record| {
            if let Ok(mut calls) = sink.lock() {
                calls.push(record.username.clone());
            }
        });

        let shown = show(&mut ctl, "me", 1, Instant::now());
        assert_eq!(
            ctl.renderer().log[0],
            Paint::Render("me".into(), MessageAffordance::Disabled(DisabledReason::SelfProfile))
        );
        assert!(!ctl.activate_message());

        ctl.anchor_enter(anchor("ghost"), false, shown);
        let ticket = ctl.poll(shown + ms(60)).unwrap_or_else(|| panic!("ticket"));
        assert!(ctl.complete_fetch(ticket.generation, ProfileRecord::placeholder("ghost"), shown + ms(60)));
        assert!(!ctl.activate_message());

        show(&mut ctl, "friend", 2, shown + ms(100));
        assert!(ctl.activate_message());
        ctl.force_hide();
        assert!(!ctl.activate_message());

        let calls = calls.lock().map(|calls| calls.clone()).unwrap_or_default();
        assert_eq!(calls, vec!["friend".to_owned()]);
    }
}
