use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, MouseButton, MouseEvent, MouseEventKind};
use hovercard_app::{HoverState, Hovercard, ProfileSource};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Paragraph},
};

use super::constants::UI_MESSAGE_TTL_SECS;
use super::panel::TerminalPanel;
use super::roster::Roster;

type Outbox = Arc<Mutex<Vec<String>>>;

pub(super) struct Ui<S: ProfileSource> {
    pub(super) card: Hovercard<S, TerminalPanel>,
    pub(super) roster: Roster,
    pub(super) message: Option<Message>,
    pub(super) should_quit: bool,
    area: Rect,
    /// Roster entry under the pointer.
    hovered: Option<usize>,
    over_panel: bool,
    /// Usernames handed to the message handler, drained into the status line.
    outbox: Outbox,
}

impl<S: ProfileSource> Ui<S> {
    pub(super) const HEADER_HEIGHT: u16 = 3;
    pub(super) const STATUS_HEIGHT: u16 = 3;

    pub(super) fn new(mut card: Hovercard<S, TerminalPanel>, roster: Roster) -> Self {
        let outbox = Outbox::default();
        let sink = Arc::clone(&outbox);
        card.register_message_handler(move |record| {
            sink.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(record.username.clone());
        });
        Self {
            card,
            roster,
            message: None,
            should_quit: false,
            area: Rect::default(),
            hovered: None,
            over_panel: false,
            outbox,
        }
    }

    fn layout(&self) -> [Rect; 3] {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(Self::HEADER_HEIGHT),
                Constraint::Min(3),
                Constraint::Length(Self::STATUS_HEIGHT),
            ])
            .split(self.area);
        [chunks[0], chunks[1], chunks[2]]
    }

    fn body_area(&self) -> Rect {
        self.layout()[1]
    }

    pub(super) fn resize(&mut self, width: u16, height: u16) {
        self.area = Rect::new(0, 0, width, height);
        self.card.force_hide_card();
        self.card.renderer_mut().set_viewport(self.area);
        self.hovered = None;
        self.over_panel = false;
    }

    pub(super) fn draw(&self, f: &mut Frame<'_>) {
        let [header, body, status] = self.layout();

        let instructions = Paragraph::new(Line::raw(
            "m: メッセージ  r: 再取得  x: キャッシュ破棄  c: 全消去  Esc: 閉じる  q: 終了",
        ))
        .block(Block::default().title("hovercard").borders(Borders::ALL));
        f.render_widget(instructions, header);

        self.draw_roster(f, body);
        self.draw_status(f, status);
        self.card.renderer().draw(f, self.card_is_current());
    }

    fn draw_roster(&self, f: &mut Frame<'_>, area: Rect) {
        let block = Block::default().title("ユーザー一覧").borders(Borders::ALL);
        f.render_widget(block, area);

        let active = self.card.current_key();
        for slot in self.roster.slots(area) {
            let mut style = Style::default().fg(Color::Cyan);
            if Some(slot.index) == self.hovered {
                style = style.add_modifier(Modifier::UNDERLINED);
            }
            if active == Some(slot.key.as_str()) && self.card_is_current() {
                style = style.add_modifier(Modifier::BOLD);
            }
            f.render_widget(Paragraph::new(Line::styled(slot.label, style)), slot.area);
        }
    }

    fn draw_status(&self, f: &mut Frame<'_>, area: Rect) {
        let (text, style) = self.message.as_ref().map_or_else(
            || (String::new(), Style::default()),
            |message| (message.text.clone(), message.style()),
        );
        let paragraph = Paragraph::new(Line::styled(text, style))
            .block(Block::default().title("ステータス").borders(Borders::ALL));
        f.render_widget(paragraph, area);
    }

    pub(super) fn handle_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Esc => self.card.force_hide_card(),
            KeyCode::Char('m') => self.activate_message(),
            KeyCode::Char('r') => self.refresh_current(),
            KeyCode::Char('x') => {
                if let Some(key) = self.target_key() {
                    self.card.invalidate_cache(&key);
                    self.info(format!("{key} のキャッシュを破棄しました"));
                }
            }
            KeyCode::Char('c') => {
                self.card.clear_cache();
                self.info("キャッシュをすべて破棄しました");
            }
            _ => {}
        }
    }

    pub(super) fn handle_mouse(&mut self, event: MouseEvent) {
        match event.kind {
            MouseEventKind::Moved | MouseEventKind::Drag(_) => {
                self.pointer_moved(event.column, event.row);
            }
            MouseEventKind::Down(MouseButton::Left) => {
                let on_button = self
                    .message_button_area()
                    .is_some_and(|area| area.contains(Position::new(event.column, event.row)));
                if on_button {
                    self.activate_message();
                }
            }
            _ => {}
        }
    }

    /// Translate a pointer position into leave/enter events, leaves first.
    fn pointer_moved(&mut self, column: u16, row: u16) {
        let in_panel = self
            .card
            .renderer()
            .area()
            .is_some_and(|area| area.contains(Position::new(column, row)));
        let slot = if in_panel {
            None
        } else {
            self.roster.slot_at(self.body_area(), column, row)
        };
        let target = slot.as_ref().map(|slot| slot.index);

        if self.over_panel && !in_panel {
            self.card.panel_leave();
        }
        if self.hovered.is_some() && self.hovered != target {
            self.card.anchor_leave();
        }
        if in_panel && !self.over_panel {
            self.card.panel_enter();
        }
        if let Some(slot) = slot
            && self.hovered != target
        {
            self.card.show_card(&slot.key, slot.anchor_rect(), false);
        }

        self.over_panel = in_panel;
        self.hovered = target;
    }

    fn target_key(&self) -> Option<String> {
        self.hovered
            .and_then(|index| self.roster.entries().get(index).cloned())
            .or_else(|| self.card.current_key().map(str::to_owned))
    }

    fn refresh_current(&mut self) {
        let Some(key) = self.target_key() else {
            return;
        };
        let Some(slot) = self
            .roster
            .slots(self.body_area())
            .into_iter()
            .find(|slot| slot.key == key)
        else {
            return;
        };
        self.card.show_card(&slot.key, slot.anchor_rect(), true);
        self.info(format!("{key} を再取得しています"));
    }

    /// The painted card belongs to the current session, not a superseded one.
    fn card_is_current(&self) -> bool {
        self.card.state() == HoverState::Visible
    }

    pub(super) fn message_button_area(&self) -> Option<Rect> {
        if !self.card_is_current() {
            return None;
        }
        self.card.renderer().message_button_area()
    }

    fn activate_message(&mut self) {
        if !self.card_is_current() {
            return;
        }
        if !self.card.activate_message() {
            self.error("このユーザーにはメッセージを送れません");
        }
        self.drain_outbox();
    }

    fn drain_outbox(&mut self) {
        let sent = std::mem::take(&mut *self.outbox.lock().unwrap_or_else(PoisonError::into_inner));
        if let Some(name) = sent.last() {
            self.info(format!("{name} さんへのメッセージ作成を開始しました"));
        }
    }

    pub(super) fn info(&mut self, message: impl Into<String>) {
        self.message = Some(Message::info(message));
    }

    pub(super) fn error(&mut self, message: impl Into<String>) {
        self.message = Some(Message::error(message));
    }

    pub(super) fn tick(&mut self) {
        self.card.poll();
        self.drain_outbox();
        if let Some(msg) = &self.message
            && msg.is_expired(Duration::from_secs(UI_MESSAGE_TTL_SECS))
        {
            self.message = None;
        }
    }
}

pub(super) struct Message {
    pub(super) text: String,
    pub(super) level: MessageLevel,
    created_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum MessageLevel {
    Info,
    Error,
}

impl Message {
    fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            level: MessageLevel::Info,
            created_at: Instant::now(),
        }
    }

    fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            level: MessageLevel::Error,
            created_at: Instant::now(),
        }
    }

    pub(super) fn style(&self) -> Style {
        match self.level {
            MessageLevel::Info => Style::default().fg(Color::Green),
            MessageLevel::Error => Style::default().fg(Color::Red),
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() >= ttl
    }
}
