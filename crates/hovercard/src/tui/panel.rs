use hovercard_app::{DisabledReason, MessageAffordance, PanelContent, PanelRenderer};
use hovercard_core::{PlacementMetrics, ProfileRecord, Size};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};
use time::macros::format_description;

use super::constants::{CARD_MIN_WIDTH, MESSAGE_BUTTON_LABEL};
use super::widgets::util::{badge_color, initial_glyph, truncate_with_ellipsis};

/// Card renderer painting into the terminal frame.
///
/// `render` only records what to show; the frame is drawn on the next
/// `Ui::draw` pass.
#[derive(Debug, Default)]
pub(super) struct TerminalPanel {
    viewport: Rect,
    painted: Option<PanelContent>,
}

impl TerminalPanel {
    pub(super) const fn new(viewport: Rect) -> Self {
        Self {
            viewport,
            painted: None,
        }
    }

    pub(super) const fn set_viewport(&mut self, viewport: Rect) {
        self.viewport = viewport;
    }

    #[cfg(test)]
    pub(super) const fn content(&self) -> Option<&PanelContent> {
        self.painted.as_ref()
    }

    /// Cells covered by the painted card, clipped to the viewport.
    pub(super) fn area(&self) -> Option<Rect> {
        let content = self.painted.as_ref()?;
        let rect = content.rect();
        let area = Rect::new(
            to_cell(rect.left),
            to_cell(rect.top),
            to_cell(rect.width),
            to_cell(rect.height),
        )
        .intersection(self.viewport);
        (!area.is_empty()).then_some(area)
    }

    /// Clickable row of the message button, when messaging is enabled.
    ///
    /// Callers must check that the painted card still belongs to the current
    /// hover session; a superseded card keeps its area until the next paint.
    pub(super) fn message_button_area(&self) -> Option<Rect> {
        let content = self.painted.as_ref()?;
        if !content.message.is_enabled() {
            return None;
        }
        let area = self.area()?;
        let lines = card_lines(&content.record, content.message, true);
        let row = area.y + 1 + u16::try_from(lines.len().saturating_sub(1)).unwrap_or(u16::MAX);
        if row >= area.bottom().saturating_sub(1) {
            return None;
        }
        let width = u16::try_from(Span::raw(MESSAGE_BUTTON_LABEL).width())
            .unwrap_or(u16::MAX)
            .min(area.width.saturating_sub(2));
        Some(Rect::new(area.x + 1, row, width, 1))
    }

    /// Draw the card; with `interactive` false the message button is greyed out.
    pub(super) fn draw(&self, f: &mut Frame<'_>, interactive: bool) {
        let (Some(content), Some(area)) = (self.painted.as_ref(), self.area()) else {
            return;
        };
        let block = Block::default()
            .title("プロフィール")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .style(Style::default().bg(Color::Black));
        let lines = card_lines(&content.record, content.message, interactive);
        let paragraph = Paragraph::new(lines).block(block);

        f.render_widget(Clear, area);
        f.render_widget(paragraph, area);
    }
}

impl PanelRenderer for TerminalPanel {
    fn viewport(&self) -> Size {
        Size::new(f64::from(self.viewport.width), f64::from(self.viewport.height))
    }

    fn panel_size(&self, record: &ProfileRecord) -> Size {
        let lines = card_lines(record, MessageAffordance::for_record(record, None), true);
        let widest = lines
            .iter()
            .map(Line::width)
            .chain([Span::raw(MESSAGE_BUTTON_LABEL).width()])
            .max()
            .unwrap_or_default();
        let width = u16::try_from(widest + 2)
            .unwrap_or(u16::MAX)
            .max(CARD_MIN_WIDTH)
            .min(self.viewport.width);
        let height = u16::try_from(lines.len() + 2).unwrap_or(u16::MAX);
        Size::new(f64::from(width), f64::from(height))
    }

    fn metrics(&self) -> PlacementMetrics {
        PlacementMetrics::CELLS
    }

    fn render(&mut self, content: &PanelContent) {
        self.painted = Some(content.clone());
    }

    fn hide(&mut self) {
        self.painted = None;
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // clamped to the u16 range first
fn to_cell(value: f64) -> u16 {
    value.round().clamp(0.0, f64::from(u16::MAX)) as u16
}

pub(super) fn card_lines(
    record: &ProfileRecord,
    message: MessageAffordance,
    interactive: bool,
) -> Vec<Line<'static>> {
    let header = Line::from(vec![
        Span::styled(
            format!("[{}] ", initial_glyph(&record.username)),
            Style::default().fg(Color::Black).bg(Color::Cyan),
        ),
        Span::styled(
            truncate_with_ellipsis(&record.username, 24).into_owned(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            record.id.map(|id| format!("  #{id}")).unwrap_or_default(),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    if record.is_placeholder() {
        return vec![
            header,
            Line::default(),
            Line::styled(
                "(プロフィールを取得できませんでした)",
                Style::default().fg(Color::Red),
            ),
        ];
    }

    let level = record.level.as_ref().map_or_else(
        || Line::styled("レベル: -", Style::default().fg(Color::DarkGray)),
        |level| {
            Line::from(vec![
                Span::raw("レベル: "),
                Span::styled(
                    format!("◆ {}", level.name),
                    Style::default()
                        .fg(badge_color(level.color.as_deref()))
                        .add_modifier(Modifier::BOLD),
                ),
            ])
        },
    );
    let roles = if record.roles.is_empty() {
        "-".to_owned()
    } else {
        record.roles.join(", ")
    };
    let joined = record
        .joined_at
        .and_then(|ts| ts.format(format_description!("[year]-[month]-[day]")).ok())
        .unwrap_or_else(|| "-".to_owned());

    vec![
        header,
        level,
        Line::raw(format!("ロール: {}", truncate_with_ellipsis(&roles, 32))),
        Line::raw(format!("ポイント: {}", record.points)),
        Line::raw(format!("参加日: {joined}")),
        Line::default(),
        message_line(message, interactive),
    ]
}

fn message_line(message: MessageAffordance, interactive: bool) -> Line<'static> {
    match message {
        MessageAffordance::Enabled if !interactive => {
            Line::styled(MESSAGE_BUTTON_LABEL, Style::default().fg(Color::DarkGray))
        }
        MessageAffordance::Enabled => Line::styled(
            MESSAGE_BUTTON_LABEL,
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ),
        MessageAffordance::Disabled(DisabledReason::SelfProfile) => {
            Line::styled("(自分のプロフィールです)", Style::default().fg(Color::DarkGray))
        }
        MessageAffordance::Disabled(DisabledReason::Placeholder) => {
            Line::styled("(メッセージは送れません)", Style::default().fg(Color::DarkGray))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hovercard_core::{LevelDescriptor, Rect as AnchorRect, UserId};

    fn alice() -> ProfileRecord {
        ProfileRecord {
            id: Some(UserId(1)),
            roles: vec!["admin".into()],
            level: Some(LevelDescriptor {
                name: "Gold".into(),
                color: Some("#ffd700".into()),
            }),
            points: 42,
            ..ProfileRecord::placeholder("alice")
        }
    }

    #[test]
    fn placeholder_card_is_short_and_has_no_button() {
        let lines = card_lines(&ProfileRecord::placeholder("ghost"), MessageAffordance::Enabled, true);
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn panel_size_fits_lines_and_border() {
        let panel = TerminalPanel::new(Rect::new(0, 0, 80, 24));
        let size = panel.panel_size(&alice());
        assert!((size.height - 9.0).abs() < f64::EPSILON);
        assert!(size.width >= f64::from(CARD_MIN_WIDTH));
    }

    #[test]
    fn rendered_card_exposes_button_area() {
        let mut panel = TerminalPanel::new(Rect::new(0, 0, 80, 24));
        let content = PanelContent::layout(&panel, alice(), AnchorRect::new(2.0, 4.0, 6.0, 1.0), None);
        panel.render(&content);

        let area = panel.area().unwrap_or_else(|| panic!("painted area"));
        assert_eq!(area.y, 6);
        assert_eq!(area.x, 2);
        let button = panel
            .message_button_area()
            .unwrap_or_else(|| panic!("button area"));
        assert_eq!(button.y, area.y + 7);

        panel.hide();
        assert!(panel.area().is_none());
        assert!(panel.content().is_none());
    }

    #[test]
    fn own_card_has_no_button_area() {
        let mut panel = TerminalPanel::new(Rect::new(0, 0, 80, 24));
        let content = PanelContent::layout(&panel, alice(), AnchorRect::new(2.0, 20.0, 6.0, 1.0), Some(UserId(1)));
        panel.render(&content);
        assert!(panel.area().is_some());
        assert!(panel.message_button_area().is_none());
    }
}
