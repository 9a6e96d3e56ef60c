use hovercard_core::Rect as AnchorRect;
use ratatui::{
    layout::{Position, Rect},
    text::Span,
};

use super::constants::ROSTER_MARKER;
use super::widgets::util::truncate_with_ellipsis;

/// Usernames listed one per row; each label is a hover anchor.
#[derive(Debug, Clone)]
pub(super) struct Roster {
    entries: Vec<String>,
}

/// Screen position of one roster label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct RosterSlot {
    pub(super) index: usize,
    pub(super) key: String,
    pub(super) label: String,
    pub(super) area: Rect,
}

impl RosterSlot {
    pub(super) fn anchor_rect(&self) -> AnchorRect {
        AnchorRect::new(
            f64::from(self.area.x),
            f64::from(self.area.y),
            f64::from(self.area.width),
            f64::from(self.area.height),
        )
    }
}

impl Roster {
    pub(super) const fn new(entries: Vec<String>) -> Self {
        Self { entries }
    }

    pub(super) fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Lay out labels inside the bordered `body` block.
    pub(super) fn slots(&self, body: Rect) -> Vec<RosterSlot> {
        let inner = Rect::new(
            body.x.saturating_add(1),
            body.y.saturating_add(1),
            body.width.saturating_sub(2),
            body.height.saturating_sub(2),
        );
        let max_label = usize::from(inner.width.saturating_sub(2));

        self.entries
            .iter()
            .enumerate()
            .take(usize::from(inner.height))
            .map(|(index, key)| {
                let full = format!("{ROSTER_MARKER}{key}");
                let label = truncate_with_ellipsis(&full, max_label).into_owned();
                let width = u16::try_from(Span::raw(label.as_str()).width()).unwrap_or(u16::MAX);
                let row = inner.y + u16::try_from(index).unwrap_or(u16::MAX);
                RosterSlot {
                    index,
                    key: key.clone(),
                    label,
                    area: Rect::new(inner.x + 1, row, width, 1),
                }
            })
            .collect()
    }

    /// Label under the pointer, if any.
    pub(super) fn slot_at(&self, body: Rect, column: u16, row: u16) -> Option<RosterSlot> {
        self.slots(body)
            .into_iter()
            .find(|slot| slot.area.contains(Position::new(column, row)))
    }
}
