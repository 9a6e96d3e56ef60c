//! Rendering seam between the hover controller and whatever paints the card.

use hovercard_core::{Placement, PlacementMetrics, ProfileRecord, Rect, Size, UserId, place_panel};

/// Why the "message this user" affordance is unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisabledReason {
    /// The record is a degraded placeholder without an id.
    Placeholder,
    /// The record belongs to the viewer.
    SelfProfile,
}

/// State of the "message this user" affordance on a painted card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageAffordance {
    /// The viewer may message the subject.
    Enabled,
    /// Messaging is not offered.
    Disabled(DisabledReason),
}

impl MessageAffordance {
    /// Decide the affordance for `record` as seen by `viewer`.
    #[must_use]
    pub fn for_record(record: &ProfileRecord, viewer: Option<UserId>) -> Self {
        if record.is_placeholder() {
            Self::Disabled(DisabledReason::Placeholder)
        } else if record.is_viewer(viewer) {
            Self::Disabled(DisabledReason::SelfProfile)
        } else {
            Self::Enabled
        }
    }

    /// Returns true when activation should reach the message handler.
    #[must_use]
    pub const fn is_enabled(self) -> bool {
        matches!(self, Self::Enabled)
    }
}

/// Everything a renderer needs to paint one card.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelContent {
    /// Profile to display.
    pub record: ProfileRecord,
    /// Rectangle of the hovered anchor.
    pub anchor: Rect,
    /// Where the panel goes.
    pub placement: Placement,
    /// Panel extent used for placement.
    pub size: Size,
    /// Message button state.
    pub message: MessageAffordance,
}

impl PanelContent {
    /// Lay out `record` next to `anchor` using the renderer's geometry.
    pub fn layout<R: PanelRenderer + ?Sized>(
        renderer: &R,
        record: ProfileRecord,
        anchor: Rect,
        viewer: Option<UserId>,
    ) -> Self {
        let size = renderer.panel_size(&record);
        let placement = place_panel(anchor, size, renderer.viewport(), renderer.metrics());
        let message = MessageAffordance::for_record(&record, viewer);
        Self {
            record,
            anchor,
            placement,
            size,
            message,
        }
    }

    /// Rectangle occupied by the panel.
    #[must_use]
    pub const fn rect(&self) -> Rect {
        self.placement.rect(self.size)
    }
}

/// Paints and removes the single hover panel.
pub trait PanelRenderer {
    /// Size of the surface the panel is placed in.
    fn viewport(&self) -> Size;

    /// Extent the panel needs for `record`.
    fn panel_size(&self, record: &ProfileRecord) -> Size;

    /// Spacing rules for placement.
    fn metrics(&self) -> PlacementMetrics {
        PlacementMetrics::PIXELS
    }

    /// Paint `content`, replacing whatever panel is currently shown.
    fn render(&mut self, content: &PanelContent);

    /// Remove the panel and disable its interactivity.
    fn hide(&mut self);
}
