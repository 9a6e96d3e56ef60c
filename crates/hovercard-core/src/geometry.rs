/// Axis-aligned rectangle in viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    /// Distance from the viewport's left edge.
    pub left: f64,
    /// Distance from the viewport's top edge.
    pub top: f64,
    /// Horizontal extent.
    pub width: f64,
    /// Vertical extent.
    pub height: f64,
}

impl Rect {
    /// Construct a rectangle.
    #[must_use]
    pub const fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Bottom edge.
    #[must_use]
    pub const fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// Right edge.
    #[must_use]
    pub const fn right(&self) -> f64 {
        self.left + self.width
    }

    /// Whether the point lies inside the rectangle (right/bottom edges excluded).
    #[must_use]
    pub const fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.left && x < self.right() && y >= self.top && y < self.bottom()
    }
}

/// Width and height pair.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    /// Horizontal extent.
    pub width: f64,
    /// Vertical extent.
    pub height: f64,
}

impl Size {
    /// Construct a size.
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Which side of the anchor the panel was placed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Panel sits above the anchor.
    Above,
    /// Panel sits below the anchor.
    Below,
}

/// Spacing rules used when placing the panel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementMetrics {
    /// Gap between anchor and panel.
    pub margin: f64,
    /// Extra room required above the panel before the above-placement is used.
    pub clearance: f64,
    /// Minimum distance kept from the viewport's left and right edges.
    pub edge_padding: f64,
}

impl PlacementMetrics {
    /// Metrics for pixel-based surfaces.
    pub const PIXELS: Self = Self {
        margin: 8.0,
        clearance: 20.0,
        edge_padding: 10.0,
    };

    /// Metrics for terminal cells.
    pub const CELLS: Self = Self {
        margin: 1.0,
        clearance: 2.0,
        edge_padding: 1.0,
    };
}

impl Default for PlacementMetrics {
    fn default() -> Self {
        Self::PIXELS
    }
}

/// Computed panel origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Left edge of the panel.
    pub left: f64,
    /// Top edge of the panel.
    pub top: f64,
    /// Side of the anchor the panel occupies.
    pub side: Side,
}

impl Placement {
    /// Rectangle occupied by a panel of `size` at this placement.
    #[must_use]
    pub const fn rect(&self, size: Size) -> Rect {
        Rect::new(self.left, self.top, size.width, size.height)
    }
}

/// Place a panel next to `anchor`.
///
/// The panel prefers the space above the anchor and falls back to below when
/// `anchor.top < panel.height + clearance`. Horizontally it starts at the
/// anchor's left edge and is clamped into the viewport.
#[must_use]
pub fn place_panel(anchor: Rect, panel: Size, viewport: Size, metrics: PlacementMetrics) -> Placement {
    let (side, top) = if anchor.top < panel.height + metrics.clearance {
        (Side::Below, anchor.bottom() + metrics.margin)
    } else {
        (Side::Above, anchor.top - metrics.margin - panel.height)
    };

    let max_left = (viewport.width - panel.width - metrics.edge_padding).max(metrics.edge_padding);
    let left = anchor.left.clamp(metrics.edge_padding, max_left);

    Placement { left, top, side }
}
