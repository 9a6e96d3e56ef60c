//! Shared constants for the TUI to keep layout and timing in sync.

/// Interval in milliseconds between UI ticks; short enough for the hover delays.
pub const TUI_TICK_RATE_MS: u64 = 20;
/// Time-to-live in seconds for transient status messages.
pub const UI_MESSAGE_TTL_SECS: u64 = 5;
/// Narrowest card the panel renderer draws.
pub const CARD_MIN_WIDTH: u16 = 24;
/// Marker placed before each username in the roster.
pub const ROSTER_MARKER: &str = "@";
/// Label of the message button on an enabled card.
pub const MESSAGE_BUTTON_LABEL: &str = "[ メッセージを送る (m) ]";
