//! Application layer logic for hovercard.
//!
//! This crate provides the profile lookup pipeline (cache, request coalescing,
//! rate limiting), the hover-intent controller, configuration, and viewer
//! identity shared by the CLI and TUI.

pub mod cache;
pub mod card;
pub mod coalesce;
pub mod config;
pub mod fetcher;
pub mod hover;
pub mod identity;
pub mod panel;
pub mod rate_limit;
pub mod source;

// Re-exports for convenience
pub use cache::TimeBoundedCache;
pub use card::Hovercard;
pub use coalesce::{CoalesceError, RequestCoalescer};
pub use config::{ApiConfig, CacheConfig, HoverConfig, HovercardConfig, RateLimitConfig};
pub use fetcher::{ProfileFetcher, profile_from_payload};
pub use hover::{Anchor, FetchTicket, HoverIntentController, HoverState, HoverTimings, MessageHandler};
pub use identity::{ENV_VIEWER_ID, SessionFile, viewer_id};
pub use panel::{DisabledReason, MessageAffordance, PanelContent, PanelRenderer};
pub use rate_limit::RateLimiter;
pub use source::ProfileSource;
