//! Domain types for hover-preview profile cards.

/// Panel geometry and placement rules.
pub mod geometry;
/// Profile records and identity types.
pub mod profile;
/// Subject key validation.
pub mod subject;

pub use geometry::{Placement, PlacementMetrics, Rect, Side, Size, place_panel};
pub use profile::{LevelDescriptor, ParseUserIdError, ProfileRecord, UNKNOWN_USERNAME, UserId};
pub use subject::{Subject, SubjectKey};
