//! Cross-frame tracking: geometry, identity, confidence smoothing and the track registry.

mod identity;
mod matching;
mod rect;
mod registry;
mod smoothing;
mod track;
mod trend;

pub use identity::{CentroidResolver, GridResolver, IdentityResolver, IdentityStrategy};
pub use matching::{AssignmentResult, center_distance, linear_assignment};
pub use rect::{BoxCheck, CoordinateSpace, ImageSize, Rect, iou_batch};
pub use registry::{EnrichedDetection, RegistryConfig, TrackRegistry, TrackingStats};
pub use smoothing::{Boosts, SmoothingConfig, TemporalSmoother, confidence_ceiling};
pub use track::{Track, TrackId};
pub use trend::Trend;
