//! Box Fusion Engine: merges the outputs of several detectors run on the same frame.

mod detection;
mod wbf;

pub use detection::{Contribution, Detection, FusedDetection};
pub use wbf::{BoxFusion, FusionConfig, fuse};
