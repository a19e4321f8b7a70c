//! Integration layer for wiring detectors and sequence classifiers into the pipeline.
//!
//! Detector backends hand their output over through [`IntoDetections`]; the
//! classifier that scores tracked objects plugs in as a [`SignalSource`].

mod builder;
mod detector;
mod pipeline;

pub use builder::DetectionBuilder;
pub use detector::{IntoDetections, NoSignals, SignalSource};
pub use pipeline::{FrameReport, FusionPipeline};
