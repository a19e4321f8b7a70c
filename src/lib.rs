//! Multi-detector box fusion with temporal confidence tracking and alerting.
//!
//! A frame flows through three stages:
//!
//! 1. [`fusion`] merges the boxes reported by several detectors into one
//!    consensus box per object (weighted box fusion).
//! 2. [`tracker`] maps each fused box onto a persistent track, smooths its
//!    confidence over time and classifies the confidence trend.
//! 3. [`alert`] combines a track's smoothed state with externally supplied
//!    semantic signals into at most one alert per track.
//!
//! [`FusionPipeline`] runs all three in order for each frame.
//!
//! ```
//! use fusiontrack_rs::{Detection, FusionPipeline, NoSignals};
//!
//! let mut pipeline = FusionPipeline::with_default_config()?;
//! let frame = vec![
//!     vec![Detection::new(0, "Helmet", 0.9, 10.0, 10.0, 60.0, 60.0)],
//!     vec![Detection::new(1, "Helmet", 0.8, 12.0, 11.0, 61.0, 62.0)],
//! ];
//! let report = pipeline.process_frame(&frame, 0.0, &mut NoSignals)?;
//! assert_eq!(report.detections.len(), 1);
//! # Ok::<(), fusiontrack_rs::FusionError>(())
//! ```

pub mod alert;
pub mod config;
pub mod error;
pub mod fusion;
pub mod integration;
pub mod tracker;

pub use alert::{Alert, AlertCondition, AlertPolicy, SemanticSignal, Severity, generate_alert};
pub use config::PipelineConfig;
pub use error::{FusionError, InvalidInput, Result};
pub use fusion::{BoxFusion, Detection, FusedDetection, FusionConfig, fuse};
pub use integration::{
    DetectionBuilder, FrameReport, FusionPipeline, IntoDetections, NoSignals, SignalSource,
};
pub use tracker::{EnrichedDetection, Rect, RegistryConfig, Track, TrackId, TrackRegistry, Trend};
