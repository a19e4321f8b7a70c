//! Detection records flowing from the detectors into the tracker.

use serde::{Deserialize, Serialize};

use crate::error::InvalidInput;
use crate::tracker::{BoxCheck, Rect};

/// One box reported by one detector for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Index of the detector that produced this box
    pub source_id: usize,
    /// Class label assigned by the detector
    pub class_label: String,
    /// Detection confidence in [0, 1]
    pub confidence: f32,
    /// Bounding box, in the coordinate space of the current call
    pub bbox: Rect,
}

impl Detection {
    /// Create a detection from TLBR coordinates.
    pub fn new(
        source_id: usize,
        class_label: impl Into<String>,
        confidence: f32,
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
    ) -> Self {
        Self {
            source_id,
            class_label: class_label.into(),
            confidence,
            bbox: Rect::from_tlbr(x1, y1, x2, y2),
        }
    }

    pub fn from_rect(
        source_id: usize,
        class_label: impl Into<String>,
        confidence: f32,
        bbox: Rect,
    ) -> Self {
        Self {
            source_id,
            class_label: class_label.into(),
            confidence,
            bbox,
        }
    }

    /// Check confidence range and box shape.
    pub fn validate(&self) -> Result<BoxCheck, InvalidInput> {
        check_confidence(self.source_id, self.confidence)?;
        self.bbox.validate()
    }
}

/// A detector's vote inside a fused detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub source_id: usize,
    pub confidence: f32,
}

/// Consensus of one or more detections believed to be the same object in one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedDetection {
    pub class_label: String,
    /// Weighted confidence of the cluster
    pub confidence: f32,
    /// Confidence-weighted centroid of the contributing boxes
    pub bbox: Rect,
    /// Contributing (source, confidence) pairs, highest confidence first
    pub contributions: Vec<Contribution>,
}

impl FusedDetection {
    /// Wrap a single detection with no fusion applied.
    pub fn from_detection(det: &Detection) -> Self {
        Self {
            class_label: det.class_label.clone(),
            confidence: det.confidence,
            bbox: det.bbox,
            contributions: vec![Contribution {
                source_id: det.source_id,
                confidence: det.confidence,
            }],
        }
    }

    /// Number of distinct detectors that voted for this box.
    pub fn num_sources(&self) -> usize {
        distinct_sources(&self.contributions)
    }

    pub fn validate(&self) -> Result<(), InvalidInput> {
        let source_id = self.contributions.first().map_or(0, |c| c.source_id);
        check_confidence(source_id, self.confidence)?;
        self.bbox.validate().map(|_| ())
    }
}

pub(crate) fn distinct_sources(contributions: &[Contribution]) -> usize {
    let mut sources: Vec<usize> = contributions.iter().map(|c| c.source_id).collect();
    sources.sort_unstable();
    sources.dedup();
    sources.len()
}

pub(crate) fn check_confidence(source_id: usize, confidence: f32) -> Result<(), InvalidInput> {
    if (0.0..=1.0).contains(&confidence) {
        Ok(())
    } else {
        Err(InvalidInput::ConfidenceOutOfRange {
            source_id,
            confidence,
        })
    }
}
