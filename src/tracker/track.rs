//! Per-object state carried across frames.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::tracker::rect::Rect;
use crate::tracker::trend::Trend;

/// Identity key of a track.
///
/// Derived from the detection itself, so it is stable across restarts for the
/// grid strategy but not globally unique.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrackId(String);

impl TrackId {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Key for a class inside a spatial grid cell, e.g. `helmet_3_1`.
    pub fn grid(class_label: &str, cell_x: i64, cell_y: i64) -> Self {
        Self(format!("{class_label}_{cell_x}_{cell_y}"))
    }

    /// Key for the `seq`-th track of a class, e.g. `helmet#7`.
    pub fn sequential(class_label: &str, seq: u64) -> Self {
        Self(format!("{class_label}#{seq}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One physical object followed across frames.
///
/// Tracks are values: every update produces a new `Track` that replaces the
/// old one in the registry, so a half-applied update is never visible.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    /// Identity key
    pub track_id: TrackId,
    pub class_label: String,
    /// Timestamp of the first sighting
    pub first_seen: f64,
    /// Timestamp of the latest sighting
    pub last_seen: f64,
    /// Number of frames this track has been observed in
    pub age: u32,
    /// Fused box of the latest sighting
    pub last_box: Rect,
    /// EMA of boosted confidence, `None` until the first update
    pub ema_confidence: Option<f32>,
    /// Output of the latest smoothing step
    pub smoothed_confidence: f32,
    pub trend: Trend,
    pub(crate) confidence_history: VecDeque<f32>,
    pub(crate) smoothed_history: VecDeque<f32>,
}

impl Track {
    /// A track that has not been observed yet.
    pub fn new(track_id: TrackId, class_label: impl Into<String>, timestamp: f64) -> Self {
        Self {
            track_id,
            class_label: class_label.into(),
            first_seen: timestamp,
            last_seen: timestamp,
            age: 0,
            last_box: Rect::default(),
            ema_confidence: None,
            smoothed_confidence: 0.0,
            trend: Trend::Initializing,
            confidence_history: VecDeque::new(),
            smoothed_history: VecDeque::new(),
        }
    }

    /// Record a sighting at `timestamp`. Confidence bookkeeping is left to the smoother.
    pub fn observe(mut self, bbox: Rect, timestamp: f64) -> Self {
        self.age = self.age.saturating_add(1);
        self.last_seen = timestamp;
        self.last_box = bbox;
        self
    }

    /// Raw fused confidences of the latest sightings, oldest first.
    pub fn confidence_history(&self) -> &VecDeque<f32> {
        &self.confidence_history
    }

    /// Smoothed confidences used for trend classification, oldest first.
    pub fn smoothed_history(&self) -> &VecDeque<f32> {
        &self.smoothed_history
    }

    pub fn is_stale(&self, now: f64, max_age: f64) -> bool {
        now - self.last_seen > max_age
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_id_formats() {
        assert_eq!(TrackId::grid("helmet", 3, 1).as_str(), "helmet_3_1");
        assert_eq!(TrackId::sequential("helmet", 7).to_string(), "helmet#7");
    }

    #[test]
    fn test_observe_advances_age() {
        let track = Track::new(TrackId::new("tank_0_0"), "tank", 1.0)
            .observe(Rect::new(0.0, 0.0, 10.0, 10.0), 1.0)
            .observe(Rect::new(1.0, 0.0, 10.0, 10.0), 1.5);
        assert_eq!(track.age, 2);
        assert_eq!(track.first_seen, 1.0);
        assert_eq!(track.last_seen, 1.5);
        assert_eq!(track.last_box.x, 1.0);
        assert!(track.ema_confidence.is_none());
    }

    #[test]
    fn test_staleness() {
        let track = Track::new(TrackId::new("tank_0_0"), "tank", 10.0);
        assert!(!track.is_stale(12.0, 2.0));
        assert!(track.is_stale(12.5, 2.0));
    }
}
