//! Fluent construction of detections from whatever box layout a detector emits.

use crate::fusion::Detection;
use crate::tracker::Rect;

/// Accumulates the fields of one [`Detection`]; the last box setter called wins.
#[derive(Debug, Clone, Default)]
pub struct DetectionBuilder {
    source_id: usize,
    class_label: String,
    bbox: Rect,
    confidence: f32,
}

impl DetectionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the detector that produced the box.
    pub fn source(mut self, source_id: usize) -> Self {
        self.source_id = source_id;
        self
    }

    pub fn class(mut self, class_label: impl Into<String>) -> Self {
        self.class_label = class_label.into();
        self
    }

    /// Set bounding box in TLBR format (x1, y1, x2, y2).
    pub fn tlbr(mut self, x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        self.bbox = Rect::from_tlbr(x1, y1, x2, y2);
        self
    }

    /// Set bounding box in XYWH format (center_x, center_y, width, height).
    pub fn xywh(mut self, cx: f32, cy: f32, w: f32, h: f32) -> Self {
        self.bbox = Rect::from_xywh(cx, cy, w, h);
        self
    }

    /// Set bounding box in TLWH format (left, top, width, height).
    pub fn tlwh(mut self, l: f32, t: f32, w: f32, h: f32) -> Self {
        self.bbox = Rect::new(l, t, w, h);
        self
    }

    pub fn confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }

    /// Build the final `Detection`. Range checks happen at fusion time.
    pub fn build(self) -> Detection {
        Detection::from_rect(self.source_id, self.class_label, self.confidence, self.bbox)
    }
}
