//! Seams for the external detector and sequence-classifier backends.

use crate::alert::SemanticSignal;
use crate::fusion::Detection;
use crate::tracker::EnrichedDetection;

/// Source of per-detection semantic signals (anomaly score, activity label).
///
/// Implement this to connect a sequence classifier to the pipeline. The
/// pipeline asks once per enriched detection, after tracking, in output order.
///
/// # Example
///
/// ```ignore
/// use fusiontrack_rs::{EnrichedDetection, SemanticSignal, SignalSource};
///
/// struct MyClassifier {
///     // Your model here
/// }
///
/// impl SignalSource for MyClassifier {
///     fn signal_for(&mut self, detection: &EnrichedDetection) -> SemanticSignal {
///         // Score the track's recent history
///         SemanticSignal::none()
///     }
/// }
/// ```
pub trait SignalSource {
    fn signal_for(&mut self, detection: &EnrichedDetection) -> SemanticSignal;
}

impl<F> SignalSource for F
where
    F: FnMut(&EnrichedDetection) -> SemanticSignal,
{
    fn signal_for(&mut self, detection: &EnrichedDetection) -> SemanticSignal {
        self(detection)
    }
}

/// Signal source for deployments without a classifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSignals;

impl SignalSource for NoSignals {
    fn signal_for(&mut self, _detection: &EnrichedDetection) -> SemanticSignal {
        SemanticSignal::none()
    }
}

/// Helper trait for converting model-specific outputs to `Detection`.
///
/// Implement this for your model's output format; `source_id` is the index of
/// the detection set the output will be fused in.
pub trait IntoDetections {
    /// Convert the output into a vector of detections.
    fn into_detections(self, source_id: usize) -> Vec<Detection>;
}

impl IntoDetections for Vec<Detection> {
    fn into_detections(self, source_id: usize) -> Vec<Detection> {
        self.into_iter()
            .map(|mut det| {
                det.source_id = source_id;
                det
            })
            .collect()
    }
}

/// `(class, confidence, [x1, y1, x2, y2])` tuples as most detector heads emit them.
impl<S: Into<String>> IntoDetections for Vec<(S, f32, [f32; 4])> {
    fn into_detections(self, source_id: usize) -> Vec<Detection> {
        self.into_iter()
            .map(|(class_label, confidence, [x1, y1, x2, y2])| {
                Detection::new(source_id, class_label, confidence, x1, y1, x2, y2)
            })
            .collect()
    }
}
