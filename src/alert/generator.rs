//! Alert generation from smoothed track state and external semantic signals.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::alert::condition::{Activity, AlertCondition, Severity};
use crate::error::{InvalidInput, Result, check_unit_interval};
use crate::tracker::{EnrichedDetection, TrackId};

/// Thresholds for alert policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertPolicy {
    /// Anomaly scores strictly above this raise a high-severity alert
    pub anomaly_threshold: f32,
    /// Smoothed confidence strictly below this raises a low-severity alert
    pub low_confidence_threshold: f32,
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self {
            anomaly_threshold: 0.7,
            low_confidence_threshold: 0.4,
        }
    }
}

/// Output of the external sequence classifier for one detection.
///
/// Computed elsewhere; this crate only reads it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SemanticSignal {
    pub anomaly_score: Option<f32>,
    pub activity: Option<String>,
}

impl SemanticSignal {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_anomaly(mut self, score: f32) -> Self {
        self.anomaly_score = Some(score);
        self
    }

    pub fn with_activity(mut self, activity: impl Into<String>) -> Self {
        self.activity = Some(activity.into());
        self
    }
}

/// Consolidated alert for one track in one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub track_id: TrackId,
    pub class_label: String,
    /// Severity of the primary condition
    pub severity: Severity,
    pub primary: AlertCondition,
    /// Every condition that fired, in policy order
    pub conditions: Vec<AlertCondition>,
    /// Smoothed confidence of the track when the alert fired
    pub confidence: f32,
    pub message: String,
}

impl AlertPolicy {
    pub fn validate(&self) -> Result<()> {
        check_unit_interval("anomaly_threshold", self.anomaly_threshold)?;
        check_unit_interval("low_confidence_threshold", self.low_confidence_threshold)
    }

    /// Evaluate every condition for `enriched` and fold them into at most one alert.
    pub fn generate(
        &self,
        enriched: &EnrichedDetection,
        anomaly_score: Option<f32>,
        activity: Option<&str>,
    ) -> Result<Option<Alert>> {
        let mut conditions = Vec::new();

        if let Some(score) = anomaly_score {
            if !(0.0..=1.0).contains(&score) {
                return Err(InvalidInput::AnomalyScoreOutOfRange(score).into());
            }
            if score > self.anomaly_threshold {
                conditions.push(AlertCondition::Anomaly { score });
            }
        }

        match activity.map(Activity::parse) {
            Some(Activity::BeingMoved) => conditions.push(AlertCondition::BeingMoved),
            Some(Activity::Obstructed) => conditions.push(AlertCondition::Obstructed),
            Some(Activity::Missing) => conditions.push(AlertCondition::Missing),
            _ => {}
        }

        if enriched.smoothed_confidence < self.low_confidence_threshold {
            conditions.push(AlertCondition::LowConfidence {
                confidence: enriched.smoothed_confidence,
            });
        }

        // Highest severity wins; the earliest condition in policy order breaks ties.
        let Some(primary) = conditions
            .iter()
            .reduce(|best, c| if c.severity() > best.severity() { c } else { best })
            .cloned()
        else {
            return Ok(None);
        };

        debug!(
            track_id = %enriched.track_id,
            severity = %primary.severity(),
            reason = primary.kind(),
            triggered = conditions.len(),
            "alert raised"
        );

        Ok(Some(Alert {
            track_id: enriched.track_id.clone(),
            class_label: enriched.fused.class_label.clone(),
            severity: primary.severity(),
            message: primary.message(&enriched.fused.class_label),
            primary,
            conditions,
            confidence: enriched.smoothed_confidence,
        }))
    }

    pub fn generate_for(
        &self,
        enriched: &EnrichedDetection,
        signal: &SemanticSignal,
    ) -> Result<Option<Alert>> {
        self.generate(enriched, signal.anomaly_score, signal.activity.as_deref())
    }
}

/// Evaluate one enriched detection under the default [`AlertPolicy`].
pub fn generate_alert(
    enriched: &EnrichedDetection,
    anomaly_score: Option<f32>,
    activity: Option<&str>,
) -> Result<Option<Alert>> {
    AlertPolicy::default().generate(enriched, anomaly_score, activity)
}

/// Order alerts for presentation: most severe first, then most confident.
pub fn rank_alerts(alerts: &mut [Alert]) {
    alerts.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| b.confidence.total_cmp(&a.confidence))
            .then_with(|| a.track_id.cmp(&b.track_id))
    });
}
