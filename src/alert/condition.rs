use serde::{Deserialize, Serialize};

/// Alert severity levels, ordered from least to most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Activity label reported by the external sequence classifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activity {
    Stationary,
    BeingMoved,
    Obstructed,
    Missing,
    Normal,
    /// Any label this crate has no policy for
    Other(String),
}

impl Activity {
    /// Parse a classifier label. Case, underscores and hyphens are ignored,
    /// so `"being moved"`, `"being_moved"` and `"Being-Moved"` are the same.
    pub fn parse(label: &str) -> Self {
        let normalized: String = label
            .trim()
            .chars()
            .map(|c| match c {
                '_' | '-' => ' ',
                c => c.to_ascii_lowercase(),
            })
            .collect();

        match normalized.as_str() {
            "stationary" => Activity::Stationary,
            "being moved" => Activity::BeingMoved,
            "obstructed" => Activity::Obstructed,
            "missing" => Activity::Missing,
            "normal" => Activity::Normal,
            _ => Activity::Other(label.to_string()),
        }
    }
}

/// One reason an alert fired, listed in policy priority order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AlertCondition {
    Anomaly { score: f32 },
    BeingMoved,
    Obstructed,
    Missing,
    LowConfidence { confidence: f32 },
}

impl AlertCondition {
    pub fn severity(&self) -> Severity {
        match self {
            AlertCondition::Anomaly { .. } | AlertCondition::Missing => Severity::High,
            AlertCondition::BeingMoved | AlertCondition::Obstructed => Severity::Medium,
            AlertCondition::LowConfidence { .. } => Severity::Low,
        }
    }

    /// Position in the policy list; lower wins severity ties.
    pub fn priority(&self) -> u8 {
        match self {
            AlertCondition::Anomaly { .. } => 0,
            AlertCondition::BeingMoved => 1,
            AlertCondition::Obstructed => 2,
            AlertCondition::Missing => 3,
            AlertCondition::LowConfidence { .. } => 4,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AlertCondition::Anomaly { .. } => "anomaly",
            AlertCondition::BeingMoved => "movement",
            AlertCondition::Obstructed => "obstruction",
            AlertCondition::Missing => "missing",
            AlertCondition::LowConfidence { .. } => "low_confidence",
        }
    }

    pub fn message(&self, class_label: &str) -> String {
        match self {
            AlertCondition::Anomaly { score } => {
                format!("High anomaly score detected: {score:.2}")
            }
            AlertCondition::BeingMoved => format!("{class_label} is being moved"),
            AlertCondition::Obstructed => format!("{class_label} is obstructed"),
            AlertCondition::Missing => {
                format!("{class_label} is missing from expected location")
            }
            AlertCondition::LowConfidence { confidence } => {
                format!("Low confidence detection: {confidence:.2}")
            }
        }
    }
}
