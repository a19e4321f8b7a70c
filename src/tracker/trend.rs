use serde::{Deserialize, Serialize};

/// Number of smoothed values a track keeps for trend classification.
pub const TREND_HISTORY: usize = 10;

/// Number of trailing values compared when classifying a trend.
const TREND_LOOKBACK: usize = 5;

/// Qualitative direction of a track's recent smoothed confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    /// Fewer than three smoothed values seen so far
    #[default]
    Initializing,
    Increasing,
    Stable,
    Decreasing,
}

impl Trend {
    /// Classify the last few values of `history` (oldest first).
    ///
    /// Counts strict rises and strict falls between consecutive values among the
    /// last five; a direction wins only when it leads the other by more than one.
    pub fn classify(history: &[f32]) -> Trend {
        if history.len() < 3 {
            return Trend::Initializing;
        }

        let recent = &history[history.len().saturating_sub(TREND_LOOKBACK)..];
        let (increases, decreases) =
            recent
                .windows(2)
                .fold((0usize, 0usize), |(inc, dec), pair| match pair[1].partial_cmp(&pair[0]) {
                    Some(std::cmp::Ordering::Greater) => (inc + 1, dec),
                    Some(std::cmp::Ordering::Less) => (inc, dec + 1),
                    _ => (inc, dec),
                });

        if increases > decreases + 1 {
            Trend::Increasing
        } else if decreases > increases + 1 {
            Trend::Decreasing
        } else {
            Trend::Stable
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Initializing => "initializing",
            Trend::Increasing => "increasing",
            Trend::Stable => "stable",
            Trend::Decreasing => "decreasing",
        }
    }
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
