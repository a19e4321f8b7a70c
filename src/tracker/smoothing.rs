//! Confidence smoothing for tracked objects.
//!
//! The recurrence is deliberately biased upwards: the stability, age and history
//! terms only ever add to the raw confidence, so objects that persist are
//! rewarded. A long-lived low-confidence track can therefore outrank a fresh
//! high-confidence one. Replacing this with a symmetric filter changes alerting
//! behavior and must be treated as a policy change.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{FusionError, Result};
use crate::tracker::track::Track;
use crate::tracker::trend::{TREND_HISTORY, Trend};

const STABILITY_GAIN: f32 = 0.15;
const MAX_VARIANCE: f32 = 0.5;
const AGE_GAIN: f32 = 0.05;
const MAX_AGE_BOOST: f32 = 0.25;
const HISTORY_GAIN: f32 = 0.01;
const MAX_HISTORY_BONUS: f32 = 0.10;

/// Ceiling on smoothed confidence for a fresh track.
const BASE_CEILING: f32 = 0.95;
/// Extra ceiling a fully matured track earns.
const MATURITY_CEILING: f32 = 0.04;
/// Frames until a track counts as fully matured.
const MATURITY_FRAMES: f32 = 100.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Weight of the newest boosted value in the EMA
    pub ema_alpha: f32,
    /// Capacity of each track's raw confidence history
    pub window: usize,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            ema_alpha: 0.3,
            window: 5,
        }
    }
}

impl SmoothingConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.ema_alpha > 0.0 && self.ema_alpha <= 1.0) {
            return Err(FusionError::InvalidConfig(format!(
                "ema_alpha must lie in (0, 1], got {}",
                self.ema_alpha
            )));
        }
        if self.window < 2 {
            return Err(FusionError::InvalidConfig(format!(
                "smoothing window must hold at least 2 samples, got {}",
                self.window
            )));
        }
        Ok(())
    }
}

/// The three additive terms applied on top of the raw confidence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Boosts {
    pub stability: f32,
    pub age: f32,
    pub history: f32,
}

impl Boosts {
    pub fn compute<'a>(history: impl ExactSizeIterator<Item = &'a f32> + Clone, age: u32) -> Self {
        let len = history.len();
        let variance = variance(history);
        Self {
            stability: STABILITY_GAIN * (1.0 - variance.min(MAX_VARIANCE)),
            age: (AGE_GAIN * (1.0 + age as f32).ln()).min(MAX_AGE_BOOST),
            history: (HISTORY_GAIN * len as f32).min(MAX_HISTORY_BONUS),
        }
    }

    pub fn total(&self) -> f32 {
        self.stability + self.age + self.history
    }
}

/// Population variance; zero for an empty history.
fn variance<'a>(values: impl ExactSizeIterator<Item = &'a f32> + Clone) -> f32 {
    let n = values.len();
    if n == 0 {
        return 0.0;
    }
    let mean = values.clone().sum::<f32>() / n as f32;
    values.map(|v| (v - mean).powi(2)).sum::<f32>() / n as f32
}

/// Upper bound on smoothed confidence; rises from 0.95 to 0.99 over the first 100 frames.
pub fn confidence_ceiling(age: u32) -> f32 {
    BASE_CEILING + MATURITY_CEILING * (age as f32 / MATURITY_FRAMES).min(1.0)
}

/// Exponential smoothing of per-track confidence with maturity boosts.
#[derive(Debug, Clone, Default)]
pub struct TemporalSmoother {
    config: SmoothingConfig,
}

impl TemporalSmoother {
    pub fn new(config: SmoothingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SmoothingConfig {
        &self.config
    }

    /// Feed this frame's fused confidence into `track` and return the updated track.
    ///
    /// `track.age` must already count the current sighting. The new smoothed
    /// value is in [`Track::smoothed_confidence`].
    pub fn smooth(&self, mut track: Track, confidence: f32) -> Track {
        track.confidence_history.push_back(confidence);
        while track.confidence_history.len() > self.config.window {
            track.confidence_history.pop_front();
        }

        if track.confidence_history.len() < 2 {
            // First sighting: passed through, and kept out of the trend history.
            track.ema_confidence = Some(confidence);
            track.smoothed_confidence = confidence;
            track.trend = Trend::Initializing;
            return track;
        }

        let boosts = Boosts::compute(track.confidence_history.iter(), track.age);
        let raw_boosted = confidence + boosts.total();
        let alpha = self.config.ema_alpha;
        let ema = match track.ema_confidence {
            Some(prev) => alpha * raw_boosted + (1.0 - alpha) * prev,
            None => raw_boosted,
        };
        track.ema_confidence = Some(ema);

        trace!(
            track_id = %track.track_id,
            confidence,
            stability = boosts.stability,
            age_boost = boosts.age,
            history_bonus = boosts.history,
            ema,
            "smoothed track confidence"
        );
        let smoothed = ema.min(confidence_ceiling(track.age));

        track.smoothed_history.push_back(smoothed);
        while track.smoothed_history.len() > TREND_HISTORY {
            track.smoothed_history.pop_front();
        }
        track.trend = Trend::classify(track.smoothed_history.make_contiguous());
        track.smoothed_confidence = smoothed;
        track
    }
}
