//! FusionPipeline for running fusion, tracking and alerting on one frame at a time.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::alert::{Alert, AlertPolicy, rank_alerts};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::fusion::{BoxFusion, Detection};
use crate::tracker::{EnrichedDetection, IdentityResolver, TrackId, TrackRegistry, TrackingStats};

use super::SignalSource;

/// Everything produced for one frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameReport {
    pub detections: Vec<EnrichedDetection>,
    /// Most severe first
    pub alerts: Vec<Alert>,
    /// Tracks dropped at the end of this frame
    pub evicted: Vec<TrackId>,
}

/// Fusion, tracking and alerting bundled behind a single per-frame call.
///
/// The pipeline owns its [`TrackRegistry`], so `&mut self` on
/// [`process_frame`](Self::process_frame) is the single-writer guarantee.
#[derive(Debug)]
pub struct FusionPipeline {
    fusion: BoxFusion,
    registry: TrackRegistry,
    alerts: AlertPolicy,
}

impl FusionPipeline {
    /// Create a new pipeline from a validated configuration.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            fusion: BoxFusion::new(config.fusion)?,
            registry: TrackRegistry::new(config.registry)?,
            alerts: config.alerts,
        })
    }

    /// Create a new pipeline with default configuration.
    pub fn with_default_config() -> Result<Self> {
        Self::new(PipelineConfig::default())
    }

    /// Swap in a custom identity strategy. Starts from an empty registry.
    pub fn with_resolver(mut self, resolver: Box<dyn IdentityResolver>) -> Result<Self> {
        self.registry = TrackRegistry::with_resolver(self.registry.config().clone(), resolver)?;
        Ok(self)
    }

    /// Process a single frame: fuse, track, alert, then evict stale tracks.
    ///
    /// `detection_sets[i]` holds the output of detector `i`. A frame rejected
    /// during fusion or tracking leaves the registry untouched. Tracking and
    /// eviction both commit before signals are requested, so an out-of-range
    /// anomaly score fails the call but leaves the registry fully housekept.
    pub fn process_frame(
        &mut self,
        detection_sets: &[Vec<Detection>],
        timestamp: f64,
        signals: &mut impl SignalSource,
    ) -> Result<FrameReport> {
        let fused = self.fusion.fuse(detection_sets)?;
        let detections = self.registry.update(fused, timestamp)?;
        let evicted = self.registry.evict_expired(timestamp)?;

        let mut alerts = Vec::new();
        for enriched in &detections {
            let signal = signals.signal_for(enriched);
            if let Some(alert) = self.alerts.generate_for(enriched, &signal)? {
                alerts.push(alert);
            }
        }
        rank_alerts(&mut alerts);

        debug!(
            timestamp,
            detections = detections.len(),
            alerts = alerts.len(),
            evicted = evicted.len(),
            active_tracks = self.registry.len(),
            "frame processed"
        );

        Ok(FrameReport {
            detections,
            alerts,
            evicted,
        })
    }

    pub fn stats(&self) -> TrackingStats {
        self.registry.stats()
    }

    pub fn fusion(&self) -> &BoxFusion {
        &self.fusion
    }

    /// Get a reference to the underlying track registry.
    pub fn registry(&self) -> &TrackRegistry {
        &self.registry
    }

    /// Get a mutable reference to the underlying track registry.
    pub fn registry_mut(&mut self) -> &mut TrackRegistry {
        &mut self.registry
    }

    pub fn alert_policy(&self) -> &AlertPolicy {
        &self.alerts
    }
}
