//! Track registry: owns every live track and drives identity, smoothing and eviction.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{FusionError, InvalidInput, Result};
use crate::fusion::FusedDetection;
use crate::tracker::identity::{IdentityResolver, IdentityStrategy};
use crate::tracker::smoothing::{SmoothingConfig, TemporalSmoother};
use crate::tracker::track::{Track, TrackId};
use crate::tracker::trend::Trend;

/// Configuration for the [`TrackRegistry`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// How fused detections are mapped to track identities
    pub identity: IdentityStrategy,
    /// Time units a track survives without a sighting
    pub max_age: f64,
    pub smoothing: SmoothingConfig,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            identity: IdentityStrategy::default(),
            max_age: 2.0,
            smoothing: SmoothingConfig::default(),
        }
    }
}

impl RegistryConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.max_age.is_finite() && self.max_age >= 0.0) {
            return Err(FusionError::InvalidConfig(format!(
                "max_age must be finite and non-negative, got {}",
                self.max_age
            )));
        }
        match self.identity {
            IdentityStrategy::Grid { cell_size } if !(cell_size.is_finite() && cell_size > 0.0) => {
                return Err(FusionError::InvalidConfig(format!(
                    "grid cell_size must be finite and positive, got {cell_size}"
                )));
            }
            IdentityStrategy::Centroid { max_distance }
                if !(max_distance.is_finite() && max_distance >= 0.0) =>
            {
                return Err(FusionError::InvalidConfig(format!(
                    "centroid max_distance must be finite and non-negative, got {max_distance}"
                )));
            }
            _ => {}
        }
        self.smoothing.validate()
    }
}

/// A fused detection annotated with the state of the track it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedDetection {
    pub fused: FusedDetection,
    pub track_id: TrackId,
    /// Frames the track has been observed in, this one included
    pub age: u32,
    pub smoothed_confidence: f32,
    pub trend: Trend,
    /// `smoothed_confidence - fused.confidence`
    pub temporal_boost: f32,
}

impl EnrichedDetection {
    pub fn class_label(&self) -> &str {
        &self.fused.class_label
    }

    /// Raw fused confidence before smoothing.
    pub fn raw_confidence(&self) -> f32 {
        self.fused.confidence
    }
}

/// Summary of the registry's current contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackingStats {
    pub active_tracks: usize,
    /// Sum of the ages of all live tracks
    pub total_detections: u64,
    pub mean_track_age: f32,
    pub max_track_age: u32,
    pub track_ids: Vec<TrackId>,
}

/// Owner of all live tracks.
///
/// Every mutation goes through `&mut self`, so a registry has exactly one
/// writer per call. Share one across workers only behind a lock.
#[derive(Debug)]
pub struct TrackRegistry {
    tracks: HashMap<TrackId, Track>,
    resolver: Box<dyn IdentityResolver>,
    smoother: TemporalSmoother,
    config: RegistryConfig,
}

impl TrackRegistry {
    pub fn new(config: RegistryConfig) -> Result<Self> {
        let resolver = config.identity.build();
        Self::with_resolver(config, resolver)
    }

    /// Use a custom identity strategy; `config.identity` is ignored.
    pub fn with_resolver(config: RegistryConfig, resolver: Box<dyn IdentityResolver>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            tracks: HashMap::new(),
            resolver,
            smoother: TemporalSmoother::new(config.smoothing.clone())?,
            config,
        })
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Assign every fused detection to a track and advance that track's smoothing state.
    ///
    /// Inputs are validated up front, so a rejected call leaves the registry
    /// untouched. Each track is rebuilt off to the side and swapped in whole.
    pub fn update(
        &mut self,
        fused: Vec<FusedDetection>,
        timestamp: f64,
    ) -> Result<Vec<EnrichedDetection>> {
        if !timestamp.is_finite() {
            return Err(InvalidInput::InvalidTimestamp(timestamp).into());
        }
        for det in &fused {
            det.validate()?;
        }

        let ids = self.resolver.resolve_frame(&fused, &self.tracks);
        if ids.len() != fused.len() {
            return Err(FusionError::InvalidConfig(format!(
                "identity resolver returned {} ids for {} detections",
                ids.len(),
                fused.len()
            )));
        }

        let mut created = 0usize;
        let mut enriched = Vec::with_capacity(fused.len());
        for (det, track_id) in fused.into_iter().zip(ids) {
            let base = match self.tracks.get(&track_id) {
                Some(track) => track.clone(),
                None => {
                    created += 1;
                    debug!(track_id = %track_id, class = %det.class_label, "new track");
                    Track::new(track_id.clone(), det.class_label.clone(), timestamp)
                }
            };

            let next = self
                .smoother
                .smooth(base.observe(det.bbox, timestamp), det.confidence);

            enriched.push(EnrichedDetection {
                track_id: track_id.clone(),
                age: next.age,
                smoothed_confidence: next.smoothed_confidence,
                trend: next.trend,
                temporal_boost: next.smoothed_confidence - det.confidence,
                fused: det,
            });
            self.tracks.insert(track_id, next);
        }

        debug!(
            detections = enriched.len(),
            created,
            live = self.tracks.len(),
            timestamp,
            "registry updated"
        );
        Ok(enriched)
    }

    /// Remove every track last seen more than `max_age` before `timestamp`.
    ///
    /// Returns the evicted ids in sorted order. A non-finite `timestamp` or a
    /// negative `max_age` is rejected and evicts nothing.
    pub fn evict_stale(&mut self, timestamp: f64, max_age: f64) -> Result<Vec<TrackId>> {
        if !timestamp.is_finite() {
            return Err(InvalidInput::InvalidTimestamp(timestamp).into());
        }
        if !(max_age.is_finite() && max_age >= 0.0) {
            return Err(FusionError::InvalidConfig(format!(
                "max_age must be finite and non-negative, got {max_age}"
            )));
        }

        let mut stale: Vec<TrackId> = self
            .tracks
            .values()
            .filter(|t| t.is_stale(timestamp, max_age))
            .map(|t| t.track_id.clone())
            .collect();
        stale.sort();

        for track_id in &stale {
            self.tracks.remove(track_id);
            self.resolver.forget(track_id);
        }

        if !stale.is_empty() {
            info!(
                evicted = stale.len(),
                remaining = self.tracks.len(),
                timestamp,
                "evicted stale tracks"
            );
        }
        Ok(stale)
    }

    /// [`evict_stale`](Self::evict_stale) with the configured `max_age`.
    pub fn evict_expired(&mut self, timestamp: f64) -> Result<Vec<TrackId>> {
        self.evict_stale(timestamp, self.config.max_age)
    }

    pub fn get(&self, track_id: &TrackId) -> Option<&Track> {
        self.tracks.get(track_id)
    }

    pub fn contains(&self, track_id: &TrackId) -> bool {
        self.tracks.contains_key(track_id)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }

    pub fn clear(&mut self) {
        for track_id in self.tracks.keys() {
            self.resolver.forget(track_id);
        }
        self.tracks.clear();
    }

    pub fn stats(&self) -> TrackingStats {
        let mut track_ids: Vec<TrackId> = self.tracks.keys().cloned().collect();
        track_ids.sort();

        let total_detections: u64 = self.tracks.values().map(|t| t.age as u64).sum();
        let max_track_age = self.tracks.values().map(|t| t.age).max().unwrap_or(0);
        let mean_track_age = if self.tracks.is_empty() {
            0.0
        } else {
            total_detections as f32 / self.tracks.len() as f32
        };

        TrackingStats {
            active_tracks: self.tracks.len(),
            total_detections,
            mean_track_age,
            max_track_age,
            track_ids,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fusion::Detection;
    use crate::tracker::rect::Rect;

    fn fused(class: &str, conf: f32, cx: f32, cy: f32) -> FusedDetection {
        FusedDetection::from_detection(&Detection::from_rect(
            0,
            class,
            conf,
            Rect::from_xywh(cx, cy, 40.0, 40.0),
        ))
    }

    #[test]
    fn test_same_cell_keeps_identity() {
        let mut registry = TrackRegistry::new(RegistryConfig::default()).unwrap();

        let first = registry.update(vec![fused("tank", 0.7, 150.0, 150.0)], 0.0).unwrap();
        let second = registry.update(vec![fused("tank", 0.7, 160.0, 140.0)], 0.1).unwrap();

        assert_eq!(first[0].track_id, second[0].track_id);
        assert_eq!(first[0].age, 1);
        assert_eq!(second[0].age, 2);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_invalid_input_leaves_registry_untouched() {
        let mut registry = TrackRegistry::new(RegistryConfig::default()).unwrap();
        registry.update(vec![fused("tank", 0.7, 150.0, 150.0)], 0.0).unwrap();
        let before = registry.get(&TrackId::new("tank_1_1")).cloned().unwrap();

        let result = registry.update(
            vec![fused("tank", 0.7, 150.0, 150.0), fused("tank", 1.5, 50.0, 50.0)],
            0.1,
        );
        assert!(matches!(
            result,
            Err(FusionError::InvalidInput(InvalidInput::ConfidenceOutOfRange { .. }))
        ));
        assert_eq!(registry.get(&TrackId::new("tank_1_1")), Some(&before));
        assert_eq!(registry.len(), 1);

        assert!(registry.update(vec![], f64::NAN).is_err());
    }

    #[test]
    fn test_eviction_removes_stale_tracks_only() {
        let mut registry = TrackRegistry::new(RegistryConfig::default()).unwrap();
        registry.update(vec![fused("tank", 0.7, 50.0, 50.0)], 0.0).unwrap();
        registry.update(vec![fused("helmet", 0.7, 450.0, 50.0)], 1.5).unwrap();

        let evicted = registry.evict_stale(2.5, 2.0).unwrap();
        assert_eq!(evicted, vec![TrackId::new("tank_0_0")]);
        assert!(registry.get(&TrackId::new("tank_0_0")).is_none());
        assert!(registry.contains(&TrackId::new("helmet_4_0")));

        // exactly max_age old is still live
        assert!(registry.evict_stale(3.5, 2.0).unwrap().is_empty());
        assert_eq!(registry.evict_expired(3.6).unwrap().len(), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_eviction_rejects_bad_arguments() {
        let mut registry = TrackRegistry::new(RegistryConfig::default()).unwrap();
        registry.update(vec![fused("tank", 0.7, 50.0, 50.0)], 1.0).unwrap();

        // a negative max_age would otherwise drop the track just updated
        assert!(matches!(
            registry.evict_stale(1.0, -0.5),
            Err(FusionError::InvalidConfig(_))
        ));
        assert!(matches!(
            registry.evict_stale(f64::NAN, 2.0),
            Err(FusionError::InvalidInput(InvalidInput::InvalidTimestamp(_)))
        ));
        assert!(registry.evict_expired(f64::INFINITY).is_err());
        assert!(registry.evict_stale(1.0, f64::NAN).is_err());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_evicted_identity_restarts_fresh() {
        let mut registry = TrackRegistry::new(RegistryConfig::default()).unwrap();
        for t in 0..5 {
            registry.update(vec![fused("tank", 0.7, 50.0, 50.0)], t as f64 * 0.1).unwrap();
        }
        assert_eq!(registry.get(&TrackId::new("tank_0_0")).unwrap().age, 5);

        registry.evict_stale(10.0, 2.0).unwrap();
        let again = registry.update(vec![fused("tank", 0.7, 50.0, 50.0)], 10.0).unwrap();
        assert_eq!(again[0].age, 1);
        assert_eq!(again[0].smoothed_confidence, 0.7);
        assert_eq!(again[0].trend, Trend::Initializing);
    }

    #[test]
    fn test_stats() {
        let mut registry = TrackRegistry::new(RegistryConfig::default()).unwrap();
        assert_eq!(registry.stats(), TrackingStats::default());

        registry
            .update(vec![fused("tank", 0.7, 50.0, 50.0), fused("helmet", 0.6, 250.0, 50.0)], 0.0)
            .unwrap();
        registry.update(vec![fused("tank", 0.7, 50.0, 50.0)], 0.1).unwrap();

        let stats = registry.stats();
        assert_eq!(stats.active_tracks, 2);
        assert_eq!(stats.total_detections, 3);
        assert_eq!(stats.max_track_age, 2);
        assert!((stats.mean_track_age - 1.5).abs() < 1e-6);
        assert_eq!(
            stats.track_ids,
            vec![TrackId::new("helmet_2_0"), TrackId::new("tank_0_0")]
        );
    }

    #[test]
    fn test_temporal_boost_reported() {
        let mut registry = TrackRegistry::new(RegistryConfig::default()).unwrap();
        let first = registry.update(vec![fused("tank", 0.5, 50.0, 50.0)], 0.0).unwrap();
        assert_eq!(first[0].temporal_boost, 0.0);

        let second = registry.update(vec![fused("tank", 0.5, 50.0, 50.0)], 0.1).unwrap();
        assert!(second[0].temporal_boost > 0.0);
        assert_eq!(second[0].raw_confidence(), 0.5);
    }

    #[test]
    fn test_invalid_config() {
        let config = RegistryConfig {
            identity: IdentityStrategy::Grid { cell_size: 0.0 },
            ..RegistryConfig::default()
        };
        assert!(TrackRegistry::new(config).is_err());

        let config = RegistryConfig {
            max_age: -1.0,
            ..RegistryConfig::default()
        };
        assert!(TrackRegistry::new(config).is_err());
    }
}
