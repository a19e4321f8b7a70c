//! Top-level configuration for a [`FusionPipeline`](crate::integration::FusionPipeline).
//!
//! Every section falls back to its defaults, so an empty document is a valid config:
//!
//! ```toml
//! [fusion]
//! iou_threshold = 0.55
//! weights = [2.0, 1.0]
//!
//! [registry]
//! max_age = 2.0
//! identity = { kind = "grid", cell_size = 100.0 }
//!
//! [alerts]
//! anomaly_threshold = 0.7
//! ```

use serde::{Deserialize, Serialize};

use crate::alert::AlertPolicy;
use crate::error::Result;
use crate::fusion::FusionConfig;
use crate::tracker::RegistryConfig;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub fusion: FusionConfig,
    pub registry: RegistryConfig,
    pub alerts: AlertPolicy,
}

impl PipelineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.fusion.validate()?;
        self.registry.validate()?;
        self.alerts.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FusionError;
    use crate::tracker::{CoordinateSpace, IdentityStrategy};

    #[test]
    fn test_empty_document_gives_defaults() {
        let config = PipelineConfig::from_toml_str("").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.fusion.iou_threshold, 0.5);
        assert_eq!(config.fusion.skip_threshold, 0.1);
        assert_eq!(config.registry.max_age, 2.0);
        assert_eq!(config.registry.smoothing.window, 5);
        assert_eq!(config.alerts.low_confidence_threshold, 0.4);
    }

    #[test]
    fn test_partial_document() {
        let config = PipelineConfig::from_toml_str(
            r#"
            [fusion]
            weights = [2.0, 1.0]
            coordinate_space = "normalized"

            [registry]
            identity = { kind = "centroid", max_distance = 40.0 }

            [registry.smoothing]
            ema_alpha = 0.5
            "#,
        )
        .unwrap();

        assert_eq!(config.fusion.weights, vec![2.0, 1.0]);
        assert_eq!(config.fusion.coordinate_space, CoordinateSpace::Normalized);
        assert_eq!(config.fusion.iou_threshold, 0.5);
        assert_eq!(
            config.registry.identity,
            IdentityStrategy::Centroid { max_distance: 40.0 }
        );
        assert_eq!(config.registry.smoothing.ema_alpha, 0.5);
        assert_eq!(config.registry.smoothing.window, 5);
    }

    #[test]
    fn test_round_trip_through_toml() {
        let mut config = PipelineConfig::default();
        config.fusion.weights = vec![1.5, 1.0, 0.5];
        config.alerts.anomaly_threshold = 0.8;

        let text = config.to_toml_string().unwrap();
        assert_eq!(PipelineConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        let err = PipelineConfig::from_toml_str("[fusion]\niou_threshold = 1.5\n").unwrap_err();
        assert!(matches!(err, FusionError::InvalidConfig(_)));

        let err = PipelineConfig::from_toml_str("[registry]\nmax_age = -1.0\n").unwrap_err();
        assert!(matches!(err, FusionError::InvalidConfig(_)));
    }

    #[test]
    fn test_rejects_malformed_toml() {
        let err = PipelineConfig::from_toml_str("[fusion\n").unwrap_err();
        assert!(matches!(err, FusionError::Config(_)));
    }
}
