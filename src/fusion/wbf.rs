//! Weighted box fusion across independent detectors.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{FusionError, InvalidInput, Result, check_unit_interval};
use crate::fusion::detection::{Contribution, Detection, FusedDetection, distinct_sources};
use crate::tracker::{BoxCheck, CoordinateSpace, Rect, iou_batch};

/// Configuration for [`BoxFusion`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// Minimum IoU with a cluster seed to join its cluster
    pub iou_threshold: f32,
    /// Detections below this confidence are dropped before clustering
    pub skip_threshold: f32,
    /// Per-source trust weights, indexed like the detection sets.
    /// Empty means every source weighs 1.0.
    pub weights: Vec<f32>,
    /// Coordinate convention of every box passed to one `fuse` call
    pub coordinate_space: CoordinateSpace,
    /// Scale fused confidence by the share of sources that voted for the box
    pub rescale_by_coverage: bool,
    /// Confidence multiplier for a box reported by one source alone, indexed
    /// like `weights`. Empty means no penalty.
    pub solo_penalties: Vec<f32>,
    /// Drop a fused box when a more confident same-class box overlaps it by
    /// at least this IoU. `None` disables the pass.
    pub nms_threshold: Option<f32>,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            iou_threshold: 0.5,
            skip_threshold: 0.1,
            weights: Vec::new(),
            coordinate_space: CoordinateSpace::Pixel,
            rescale_by_coverage: false,
            solo_penalties: Vec::new(),
            nms_threshold: None,
        }
    }
}

impl FusionConfig {
    pub fn validate(&self) -> Result<()> {
        check_unit_interval("iou_threshold", self.iou_threshold)?;
        check_unit_interval("skip_threshold", self.skip_threshold)?;
        for (source_id, &weight) in self.weights.iter().enumerate() {
            check_weight(source_id, weight)?;
        }
        for (source_id, &penalty) in self.solo_penalties.iter().enumerate() {
            if !(penalty > 0.0 && penalty <= 1.0) {
                return Err(FusionError::InvalidConfig(format!(
                    "solo penalty for source {source_id} must lie in (0, 1], got {penalty}"
                )));
            }
        }
        if let Some(threshold) = self.nms_threshold {
            check_unit_interval("nms_threshold", threshold)?;
        }
        Ok(())
    }

    /// A primary detector plus a secondary stream of equal trust.
    ///
    /// Boxes only the secondary stream reports keep 80% of their confidence,
    /// and fused boxes overlapping a stronger same-class box at IoU 0.45 or
    /// more are suppressed.
    pub fn primary_secondary() -> Self {
        Self {
            weights: vec![0.5, 0.5],
            solo_penalties: vec![1.0, 0.8],
            nms_threshold: Some(0.45),
            ..Self::default()
        }
    }
}

fn check_weight(source_id: usize, weight: f32) -> Result<()> {
    if weight.is_finite() && weight > 0.0 {
        Ok(())
    } else {
        Err(InvalidInput::InvalidWeight { source_id, weight }.into())
    }
}

/// A detection admitted to clustering, with its source weight attached.
#[derive(Debug, Clone, Copy)]
struct Candidate<'a> {
    det: &'a Detection,
    weight: f32,
}

/// Merges per-source detection sets of one frame into a consensus set.
///
/// Clustering is greedy: the most confident unclustered detection seeds a
/// cluster and absorbs every remaining same-class detection whose IoU with the
/// seed reaches the threshold. Each cluster becomes one [`FusedDetection`]
/// whose box is the confidence-weighted centroid of its members and whose
/// confidence is `Σ(wᵢ·sᵢ) / Σwᵢ`.
#[derive(Debug, Clone, Default)]
pub struct BoxFusion {
    config: FusionConfig,
}

impl BoxFusion {
    pub fn new(config: FusionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// Fuse one frame's detection sets, one set per source.
    ///
    /// Every input is validated before any clustering happens; zero-area boxes
    /// are skipped rather than rejected.
    pub fn fuse(&self, detection_sets: &[Vec<Detection>]) -> Result<Vec<FusedDetection>> {
        let weights = self.source_weights(detection_sets.len())?;
        let penalties = self.solo_penalties(detection_sets.len())?;
        let mut candidates = self.admit(detection_sets, &weights)?;
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        // Stable sort keeps source order among equal confidences.
        candidates.sort_by(|a, b| b.det.confidence.total_cmp(&a.det.confidence));

        let clusters = self.cluster(&candidates);
        let mut fused: Vec<FusedDetection> = clusters
            .iter()
            .map(|members| self.merge(&candidates, members, detection_sets.len(), penalties))
            .collect();
        if let Some(threshold) = self.config.nms_threshold {
            fused = suppress_overlaps(fused, threshold);
        }

        debug!(
            sources = detection_sets.len(),
            candidates = candidates.len(),
            clusters = fused.len(),
            "fused frame detections"
        );
        Ok(fused)
    }

    fn source_weights(&self, num_sources: usize) -> Result<Vec<f32>> {
        if self.config.weights.is_empty() {
            return Ok(vec![1.0; num_sources]);
        }
        if self.config.weights.len() != num_sources {
            return Err(InvalidInput::WeightCountMismatch {
                expected: num_sources,
                got: self.config.weights.len(),
            }
            .into());
        }
        Ok(self.config.weights.clone())
    }

    fn solo_penalties(&self, num_sources: usize) -> Result<&[f32]> {
        let penalties = self.config.solo_penalties.as_slice();
        if !penalties.is_empty() && penalties.len() != num_sources {
            return Err(InvalidInput::PenaltyCountMismatch {
                expected: num_sources,
                got: penalties.len(),
            }
            .into());
        }
        Ok(penalties)
    }

    /// Validate every detection and keep the ones worth clustering.
    fn admit<'a>(
        &self,
        detection_sets: &'a [Vec<Detection>],
        weights: &[f32],
    ) -> Result<Vec<Candidate<'a>>> {
        let mut candidates = Vec::new();
        for (source_id, set) in detection_sets.iter().enumerate() {
            for det in set {
                if det.source_id != source_id {
                    return Err(InvalidInput::SourceMismatch {
                        expected: source_id,
                        found: det.source_id,
                    }
                    .into());
                }

                let check = det.validate()?;
                if self.config.coordinate_space == CoordinateSpace::Normalized
                    && !det.bbox.is_within_unit()
                {
                    return Err(FusionError::InvalidInput(InvalidInput::MalformedBox {
                        x: det.bbox.x,
                        y: det.bbox.y,
                        width: det.bbox.width,
                        height: det.bbox.height,
                        reason: "outside the unit square",
                    }));
                }
                if check == BoxCheck::Degenerate {
                    debug!(source_id, class = %det.class_label, "skipping zero-area box");
                    continue;
                }
                if det.confidence < self.config.skip_threshold {
                    continue;
                }

                candidates.push(Candidate {
                    det,
                    weight: weights[source_id],
                });
            }
        }
        Ok(candidates)
    }

    /// Greedy IoU clustering over candidates sorted by descending confidence.
    fn cluster(&self, candidates: &[Candidate<'_>]) -> Vec<Vec<usize>> {
        let boxes: Vec<Rect> = candidates.iter().map(|c| c.det.bbox).collect();
        let ious = iou_batch(&boxes, &boxes);

        let mut clustered = vec![false; candidates.len()];
        let mut clusters = Vec::new();
        for seed in 0..candidates.len() {
            if clustered[seed] {
                continue;
            }
            clustered[seed] = true;

            let mut members = vec![seed];
            for other in (seed + 1)..candidates.len() {
                if clustered[other]
                    || candidates[other].det.class_label != candidates[seed].det.class_label
                {
                    continue;
                }
                if ious[[seed, other]] >= self.config.iou_threshold {
                    clustered[other] = true;
                    members.push(other);
                }
            }
            clusters.push(members);
        }
        clusters
    }

    fn merge(
        &self,
        candidates: &[Candidate<'_>],
        members: &[usize],
        num_sources: usize,
        penalties: &[f32],
    ) -> FusedDetection {
        let mut weight_sum = 0.0f32;
        let mut score_weight_sum = 0.0f32;
        let mut weighted_corners = [0.0f32; 4];
        let mut plain_corners = [0.0f32; 4];

        for &idx in members {
            let Candidate { det, weight } = candidates[idx];
            let score_weight = weight * det.confidence;
            weight_sum += weight;
            score_weight_sum += score_weight;
            for (k, corner) in det.bbox.to_tlbr().into_iter().enumerate() {
                weighted_corners[k] += score_weight * corner;
                plain_corners[k] += weight * corner;
            }
        }

        // All-zero confidences only get here with a zero skip threshold.
        let corners = if score_weight_sum > 0.0 {
            weighted_corners.map(|c| c / score_weight_sum)
        } else {
            plain_corners.map(|c| c / weight_sum)
        };

        let contributions: Vec<Contribution> = members
            .iter()
            .map(|&idx| Contribution {
                source_id: candidates[idx].det.source_id,
                confidence: candidates[idx].det.confidence,
            })
            .collect();

        // Rounding can nudge a mean of ones past 1.0.
        let mut confidence = (score_weight_sum / weight_sum).min(1.0);
        let voters = distinct_sources(&contributions).min(num_sources);
        if self.config.rescale_by_coverage && num_sources > 0 {
            confidence *= voters as f32 / num_sources as f32;
        }
        if voters == 1 {
            if let Some(&penalty) = penalties.get(contributions[0].source_id) {
                confidence *= penalty;
            }
        }

        let label_source = members
            .iter()
            .map(|&idx| candidates[idx])
            .fold(None::<Candidate<'_>>, |best, c| match best {
                Some(b) if b.weight >= c.weight => Some(b),
                _ => Some(c),
            });
        let class_label = label_source
            .map(|c| c.det.class_label.clone())
            .unwrap_or_default();

        FusedDetection {
            class_label,
            confidence,
            bbox: Rect::from_tlbr(corners[0], corners[1], corners[2], corners[3]),
            contributions,
        }
    }
}

/// Greedy per-class suppression, most confident first. Output is sorted by
/// descending confidence.
fn suppress_overlaps(mut fused: Vec<FusedDetection>, threshold: f32) -> Vec<FusedDetection> {
    fused.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let before = fused.len();
    let mut kept: Vec<FusedDetection> = Vec::with_capacity(before);
    for det in fused {
        let overlapped = kept.iter().any(|k| {
            k.class_label == det.class_label && k.bbox.iou(&det.bbox) >= threshold
        });
        if !overlapped {
            kept.push(det);
        }
    }

    if kept.len() < before {
        debug!(suppressed = before - kept.len(), threshold, "suppressed overlapping fused boxes");
    }
    kept
}

/// Fuse one frame's detection sets with explicit per-source weights.
///
/// `weights` must hold exactly one entry per detection set.
pub fn fuse(
    detection_sets: &[Vec<Detection>],
    weights: &[f32],
    iou_threshold: f32,
    skip_threshold: f32,
) -> Result<Vec<FusedDetection>> {
    if weights.len() != detection_sets.len() {
        return Err(InvalidInput::WeightCountMismatch {
            expected: detection_sets.len(),
            got: weights.len(),
        }
        .into());
    }
    let engine = BoxFusion::new(FusionConfig {
        iou_threshold,
        skip_threshold,
        weights: weights.to_vec(),
        ..FusionConfig::default()
    })?;
    engine.fuse(detection_sets)
}
