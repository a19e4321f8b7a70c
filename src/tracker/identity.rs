//! Identity resolution: deciding which track a fused detection belongs to.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::fusion::FusedDetection;
use crate::tracker::matching::{center_distance, linear_assignment};
use crate::tracker::rect::Rect;
use crate::tracker::track::{Track, TrackId};

/// Maps fused detections onto track identities.
///
/// Implementations see the live tracks read-only; the registry owns all
/// mutation. Resolvers that keep their own per-track state must drop it in
/// [`IdentityResolver::forget`].
pub trait IdentityResolver: std::fmt::Debug + Send {
    /// Identity for a single detection.
    fn resolve(&mut self, detection: &FusedDetection, tracks: &HashMap<TrackId, Track>) -> TrackId;

    /// Identities for every detection of one frame, in input order.
    fn resolve_frame(
        &mut self,
        detections: &[FusedDetection],
        tracks: &HashMap<TrackId, Track>,
    ) -> Vec<TrackId> {
        detections
            .iter()
            .map(|det| self.resolve(det, tracks))
            .collect()
    }

    /// Called when a track is evicted from the registry.
    fn forget(&mut self, _track_id: &TrackId) {}
}

/// Which resolver a registry builds from configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IdentityStrategy {
    /// Quantize the box center into square cells of `cell_size` units.
    Grid { cell_size: f32 },
    /// Match box centers to live tracks of the same class, up to `max_distance` units apart.
    Centroid { max_distance: f32 },
}

impl Default for IdentityStrategy {
    fn default() -> Self {
        IdentityStrategy::Grid { cell_size: 100.0 }
    }
}

impl IdentityStrategy {
    pub fn build(&self) -> Box<dyn IdentityResolver> {
        match *self {
            IdentityStrategy::Grid { cell_size } => Box::new(GridResolver::new(cell_size)),
            IdentityStrategy::Centroid { max_distance } => {
                Box::new(CentroidResolver::new(max_distance))
            }
        }
    }
}

/// Stateless identity from `(class, cell_x, cell_y)`.
///
/// Deterministic across restarts. Two same-class objects inside one cell share
/// a track, and an object crossing a cell border starts a new one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridResolver {
    cell_size: f32,
}

impl GridResolver {
    pub fn new(cell_size: f32) -> Self {
        Self { cell_size }
    }

    pub fn cell_of(&self, bbox: &Rect) -> (i64, i64) {
        let (cx, cy) = bbox.center();
        (
            (cx / self.cell_size).floor() as i64,
            (cy / self.cell_size).floor() as i64,
        )
    }
}

impl Default for GridResolver {
    fn default() -> Self {
        Self::new(100.0)
    }
}

impl IdentityResolver for GridResolver {
    fn resolve(&mut self, detection: &FusedDetection, _tracks: &HashMap<TrackId, Track>) -> TrackId {
        let (cell_x, cell_y) = self.cell_of(&detection.bbox);
        TrackId::grid(&detection.class_label, cell_x, cell_y)
    }
}

/// Nearest-centroid matching against live tracks with a distance cap.
///
/// Each frame is solved as one assignment problem per class, so two detections
/// never claim the same track. New identities come from a counter owned by
/// this resolver.
#[derive(Debug, Clone, PartialEq)]
pub struct CentroidResolver {
    max_distance: f32,
    next_seq: u64,
}

impl CentroidResolver {
    pub fn new(max_distance: f32) -> Self {
        Self {
            max_distance,
            next_seq: 0,
        }
    }

    fn fresh_id(&mut self, class_label: &str) -> TrackId {
        self.next_seq += 1;
        TrackId::sequential(class_label, self.next_seq)
    }
}

/// Live tracks of one class, ordered by id so matching is reproducible.
fn tracks_of_class<'a>(tracks: &'a HashMap<TrackId, Track>, class_label: &str) -> Vec<&'a Track> {
    let mut same_class: Vec<&Track> = tracks
        .values()
        .filter(|t| t.class_label == class_label)
        .collect();
    same_class.sort_by(|a, b| a.track_id.cmp(&b.track_id));
    same_class
}

impl IdentityResolver for CentroidResolver {
    fn resolve(&mut self, detection: &FusedDetection, tracks: &HashMap<TrackId, Track>) -> TrackId {
        let center = detection.bbox.center_point();
        let nearest = tracks_of_class(tracks, &detection.class_label)
            .into_iter()
            .map(|t| (t, nalgebra::distance(&center, &t.last_box.center_point())))
            .filter(|(_, d)| *d <= self.max_distance)
            .min_by(|a, b| a.1.total_cmp(&b.1));

        match nearest {
            Some((track, _)) => track.track_id.clone(),
            None => self.fresh_id(&detection.class_label),
        }
    }

    fn resolve_frame(
        &mut self,
        detections: &[FusedDetection],
        tracks: &HashMap<TrackId, Track>,
    ) -> Vec<TrackId> {
        let mut by_class: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (idx, det) in detections.iter().enumerate() {
            by_class.entry(det.class_label.as_str()).or_default().push(idx);
        }

        let mut ids: Vec<Option<TrackId>> = vec![None; detections.len()];
        for (class_label, members) in by_class {
            let candidates = tracks_of_class(tracks, class_label);
            let det_boxes: Vec<Rect> = members.iter().map(|&i| detections[i].bbox).collect();
            let track_boxes: Vec<Rect> = candidates.iter().map(|t| t.last_box).collect();

            let costs = center_distance(&det_boxes, &track_boxes);
            let assignment = linear_assignment(&costs, self.max_distance);
            for (row, col) in assignment.matches {
                ids[members[row]] = Some(candidates[col].track_id.clone());
            }
            for row in assignment.unmatched_rows {
                ids[members[row]] = Some(self.fresh_id(class_label));
            }
        }

        ids.into_iter()
            .zip(detections)
            .map(|(id, det)| id.unwrap_or_else(|| self.fresh_id(&det.class_label)))
            .collect()
    }
}
