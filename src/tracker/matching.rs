//! Assignment utilities for associating detections with live tracks.

use ndarray::Array2;
use tracing::warn;

use crate::tracker::rect::Rect;

/// Cost used to pad the assignment matrix to a square.
const PADDING_COST: f64 = 1e6;

/// Euclidean distance between box centers, shape (detections, tracks).
pub fn center_distance(det_boxes: &[Rect], track_boxes: &[Rect]) -> Array2<f32> {
    let mut dists = Array2::zeros((det_boxes.len(), track_boxes.len()));
    for (i, d) in det_boxes.iter().enumerate() {
        for (j, t) in track_boxes.iter().enumerate() {
            dists[[i, j]] = nalgebra::distance(&d.center_point(), &t.center_point());
        }
    }
    dists
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentResult {
    /// (row, column) pairs whose cost is within the cap
    pub matches: Vec<(usize, usize)>,
    pub unmatched_rows: Vec<usize>,
    pub unmatched_cols: Vec<usize>,
}

/// Minimum-cost one-to-one assignment, rejecting pairs that cost more than `max_cost`.
pub fn linear_assignment(cost_matrix: &Array2<f32>, max_cost: f32) -> AssignmentResult {
    let (num_rows, num_cols) = cost_matrix.dim();

    if num_rows == 0 || num_cols == 0 {
        return AssignmentResult {
            matches: vec![],
            unmatched_rows: (0..num_rows).collect(),
            unmatched_cols: (0..num_cols).collect(),
        };
    }

    let size = num_rows.max(num_cols);
    let mut padded = Array2::<f64>::from_elem((size, size), PADDING_COST);
    for ((i, j), &cost) in cost_matrix.indexed_iter() {
        // Over-cap pairs are priced like padding so they never displace a valid pair.
        padded[[i, j]] = if cost <= max_cost {
            cost as f64
        } else {
            PADDING_COST
        };
    }

    let mut matches = vec![];
    let mut unmatched_rows = vec![];
    let mut col_taken = vec![false; num_cols];

    match lapjv::lapjv(&padded) {
        Ok((row_to_col, _)) => {
            for (row, &col) in row_to_col.iter().enumerate().take(num_rows) {
                if col < num_cols && cost_matrix[[row, col]] <= max_cost {
                    matches.push((row, col));
                    col_taken[col] = true;
                } else {
                    unmatched_rows.push(row);
                }
            }
        }
        Err(err) => {
            warn!(?err, rows = num_rows, cols = num_cols, "assignment solver failed");
            unmatched_rows = (0..num_rows).collect();
        }
    }

    let unmatched_cols = col_taken
        .iter()
        .enumerate()
        .filter_map(|(j, &taken)| (!taken).then_some(j))
        .collect();

    AssignmentResult {
        matches,
        unmatched_rows,
        unmatched_cols,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_center_distance() {
        let dets = [Rect::new(0.0, 0.0, 10.0, 10.0)];
        let tracks = [Rect::new(3.0, 4.0, 10.0, 10.0), Rect::new(0.0, 0.0, 20.0, 20.0)];
        let d = center_distance(&dets, &tracks);
        assert_eq!(d.dim(), (1, 2));
        assert!((d[[0, 0]] - 5.0).abs() < 1e-6);
        assert!((d[[0, 1]] - 50f32.sqrt()).abs() < 1e-5);
    }

    #[test]
    fn test_assignment_prefers_global_minimum() {
        // Greedy row-first matching would pair (0, 0) and leave row 1 with cost 9.
        let cost = array![[1.0f32, 2.0], [1.5, 9.0]];
        let result = linear_assignment(&cost, 5.0);
        let mut matches = result.matches.clone();
        matches.sort();
        assert_eq!(matches, vec![(0, 1), (1, 0)]);
        assert!(result.unmatched_rows.is_empty());
        assert!(result.unmatched_cols.is_empty());
    }

    #[test]
    fn test_assignment_respects_cap() {
        let cost = array![[1.0f32, 50.0], [60.0, 70.0]];
        let result = linear_assignment(&cost, 10.0);
        assert_eq!(result.matches, vec![(0, 0)]);
        assert_eq!(result.unmatched_rows, vec![1]);
        assert_eq!(result.unmatched_cols, vec![1]);
    }

    #[test]
    fn test_assignment_empty() {
        let cost = Array2::<f32>::zeros((0, 3));
        let result = linear_assignment(&cost, 1.0);
        assert!(result.matches.is_empty());
        assert_eq!(result.unmatched_cols, vec![0, 1, 2]);
    }
}
