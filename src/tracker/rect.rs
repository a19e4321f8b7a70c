//! Box geometry: format conversions, IoU and coordinate-space handling.

use nalgebra::Point2;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::InvalidInput;

/// Axis-aligned box stored as top-left corner plus extent.
///
/// Detectors report boxes in one of three layouts, all accepted here:
/// - TLWH: left, top, width, height (the storage layout)
/// - TLBR: left, top, right, bottom
/// - XYWH: center x, center y, width, height
///
/// A `Rect` does not know which coordinate space it lives in. Callers pick one
/// space per call (see [`CoordinateSpace`]) and convert explicitly with
/// [`Rect::normalize`] / [`Rect::denormalize`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Coordinate convention shared by every box in one fusion call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateSpace {
    /// Pixel coordinates of the source image.
    #[default]
    Pixel,
    /// Unit coordinates; every edge must lie in `[0, 1]`.
    Normalized,
}

/// Image dimensions used for pixel/unit conversions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: f32,
    pub height: f32,
}

impl ImageSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Outcome of checking a box that is not outright malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxCheck {
    Valid,
    /// Zero area. Skipped by fusion, never an error.
    Degenerate,
}

impl Rect {
    #[inline]
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// From corner coordinates `(x1, y1)` / `(x2, y2)`.
    #[inline]
    pub fn from_tlbr(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self::new(x1, y1, x2 - x1, y2 - y1)
    }

    /// From a center point and extent.
    #[inline]
    pub fn from_xywh(cx: f32, cy: f32, width: f32, height: f32) -> Self {
        Self::new(cx - 0.5 * width, cy - 0.5 * height, width, height)
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    #[inline]
    pub fn to_tlbr(&self) -> [f32; 4] {
        [self.x, self.y, self.right(), self.bottom()]
    }

    #[inline]
    pub fn to_tlwh(&self) -> [f32; 4] {
        [self.x, self.y, self.width, self.height]
    }

    #[inline]
    pub fn center(&self) -> (f32, f32) {
        (self.x + 0.5 * self.width, self.y + 0.5 * self.height)
    }

    #[inline]
    pub fn center_point(&self) -> Point2<f32> {
        let (cx, cy) = self.center();
        Point2::new(cx, cy)
    }

    #[inline]
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Convert pixel coordinates to unit coordinates for an image of `size`.
    pub fn normalize(&self, size: ImageSize) -> Self {
        Self {
            x: self.x / size.width,
            y: self.y / size.height,
            width: self.width / size.width,
            height: self.height / size.height,
        }
    }

    /// Convert unit coordinates back to pixel coordinates for an image of `size`.
    pub fn denormalize(&self, size: ImageSize) -> Self {
        Self {
            x: self.x * size.width,
            y: self.y * size.height,
            width: self.width * size.width,
            height: self.height * size.height,
        }
    }

    /// Reject non-finite or inverted boxes; report zero-area boxes as degenerate.
    pub fn validate(&self) -> Result<BoxCheck, InvalidInput> {
        let malformed = |reason| InvalidInput::MalformedBox {
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
            reason,
        };

        if !self.to_tlwh().iter().all(|v| v.is_finite()) {
            return Err(malformed("non-finite coordinate"));
        }
        if self.width < 0.0 || self.height < 0.0 {
            return Err(malformed("negative extent"));
        }
        if self.area() <= 0.0 {
            return Ok(BoxCheck::Degenerate);
        }
        Ok(BoxCheck::Valid)
    }

    /// Whether every edge lies inside the unit square.
    pub fn is_within_unit(&self) -> bool {
        self.to_tlbr().iter().all(|v| (0.0..=1.0).contains(v))
    }

    /// Area shared with `other`; zero when the boxes only touch or are apart.
    pub fn intersection_area(&self, other: &Rect) -> f32 {
        let overlap_w = self.right().min(other.right()) - self.x.max(other.x);
        let overlap_h = self.bottom().min(other.bottom()) - self.y.max(other.y);
        overlap_w.max(0.0) * overlap_h.max(0.0)
    }

    /// Intersection over union, in `[0, 1]`.
    ///
    /// Returns 0 when the boxes are disjoint or either box has non-positive area.
    pub fn iou(&self, other: &Rect) -> f32 {
        let (area_a, area_b) = (self.area(), other.area());
        if area_a <= 0.0 || area_b <= 0.0 {
            return 0.0;
        }

        let shared = self.intersection_area(other);
        let union = area_a + area_b - shared;
        if union <= 0.0 {
            return 0.0;
        }
        (shared / union).clamp(0.0, 1.0)
    }
}

/// Pairwise IoU, shape `(boxes_a.len(), boxes_b.len())`.
pub fn iou_batch(boxes_a: &[Rect], boxes_b: &[Rect]) -> Array2<f32> {
    Array2::from_shape_fn((boxes_a.len(), boxes_b.len()), |(i, j)| {
        boxes_a[i].iou(&boxes_b[j])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_layouts_agree() {
        let from_corners = Rect::from_tlbr(4.0, 6.0, 24.0, 36.0);
        let from_center = Rect::from_xywh(14.0, 21.0, 20.0, 30.0);

        assert_eq!(from_corners.to_tlwh(), [4.0, 6.0, 20.0, 30.0]);
        assert_eq!(from_corners.to_tlbr(), [4.0, 6.0, 24.0, 36.0]);
        assert_eq!(from_corners.center(), (14.0, 21.0));
        for (a, b) in from_center.to_tlwh().iter().zip(from_corners.to_tlwh()) {
            assert_relative_eq!(*a, b);
        }
    }

    #[test]
    fn test_normalize_round_trip() {
        let size = ImageSize::new(640.0, 480.0);
        let rect = Rect::from_tlbr(64.0, 48.0, 320.0, 240.0);
        let unit = rect.normalize(size);

        for (a, b) in unit.to_tlbr().iter().zip([0.1, 0.1, 0.5, 0.5]) {
            assert!((a - b).abs() < 1e-6);
        }
        assert!(unit.is_within_unit());

        let back = unit.denormalize(size);
        for (a, b) in back.to_tlbr().iter().zip(rect.to_tlbr()) {
            assert!((a - b).abs() < 1e-3);
        }
    }

    #[test]
    fn test_iou_partial_overlap() {
        let a = Rect::new(0.0, 0.0, 100.0, 100.0);
        let b = Rect::new(25.0, 0.0, 100.0, 100.0);

        // 7500 shared over 12500 covered
        assert_relative_eq!(a.intersection_area(&b), 7500.0);
        assert_relative_eq!(a.iou(&b), 0.6, epsilon = 1e-6);
    }

    #[test]
    fn test_touching_boxes_do_not_overlap() {
        let a = Rect::new(0.0, 0.0, 8.0, 8.0);
        let b = Rect::new(8.0, 0.0, 8.0, 8.0);
        assert_eq!(a.intersection_area(&b), 0.0);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_iou_degenerate_box_is_zero() {
        let a = Rect::new(2.0, 2.0, 12.0, 12.0);
        let flat = Rect::new(2.0, 2.0, 12.0, 0.0);
        assert_eq!(a.iou(&flat), 0.0);
        assert_eq!(flat.iou(&flat), 0.0);
    }

    #[test]
    fn test_validate() {
        assert_eq!(Rect::new(0.0, 0.0, 1.0, 1.0).validate(), Ok(BoxCheck::Valid));
        assert_eq!(
            Rect::new(5.0, 5.0, 0.0, 3.0).validate(),
            Ok(BoxCheck::Degenerate)
        );
        assert!(matches!(
            Rect::from_tlbr(10.0, 0.0, 5.0, 5.0).validate(),
            Err(InvalidInput::MalformedBox { reason: "negative extent", .. })
        ));
        assert!(matches!(
            Rect::new(f32::NAN, 0.0, 1.0, 1.0).validate(),
            Err(InvalidInput::MalformedBox { .. })
        ));
    }

    #[test]
    fn test_iou_batch_shape() {
        let a = [Rect::new(0.0, 0.0, 100.0, 100.0), Rect::new(500.0, 500.0, 10.0, 10.0)];
        let b = [Rect::new(0.0, 0.0, 100.0, 100.0), Rect::new(25.0, 0.0, 100.0, 100.0)];
        let ious = iou_batch(&a, &b);
        assert_eq!(ious.dim(), (2, 2));
        assert_relative_eq!(ious[[0, 0]], 1.0);
        assert_relative_eq!(ious[[0, 1]], 0.6, epsilon = 1e-6);
        assert_eq!(ious.row(1).sum(), 0.0);
    }

    fn arb_rect() -> impl Strategy<Value = Rect> {
        (0.0f32..500.0, 0.0f32..500.0, 1.0f32..200.0, 1.0f32..200.0)
            .prop_map(|(x, y, w, h)| Rect::new(x, y, w, h))
    }

    proptest! {
        #[test]
        fn iou_is_symmetric(a in arb_rect(), b in arb_rect()) {
            prop_assert!((a.iou(&b) - b.iou(&a)).abs() < 1e-6);
        }

        #[test]
        fn iou_is_bounded(a in arb_rect(), b in arb_rect()) {
            let iou = a.iou(&b);
            prop_assert!((0.0..=1.0).contains(&iou));
        }

        #[test]
        fn iou_with_self_is_one(a in arb_rect()) {
            prop_assert!((a.iou(&a) - 1.0).abs() < 1e-5);
        }

        #[test]
        fn iou_of_disjoint_boxes_is_zero(a in arb_rect(), gap in 0.0f32..100.0) {
            let b = Rect::new(a.x + a.width + gap, a.y, a.width, a.height);
            prop_assert_eq!(a.iou(&b), 0.0);
        }
    }
}
