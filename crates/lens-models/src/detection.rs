use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle in source-image pixel coordinates.
///
/// Corners are ordered: `x1 < x2` and `y1 < y2`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BoundingBox {
    /// X coordinate of the top-left corner
    pub x1: f32,
    /// Y coordinate of the top-left corner
    pub y1: f32,
    /// X coordinate of the bottom-right corner
    pub x2: f32,
    /// Y coordinate of the bottom-right corner
    pub y2: f32,
}

impl BoundingBox {
    /// Create a new bounding box from two corners.
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Box width in pixels.
    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    /// Box height in pixels.
    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    /// Box area in square pixels.
    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// Check that the corners are ordered and finite.
    pub fn is_valid(&self) -> bool {
        self.x1.is_finite()
            && self.y1.is_finite()
            && self.x2.is_finite()
            && self.y2.is_finite()
            && self.x1 < self.x2
            && self.y1 < self.y2
    }

    /// Intersection over Union with another box.
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);

        let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
        let union = self.area() + other.area() - inter;

        if union > 0.0 {
            inter / union
        } else {
            0.0
        }
    }
}

/// One labeled, localized, confidence-scored inference result.
///
/// Produced per inference call and consumed immediately by overlay drawing
/// and by the event publisher; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Detection {
    /// Model class index (COCO: 0 = person, 2 = car, ...)
    pub class_id: usize,
    /// Human-readable class label
    pub class_name: String,
    /// Detection confidence [0, 1]
    pub confidence: f32,
    /// Bounding box in source-image pixel coordinates
    pub bbox: BoundingBox,
}

impl Detection {
    /// Caption text drawn next to the box: `"{class} {conf:.2}"`.
    pub fn caption(&self) -> String {
        format!("{} {:.2}", self.class_name, self.confidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_dimensions() {
        let b = BoundingBox::new(10.0, 20.0, 50.0, 60.0);
        assert_eq!(b.width(), 40.0);
        assert_eq!(b.height(), 40.0);
        assert_eq!(b.area(), 1600.0);
        assert!(b.is_valid());
    }

    #[test]
    fn test_bbox_invalid_when_corners_swapped() {
        let b = BoundingBox::new(50.0, 20.0, 10.0, 60.0);
        assert!(!b.is_valid());
    }

    #[test]
    fn test_iou_identical_boxes() {
        let b = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        assert!((b.iou(&b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_iou_disjoint_boxes() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(20.0, 20.0, 30.0, 30.0);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_caption_format() {
        let d = Detection {
            class_id: 41,
            class_name: "cup".to_string(),
            confidence: 0.912,
            bbox: BoundingBox::new(10.0, 10.0, 50.0, 50.0),
        };
        assert_eq!(d.caption(), "cup 0.91");
    }
}
