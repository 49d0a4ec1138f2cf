//! Downstream sink wire schema.
//!
//! A `DetectionBatch` is constructed once per processed frame, handed to the
//! event publisher, and discarded after the send attempt. The wire layout is
//! fixed: the sink receives `x1/y1/x2/y2` plus derived `width`/`height` for
//! every box.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::detection::Detection;

/// One batch of detections for a single processed frame.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionBatch {
    /// Capture timestamp, unix seconds
    pub timestamp: f64,
    /// Monotonically increasing per-pipeline frame counter (1-indexed)
    pub frame_id: u64,
    /// Session the frame belongs to
    pub session_id: String,
    /// Detections in model output order
    pub detections: Vec<Detection>,
}

impl DetectionBatch {
    /// Build a batch stamped with the current wall-clock time.
    pub fn now(frame_id: u64, session_id: impl Into<String>, detections: Vec<Detection>) -> Self {
        Self {
            timestamp: chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0,
            frame_id,
            session_id: session_id.into(),
            detections,
        }
    }

    /// Convert to the serialized wire form.
    pub fn to_wire(&self) -> BatchWire {
        BatchWire {
            timestamp: self.timestamp,
            frame_id: self.frame_id,
            session_id: self.session_id.clone(),
            detections: self.detections.iter().map(DetectionWire::from).collect(),
        }
    }
}

/// Serialized form of a detection batch (sink POST body).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BatchWire {
    pub timestamp: f64,
    pub frame_id: u64,
    pub session_id: String,
    pub detections: Vec<DetectionWire>,
}

/// Serialized form of a single detection.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DetectionWire {
    pub class_id: usize,
    pub class_name: String,
    pub confidence: f32,
    pub bbox: BoundingBoxWire,
}

/// Serialized bounding box with derived extent fields.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BoundingBoxWire {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub width: f32,
    pub height: f32,
}

impl From<&Detection> for DetectionWire {
    fn from(d: &Detection) -> Self {
        Self {
            class_id: d.class_id,
            class_name: d.class_name.clone(),
            confidence: d.confidence,
            bbox: BoundingBoxWire {
                x1: d.bbox.x1,
                y1: d.bbox.y1,
                x2: d.bbox.x2,
                y2: d.bbox.y2,
                width: d.bbox.width(),
                height: d.bbox.height(),
            },
        }
    }
}
