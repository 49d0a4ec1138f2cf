//! Object detection boundary.
//!
//! The pipeline treats the detector as a possibly-slow, possibly-failing
//! synchronous function. Implementations must be safe for concurrent
//! invocation from multiple pipelines, or serialize access internally.

mod yolo;

use image::RgbImage;
use lens_models::Detection;

use crate::error::MediaResult;

pub use yolo::{YoloDetector, COCO_CLASSES};

/// Synchronous object detector.
///
/// `infer` must not retain references to the input image past the call.
pub trait ObjectDetector: Send + Sync {
    /// Run detection on one RGB frame, returning boxes in source-image
    /// pixel coordinates.
    fn infer(&self, image: &RgbImage) -> MediaResult<Vec<Detection>>;

    /// Implementation name for logging.
    fn name(&self) -> &'static str;
}

/// Configuration for object detection.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Path to ONNX model file
    pub model_path: String,
    /// Confidence threshold for detections
    pub confidence_threshold: f32,
    /// IoU threshold for NMS
    pub iou_threshold: f32,
    /// Model input size (square)
    pub input_size: u32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model_path: "models/yolov8n.onnx".to_string(),
            // Tuned for latency over recall: small input, high thresholds
            confidence_threshold: 0.5,
            iou_threshold: 0.5,
            input_size: 320,
        }
    }
}

impl DetectorConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            model_path: std::env::var("MODEL_PATH").unwrap_or(defaults.model_path),
            confidence_threshold: std::env::var("DETECTOR_CONFIDENCE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.confidence_threshold),
            iou_threshold: std::env::var("DETECTOR_IOU")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.iou_threshold),
            input_size: std::env::var("DETECTOR_INPUT_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.input_size),
        }
    }
}
