//! YOLOv8 ONNX detector.
//!
//! Runs a YOLOv8 model through ONNX Runtime with automatic execution
//! provider selection (CUDA on Linux when enabled, CoreML on macOS, CPU
//! otherwise). The ONNX session is not safe for concurrent runs, so it is
//! serialized behind a mutex; pipelines sharing one detector queue on it.

use std::path::Path;
use std::sync::Mutex;

use image::RgbImage;
use ndarray::Array;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::{Tensor, Value};
use tracing::{debug, info};

use lens_models::{BoundingBox, Detection};

use crate::error::{MediaError, MediaResult};

use super::{DetectorConfig, ObjectDetector};

/// COCO class names (80 classes).
pub const COCO_CLASSES: &[&str] = &[
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck",
    "boat", "traffic light", "fire hydrant", "stop sign", "parking meter", "bench",
    "bird", "cat", "dog", "horse", "sheep", "cow", "elephant", "bear", "zebra",
    "giraffe", "backpack", "umbrella", "handbag", "tie", "suitcase", "frisbee",
    "skis", "snowboard", "sports ball", "kite", "baseball bat", "baseball glove",
    "skateboard", "surfboard", "tennis racket", "bottle", "wine glass", "cup",
    "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich", "orange",
    "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch",
    "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse",
    "remote", "keyboard", "cell phone", "microwave", "oven", "toaster", "sink",
    "refrigerator", "book", "clock", "vase", "scissors", "teddy bear", "hair drier",
    "toothbrush",
];

const NUM_CLASSES: usize = 80;
// 4 bbox values (cx, cy, w, h) + 80 class scores per candidate
const NUM_FEATURES: usize = 84;

/// Object detector backed by a YOLOv8 ONNX model.
pub struct YoloDetector {
    session: Mutex<Session>,
    config: DetectorConfig,
}

impl YoloDetector {
    /// Load the model from the configured path.
    ///
    /// Returns `ModelNotFound` if the file is missing.
    pub fn new(config: DetectorConfig) -> MediaResult<Self> {
        let model_path = Path::new(&config.model_path);
        if !model_path.exists() {
            return Err(MediaError::model_not_found(&config.model_path));
        }

        let session = Mutex::new(create_session(model_path)?);
        info!(
            model_path = %config.model_path,
            input_size = config.input_size,
            confidence = config.confidence_threshold,
            iou = config.iou_threshold,
            "YOLO detector initialized"
        );

        Ok(Self { session, config })
    }

    /// Get the configuration.
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Preprocess: resize to the square input size, normalize to [0, 1],
    /// and lay out as NCHW.
    fn preprocess(&self, img: &RgbImage) -> MediaResult<Value> {
        let size = self.config.input_size;
        let resized = image::imageops::resize(img, size, size, image::imageops::FilterType::Triangle);

        let (w, h) = (size as usize, size as usize);
        let mut chw_data: Vec<f32> = Vec::with_capacity(3 * h * w);
        for c in 0..3 {
            for y in 0..h {
                for x in 0..w {
                    let pixel = resized.get_pixel(x as u32, y as u32);
                    chw_data.push(pixel[c] as f32 / 255.0);
                }
            }
        }

        let shape = vec![1usize, 3, h, w];
        Tensor::from_array((shape, chw_data.into_boxed_slice()))
            .map(Value::from)
            .map_err(|e| MediaError::inference_failed(format!("failed to create tensor: {e}")))
    }

    /// Run the ONNX session.
    fn run_session(&self, input: Value) -> MediaResult<Vec<f32>> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| MediaError::internal("detector session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| MediaError::inference_failed(format!("ONNX inference failed: {e}")))?;

        let output = outputs
            .get("output0")
            .ok_or_else(|| MediaError::inference_failed("missing output0 tensor"))?;

        let tensor = output
            .try_extract_tensor::<f32>()
            .map_err(|e| MediaError::inference_failed(format!("failed to extract tensor: {e}")))?;

        Ok(tensor.1.iter().copied().collect())
    }

    /// Postprocess YOLOv8 output: `[1, 84, N]` where N is the candidate
    /// count for the input size. Applies the confidence threshold, picks
    /// the best class per candidate, scales boxes back to source-image
    /// pixels, and runs NMS.
    fn postprocess(
        &self,
        outputs: &[f32],
        orig_width: u32,
        orig_height: u32,
    ) -> MediaResult<Vec<Detection>> {
        if outputs.is_empty() || outputs.len() % NUM_FEATURES != 0 {
            return Err(MediaError::inference_failed(format!(
                "unexpected output size: {}",
                outputs.len()
            )));
        }
        let num_boxes = outputs.len() / NUM_FEATURES;

        // Output is [84, N]; transpose to iterate candidates
        let output_array = Array::from_shape_vec((NUM_FEATURES, num_boxes), outputs.to_vec())
            .map_err(|e| MediaError::inference_failed(format!("failed to reshape output: {e}")))?;
        let transposed = output_array.t();

        let input_size = self.config.input_size as f32;
        let scale_w = orig_width as f32 / input_size;
        let scale_h = orig_height as f32 / input_size;

        let mut candidates: Vec<Detection> = Vec::new();
        for i in 0..num_boxes {
            let mut best_class = 0;
            let mut best_score = 0.0f32;
            for c in 0..NUM_CLASSES {
                let score = transposed[[i, 4 + c]];
                if score > best_score {
                    best_score = score;
                    best_class = c;
                }
            }
            if best_score < self.config.confidence_threshold {
                continue;
            }

            // Center format in model coordinates -> corners in source pixels
            let cx = transposed[[i, 0]];
            let cy = transposed[[i, 1]];
            let w = transposed[[i, 2]];
            let h = transposed[[i, 3]];

            let x1 = ((cx - w / 2.0) * scale_w).clamp(0.0, orig_width as f32);
            let y1 = ((cy - h / 2.0) * scale_h).clamp(0.0, orig_height as f32);
            let x2 = ((cx + w / 2.0) * scale_w).clamp(0.0, orig_width as f32);
            let y2 = ((cy + h / 2.0) * scale_h).clamp(0.0, orig_height as f32);

            let bbox = BoundingBox::new(x1, y1, x2, y2);
            if !bbox.is_valid() {
                continue;
            }

            candidates.push(Detection {
                class_id: best_class,
                class_name: COCO_CLASSES[best_class].to_string(),
                confidence: best_score,
                bbox,
            });
        }

        Ok(non_maximum_suppression(candidates, self.config.iou_threshold))
    }
}

impl ObjectDetector for YoloDetector {
    fn infer(&self, image: &RgbImage) -> MediaResult<Vec<Detection>> {
        let (width, height) = image.dimensions();
        let input = self.preprocess(image)?;
        let outputs = self.run_session(input)?;
        let detections = self.postprocess(&outputs, width, height)?;

        debug!(count = detections.len(), "detection completed");
        Ok(detections)
    }

    fn name(&self) -> &'static str {
        "yolov8-onnx"
    }
}

/// Remove overlapping same-class detections, keeping the most confident.
fn non_maximum_suppression(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    if detections.is_empty() {
        return detections;
    }

    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = Vec::new();
    let mut suppressed = vec![false; detections.len()];

    for i in 0..detections.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(detections[i].clone());

        for j in (i + 1)..detections.len() {
            if suppressed[j] || detections[i].class_id != detections[j].class_id {
                continue;
            }
            if detections[i].bbox.iou(&detections[j].bbox) > iou_threshold {
                suppressed[j] = true;
            }
        }
    }

    keep
}

/// Create ONNX Runtime session with automatic execution provider selection.
fn create_session(model_path: &Path) -> MediaResult<Session> {
    let model_bytes = std::fs::read(model_path)?;

    let mut builder = Session::builder()
        .map_err(|e| MediaError::internal(format!("failed to create session builder: {e}")))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| MediaError::internal(format!("failed to set optimization level: {e}")))?;

    #[cfg(all(target_os = "linux", feature = "cuda"))]
    {
        use ort::execution_providers::CUDAExecutionProvider;
        if let Ok(cuda_builder) = builder
            .clone()
            .with_execution_providers([CUDAExecutionProvider::default().build()])
        {
            if let Ok(session) = cuda_builder.commit_from_memory(&model_bytes) {
                info!("Using CUDA execution provider for detection");
                return Ok(session);
            }
        }
        debug!("CUDA execution provider not available, trying alternatives");
    }

    #[cfg(target_os = "macos")]
    {
        use ort::execution_providers::CoreMLExecutionProvider;
        if let Ok(coreml_builder) = builder
            .clone()
            .with_execution_providers([CoreMLExecutionProvider::default().build()])
        {
            if let Ok(session) = coreml_builder.commit_from_memory(&model_bytes) {
                info!("Using CoreML execution provider for detection");
                return Ok(session);
            }
        }
        debug!("CoreML execution provider not available, using CPU");
    }

    info!("Using CPU execution provider for detection");
    builder
        .commit_from_memory(&model_bytes)
        .map_err(|e| MediaError::internal(format!("failed to load ONNX model: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coco_classes() {
        assert_eq!(COCO_CLASSES[0], "person");
        assert_eq!(COCO_CLASSES[41], "cup");
        assert_eq!(COCO_CLASSES.len(), 80);
    }

    #[test]
    fn test_missing_model_is_rejected() {
        let config = DetectorConfig {
            model_path: "/nonexistent/model.onnx".to_string(),
            ..DetectorConfig::default()
        };
        let err = YoloDetector::new(config).err().expect("load should fail");
        match err {
            MediaError::ModelNotFound(path) => assert!(path.contains("nonexistent")),
            other => panic!("expected ModelNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_garbage_model_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bogus.onnx");
        std::fs::write(&path, b"not an onnx graph").unwrap();

        let config = DetectorConfig {
            model_path: path.to_string_lossy().into_owned(),
            ..DetectorConfig::default()
        };
        assert!(YoloDetector::new(config).is_err());
    }

    fn det(class_id: usize, confidence: f32, x1: f32) -> Detection {
        Detection {
            class_id,
            class_name: COCO_CLASSES[class_id].to_string(),
            confidence,
            bbox: BoundingBox::new(x1, 0.0, x1 + 10.0, 10.0),
        }
    }

    #[test]
    fn test_nms_suppresses_same_class_overlap() {
        // Two heavily overlapping cups, one bird elsewhere
        let input = vec![det(41, 0.9, 0.0), det(41, 0.6, 1.0), det(14, 0.7, 50.0)];
        let kept = non_maximum_suppression(input, 0.5);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].class_id, 41);
        assert!((kept[0].confidence - 0.9).abs() < 1e-6);
        assert_eq!(kept[1].class_id, 14);
    }

    #[test]
    fn test_nms_keeps_different_classes() {
        // Same box, different classes: both survive
        let a = det(0, 0.9, 0.0);
        let mut b = det(2, 0.8, 0.0);
        b.bbox = a.bbox;
        let kept = non_maximum_suppression(vec![a, b], 0.5);
        assert_eq!(kept.len(), 2);
    }
}
