//! Frame pipeline and object detection for the LensRT relay.
//!
//! This crate provides:
//! - The per-track frame pipeline: adaptive decimation, fail-open inference,
//!   overlay rendering and timing preservation
//! - The `ObjectDetector` trait and a YOLOv8 ONNX implementation
//! - Overlay drawing on raw RGB24 buffers

pub mod detect;
pub mod error;
pub mod overlay;
pub mod pipeline;

pub use detect::{DetectorConfig, ObjectDetector, YoloDetector, COCO_CLASSES};
pub use error::{MediaError, MediaResult};
pub use pipeline::{
    BatchPublisher, FrameOutput, FramePipeline, FrameSource, PipelineConfig, PipelineStats,
};
