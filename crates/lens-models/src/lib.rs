//! Shared data models for the LensRT relay.
//!
//! This crate provides Serde-serializable types for:
//! - Detections and pixel-space bounding boxes
//! - Detection batches (the downstream sink wire schema)
//! - Raw video frames and their timing metadata
//! - Session identifiers, states and signaling descriptions

pub mod batch;
pub mod detection;
pub mod frame;
pub mod session;

// Re-export common types
pub use batch::{BatchWire, BoundingBoxWire, DetectionBatch, DetectionWire};
pub use detection::{BoundingBox, Detection};
pub use frame::{TimeBase, VideoFrame};
pub use session::{SessionDescription, SessionId, SessionState};
