//! Fire-and-forget delivery of detection batches to a downstream HTTP sink.
//!
//! Detection events are best-effort telemetry: delivery failures are logged
//! and dropped, never retried, and never visible to the frame pipeline.

pub mod error;
pub mod publisher;

pub use error::{SinkError, SinkResult};
pub use publisher::{DetectionSink, SinkConfig};
