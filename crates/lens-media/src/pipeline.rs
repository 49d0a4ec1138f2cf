//! Per-track frame pipeline.
//!
//! One pipeline owns one inbound video track. Frame steps are strictly
//! sequential: the decimation counter and last-process time are single-owner
//! state, so frame K+1 is never examined before frame K's step completes.
//! Inference and publish failures never reach the media path; the pipeline
//! degrades to passing the original frame through (fail-open).

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use image::RgbImage;
use metrics::counter;
use tracing::{debug, info, warn};

use lens_models::{Detection, DetectionBatch, SessionId, VideoFrame};

use crate::detect::ObjectDetector;
use crate::error::{MediaError, MediaResult};
use crate::overlay;

/// Upstream end of a track: yields decoded frames in presentation order.
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Receive the next frame, suspending until the transport delivers one.
    ///
    /// Returns `MediaError::Upstream` on end of stream or transport failure.
    async fn recv(&mut self) -> MediaResult<VideoFrame>;
}

/// Downstream end of a track: accepts processed frames for the peer.
#[async_trait]
pub trait FrameOutput: Send {
    /// Forward one frame to the outbound track.
    async fn send(&mut self, frame: VideoFrame) -> MediaResult<()>;
}

#[async_trait]
impl FrameOutput for Box<dyn FrameOutput> {
    async fn send(&mut self, frame: VideoFrame) -> MediaResult<()> {
        (**self).send(frame).await
    }
}

/// Fire-and-forget consumer of detection batches.
///
/// `publish` must return without waiting on delivery; delivery failures are
/// the implementation's concern and never surface here.
pub trait BatchPublisher: Send + Sync {
    fn publish(&self, batch: DetectionBatch);
}

/// Pipeline tuning knobs.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Run inference on every Nth frame (1-indexed counter, eligible when
    /// `counter % n == 0`).
    pub decimation_factor: u64,
    /// Emit a throughput log line every this many processed frames.
    pub log_interval: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            decimation_factor: 3,
            log_interval: 30,
        }
    }
}

/// Per-pipeline counters. Mutated only by the pipeline's own step.
#[derive(Debug, Clone)]
pub struct PipelineStats {
    /// Total frames read from upstream
    pub frames: u64,
    /// Frames returned without inference
    pub skipped: u64,
    /// Wall-clock time of the last processing cycle
    pub last_process: Instant,
}

impl PipelineStats {
    fn new() -> Self {
        Self {
            frames: 0,
            skipped: 0,
            last_process: Instant::now(),
        }
    }
}

/// Frame pipeline for one video track.
pub struct FramePipeline {
    session_id: SessionId,
    source: Box<dyn FrameSource>,
    detector: Arc<dyn ObjectDetector>,
    publisher: Option<Arc<dyn BatchPublisher>>,
    config: PipelineConfig,
    stats: PipelineStats,
}

impl FramePipeline {
    pub fn new(
        session_id: SessionId,
        source: Box<dyn FrameSource>,
        detector: Arc<dyn ObjectDetector>,
        publisher: Option<Arc<dyn BatchPublisher>>,
        config: PipelineConfig,
    ) -> Self {
        info!(
            session_id = %session_id,
            detector = detector.name(),
            decimation = config.decimation_factor,
            "frame pipeline attached"
        );
        Self {
            session_id,
            source,
            detector,
            publisher,
            config,
            stats: PipelineStats::new(),
        }
    }

    /// Current counters.
    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    /// Produce the next outbound frame.
    ///
    /// The returned frame always carries the input frame's pts and
    /// time-base. Only upstream read failure is returned as an error;
    /// inference failures degrade to the unannotated input frame.
    pub async fn next_frame(&mut self) -> MediaResult<VideoFrame> {
        let frame = self.source.recv().await?;
        self.stats.frames += 1;
        let frame_id = self.stats.frames;
        counter!("lens_frames_total").increment(1);

        if frame_id % self.config.decimation_factor != 0 {
            self.stats.skipped += 1;
            counter!("lens_frames_skipped").increment(1);
            if self.stats.skipped % self.config.log_interval == 0 {
                debug!(
                    session_id = %self.session_id,
                    skipped = self.stats.skipped,
                    "skipping frames for latency"
                );
            }
            return Ok(frame);
        }

        // Processing cycle: inference failure falls back to the input frame
        let detections = match self.run_inference(&frame).await {
            Ok(d) => d,
            Err(e) => {
                counter!("lens_inference_failures").increment(1);
                warn!(
                    session_id = %self.session_id,
                    frame_id,
                    error = %e,
                    "inference failed, passing frame through"
                );
                self.stats.last_process = Instant::now();
                return Ok(frame);
            }
        };

        let annotated = overlay::annotate(&frame, &detections, frame_id);

        if !detections.is_empty() {
            counter!("lens_detections_total").increment(detections.len() as u64);
            if let Some(publisher) = &self.publisher {
                publisher.publish(DetectionBatch::now(
                    frame_id,
                    self.session_id.to_string(),
                    detections,
                ));
            }
        }

        if frame_id % self.config.log_interval == 0 {
            let elapsed = self.stats.last_process.elapsed();
            info!(
                session_id = %self.session_id,
                frame_id,
                elapsed_ms = elapsed.as_millis() as u64,
                "processing cycle throughput"
            );
        }
        self.stats.last_process = Instant::now();

        Ok(annotated)
    }

    /// Drive the pipeline until upstream ends or the output rejects a frame.
    pub async fn run<O: FrameOutput>(mut self, mut output: O) -> PipelineStats {
        loop {
            match self.next_frame().await {
                Ok(frame) => {
                    if let Err(e) = output.send(frame).await {
                        warn!(session_id = %self.session_id, error = %e, "outbound track closed");
                        break;
                    }
                }
                Err(e) => {
                    info!(session_id = %self.session_id, reason = %e, "track ended");
                    break;
                }
            }
        }
        self.stats
    }

    /// Run the detector on a worker thread so CPU-bound inference does not
    /// stall pipelines of other sessions.
    async fn run_inference(&self, frame: &VideoFrame) -> MediaResult<Vec<Detection>> {
        let image = RgbImage::from_raw(frame.width, frame.height, frame.data.clone())
            .ok_or_else(|| MediaError::invalid_frame("buffer length does not match dimensions"))?;

        let detector = Arc::clone(&self.detector);
        tokio::task::spawn_blocking(move || detector.infer(&image))
            .await
            .map_err(|e| MediaError::inference_failed(format!("inference task panicked: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use lens_models::{BoundingBox, TimeBase};

    struct ScriptedSource {
        frames: VecDeque<VideoFrame>,
    }

    impl ScriptedSource {
        fn new(frames: Vec<VideoFrame>) -> Self {
            Self {
                frames: frames.into(),
            }
        }
    }

    #[async_trait]
    impl FrameSource for ScriptedSource {
        async fn recv(&mut self) -> MediaResult<VideoFrame> {
            self.frames
                .pop_front()
                .ok_or_else(|| MediaError::upstream("end of stream"))
        }
    }

    struct CollectingOutput {
        frames: Arc<Mutex<Vec<VideoFrame>>>,
    }

    #[async_trait]
    impl FrameOutput for CollectingOutput {
        async fn send(&mut self, frame: VideoFrame) -> MediaResult<()> {
            self.frames.lock().unwrap().push(frame);
            Ok(())
        }
    }

    /// Always returns one cup detection.
    struct CupDetector;

    impl ObjectDetector for CupDetector {
        fn infer(&self, _image: &RgbImage) -> MediaResult<Vec<Detection>> {
            Ok(vec![Detection {
                class_id: 41,
                class_name: "cup".to_string(),
                confidence: 0.91,
                bbox: BoundingBox::new(10.0, 10.0, 50.0, 50.0),
            }])
        }

        fn name(&self) -> &'static str {
            "stub-cup"
        }
    }

    struct EmptyDetector;

    impl ObjectDetector for EmptyDetector {
        fn infer(&self, _image: &RgbImage) -> MediaResult<Vec<Detection>> {
            Ok(vec![])
        }

        fn name(&self) -> &'static str {
            "stub-empty"
        }
    }

    struct FailingDetector;

    impl ObjectDetector for FailingDetector {
        fn infer(&self, _image: &RgbImage) -> MediaResult<Vec<Detection>> {
            Err(MediaError::inference_failed("model exploded"))
        }

        fn name(&self) -> &'static str {
            "stub-failing"
        }
    }

    #[derive(Default)]
    struct RecordingPublisher {
        batches: Mutex<Vec<DetectionBatch>>,
    }

    impl BatchPublisher for RecordingPublisher {
        fn publish(&self, batch: DetectionBatch) {
            self.batches.lock().unwrap().push(batch);
        }
    }

    fn frames_with_pts(pts_values: &[i64]) -> Vec<VideoFrame> {
        pts_values
            .iter()
            .map(|&pts| VideoFrame::black(64, 64, pts, TimeBase::VIDEO_90KHZ))
            .collect()
    }

    fn pipeline(
        frames: Vec<VideoFrame>,
        detector: Arc<dyn ObjectDetector>,
        publisher: Option<Arc<dyn BatchPublisher>>,
    ) -> FramePipeline {
        FramePipeline::new(
            SessionId::new(),
            Box::new(ScriptedSource::new(frames)),
            detector,
            publisher,
            PipelineConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_output_timestamps_match_input_in_order() {
        let pts = [0i64, 33, 66, 100, 133, 166];
        let mut p = pipeline(frames_with_pts(&pts), Arc::new(CupDetector), None);

        let mut out_pts = Vec::new();
        for _ in 0..pts.len() {
            let f = p.next_frame().await.unwrap();
            assert_eq!(f.time_base, TimeBase::VIDEO_90KHZ);
            out_pts.push(f.pts);
        }
        assert_eq!(out_pts, pts);

        // Upstream exhausted: terminal error, not a fabricated frame
        assert!(matches!(p.next_frame().await, Err(MediaError::Upstream(_))));
    }

    #[tokio::test]
    async fn test_decimation_annotates_every_third_frame() {
        let pts = [0i64, 33, 66, 100, 133, 166];
        let publisher = Arc::new(RecordingPublisher::default());
        let mut p = pipeline(
            frames_with_pts(&pts),
            Arc::new(CupDetector),
            Some(publisher.clone() as Arc<dyn BatchPublisher>),
        );

        let mut outputs = Vec::new();
        for _ in 0..pts.len() {
            outputs.push(p.next_frame().await.unwrap());
        }

        let blank = VideoFrame::black(64, 64, 0, TimeBase::VIDEO_90KHZ);
        for (i, frame) in outputs.iter().enumerate() {
            let annotated = frame.data != blank.data;
            // 1-indexed frames 3 and 6 are the eligible ones
            assert_eq!(annotated, (i + 1) % 3 == 0, "frame {}", i + 1);
        }

        let batches = publisher.batches.lock().unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].frame_id, 3);
        assert_eq!(batches[1].frame_id, 6);
        assert_eq!(batches[0].detections.len(), 1);
        assert_eq!(batches[0].detections[0].class_name, "cup");
    }

    #[tokio::test]
    async fn test_detector_failure_passes_frame_through_unchanged() {
        let pts = [0i64, 33, 66];
        let publisher = Arc::new(RecordingPublisher::default());
        let mut p = pipeline(
            frames_with_pts(&pts),
            Arc::new(FailingDetector),
            Some(publisher.clone() as Arc<dyn BatchPublisher>),
        );

        let blank = VideoFrame::black(64, 64, 0, TimeBase::VIDEO_90KHZ);
        for (i, &expect_pts) in pts.iter().enumerate() {
            let f = p.next_frame().await.unwrap();
            assert_eq!(f.pts, expect_pts, "frame {}", i + 1);
            // Byte-identical to input, including the eligible frame 3
            assert_eq!(f.data, blank.data, "frame {}", i + 1);
        }

        assert!(publisher.batches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_zero_detections_publish_nothing() {
        let publisher = Arc::new(RecordingPublisher::default());
        let mut p = pipeline(
            frames_with_pts(&[0, 33, 66]),
            Arc::new(EmptyDetector),
            Some(publisher.clone() as Arc<dyn BatchPublisher>),
        );

        for _ in 0..3 {
            p.next_frame().await.unwrap();
        }
        assert!(publisher.batches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_drains_source_and_counts() {
        let pts = [0i64, 33, 66, 100];
        let collected = Arc::new(Mutex::new(Vec::new()));
        let p = pipeline(frames_with_pts(&pts), Arc::new(EmptyDetector), None);

        let stats = p
            .run(CollectingOutput {
                frames: collected.clone(),
            })
            .await;

        assert_eq!(stats.frames, 4);
        assert_eq!(stats.skipped, 3);
        let out = collected.lock().unwrap();
        assert_eq!(out.len(), 4);
        assert_eq!(out.iter().map(|f| f.pts).collect::<Vec<_>>(), pts);
    }

    #[tokio::test]
    async fn test_decimation_factor_one_processes_every_frame() {
        let publisher = Arc::new(RecordingPublisher::default());
        let mut p = FramePipeline::new(
            SessionId::new(),
            Box::new(ScriptedSource::new(frames_with_pts(&[0, 33]))),
            Arc::new(CupDetector),
            Some(publisher.clone() as Arc<dyn BatchPublisher>),
            PipelineConfig {
                decimation_factor: 1,
                ..PipelineConfig::default()
            },
        );

        p.next_frame().await.unwrap();
        p.next_frame().await.unwrap();
        assert_eq!(publisher.batches.lock().unwrap().len(), 2);
    }
}
