//! Bounded fire-and-forget publisher.
//!
//! Batches enter a bounded channel with `try_send`; a background task POSTs
//! them to the sink URL. When the sink cannot keep up the newest batch is
//! dropped and counted, so a slow collaborator can never stall a pipeline
//! or grow an unbounded queue.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use reqwest::Url;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use lens_media::BatchPublisher;
use lens_models::DetectionBatch;

use crate::error::{SinkError, SinkResult};

/// Sink configuration.
#[derive(Debug, Clone)]
pub struct SinkConfig {
    /// Downstream sink URL (POST target)
    pub url: String,
    /// Bounded queue capacity
    pub capacity: usize,
    /// Per-request timeout
    pub request_timeout: Duration,
}

impl SinkConfig {
    /// Create config from environment variables; `None` when no sink URL is
    /// configured (publishing disabled).
    pub fn from_env() -> Option<Self> {
        let url = std::env::var("SINK_URL").ok()?;
        Some(Self {
            url,
            capacity: std::env::var("SINK_QUEUE_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(64),
            request_timeout: Duration::from_secs(
                std::env::var("SINK_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
        })
    }

    /// Config pointing at a fixed URL with defaults elsewhere.
    pub fn for_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            capacity: 64,
            request_timeout: Duration::from_secs(5),
        }
    }
}

/// Handle for publishing detection batches. Cheap to clone; all clones feed
/// the same background sender task.
#[derive(Clone)]
pub struct DetectionSink {
    tx: mpsc::Sender<DetectionBatch>,
    dropped: Arc<AtomicU64>,
}

impl DetectionSink {
    /// Validate the config, spawn the sender task, and return the handle.
    ///
    /// The task exits when every handle has been dropped and the queue has
    /// drained.
    pub fn spawn(config: SinkConfig) -> SinkResult<Self> {
        let url = Url::parse(&config.url).map_err(|e| SinkError::invalid_url(e.to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        let (tx, rx) = mpsc::channel(config.capacity.max(1));
        info!(url = %url, capacity = config.capacity, "detection sink started");
        tokio::spawn(sender_task(client, url, rx));

        Ok(Self {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Batches dropped because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl BatchPublisher for DetectionSink {
    fn publish(&self, batch: DetectionBatch) {
        match self.tx.try_send(batch) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(batch)) => {
                let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                counter!("lens_sink_dropped").increment(1);
                warn!(
                    frame_id = batch.frame_id,
                    session_id = %batch.session_id,
                    dropped_total = total,
                    "sink queue full, dropping newest batch"
                );
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("sink task gone, dropping batch");
            }
        }
    }
}

/// Drains the queue, POSTing each batch. Failures are logged and forgotten.
async fn sender_task(client: reqwest::Client, url: Url, mut rx: mpsc::Receiver<DetectionBatch>) {
    while let Some(batch) = rx.recv().await {
        let wire = batch.to_wire();
        match client.post(url.clone()).json(&wire).send().await {
            Ok(response) if response.status().is_success() => {
                counter!("lens_sink_published").increment(1);
                debug!(frame_id = wire.frame_id, "batch delivered");
            }
            Ok(response) => {
                warn!(
                    frame_id = wire.frame_id,
                    status = %response.status(),
                    "sink rejected batch"
                );
            }
            Err(e) => {
                warn!(frame_id = wire.frame_id, error = %e, "sink unreachable");
            }
        }
    }
    debug!("detection sink drained, sender task exiting");
}
