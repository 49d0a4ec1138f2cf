//! Session manager.
//!
//! Accepts session offers, wires inbound video tracks to frame pipelines,
//! reacts to transport state events, and guarantees every session is
//! released on teardown. Sessions never leak: a failed negotiation rolls
//! back the registry entry and closes the transport before the error is
//! returned.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use metrics::gauge;
use tracing::{debug, info, warn};

use lens_media::{BatchPublisher, FramePipeline, ObjectDetector, PipelineConfig};
use lens_models::{SessionDescription, SessionId, SessionState};

use crate::error::{RtcError, RtcResult};
use crate::registry::{SessionEntry, SessionRegistry};
use crate::transport::{TrackKind, TransportEvent, TransportFactory};

const DEFAULT_TEARDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Owns the live session set and all per-session tasks.
pub struct SessionManager {
    factory: Arc<dyn TransportFactory>,
    detector: Arc<dyn ObjectDetector>,
    publisher: Option<Arc<dyn BatchPublisher>>,
    pipeline_config: PipelineConfig,
    registry: SessionRegistry,
    teardown_timeout: Duration,
}

impl SessionManager {
    pub fn new(
        factory: Arc<dyn TransportFactory>,
        detector: Arc<dyn ObjectDetector>,
        publisher: Option<Arc<dyn BatchPublisher>>,
        pipeline_config: PipelineConfig,
    ) -> Self {
        Self {
            factory,
            detector,
            publisher,
            pipeline_config,
            registry: SessionRegistry::new(),
            teardown_timeout: DEFAULT_TEARDOWN_TIMEOUT,
        }
    }

    /// Number of live sessions.
    pub async fn session_count(&self) -> usize {
        self.registry.len().await
    }

    /// Accept an offer: allocate a session, negotiate, and start listening
    /// for transport events.
    ///
    /// On negotiation failure the session is already gone from the live set
    /// and its transport closed when this returns.
    pub async fn create_session(
        self: &Arc<Self>,
        offer: SessionDescription,
    ) -> RtcResult<SessionDescription> {
        let id = SessionId::new();
        let (transport, events) = self.factory.connect().await?;

        let mut entry = SessionEntry::new(Arc::clone(&transport));
        entry.state = SessionState::Negotiating;
        self.registry.insert(id, entry).await;
        gauge!("lens_sessions_active").increment(1.0);
        info!(session_id = %id, "session created, negotiating");

        let answer = match transport.negotiate(offer).await {
            Ok(answer) if !answer.sdp.trim().is_empty() => answer,
            Ok(_) => {
                self.rollback(id).await;
                return Err(RtcError::negotiation("transport produced an empty answer"));
            }
            Err(e) => {
                self.rollback(id).await;
                return Err(RtcError::negotiation(e.to_string()));
            }
        };

        let manager = Arc::clone(self);
        let dispatcher = tokio::spawn(manager.dispatch_events(id, events));
        self.registry.set_dispatcher(id, dispatcher).await;

        info!(session_id = %id, "negotiation complete, answer ready");
        Ok(answer)
    }

    /// Concurrently close every live session and clear the set. Waits for
    /// all closes to finish; each is bounded by the teardown timeout.
    pub async fn shutdown_all(&self) {
        let entries = self.registry.drain().await;
        if entries.is_empty() {
            return;
        }
        info!(sessions = entries.len(), "shutting down all sessions");

        let closes = entries.into_iter().map(|(id, entry)| async move {
            // Stop pipeline work before the transport goes away
            for handle in &entry.pipelines {
                handle.abort();
            }
            if let Some(dispatcher) = &entry.dispatcher {
                dispatcher.abort();
            }
            self.close_transport(id, &entry).await;
            gauge!("lens_sessions_active").decrement(1.0);
        });
        join_all(closes).await;

        info!("all sessions closed");
    }

    /// Single consumer of one session's transport events.
    async fn dispatch_events(
        self: Arc<Self>,
        id: SessionId,
        mut events: tokio::sync::mpsc::Receiver<TransportEvent>,
    ) {
        while let Some(event) = events.recv().await {
            match event {
                TransportEvent::StateChanged(state) => {
                    info!(session_id = %id, %state, "connection state changed");
                    if state.is_terminal() {
                        self.release_session(id).await;
                        break;
                    }
                    self.registry.set_state(id, state).await;
                }
                TransportEvent::TrackAdded(track) => {
                    if track.kind != TrackKind::Video {
                        debug!(session_id = %id, "ignoring non-video track");
                        continue;
                    }
                    let pipeline = FramePipeline::new(
                        id,
                        track.source,
                        Arc::clone(&self.detector),
                        self.publisher.clone(),
                        self.pipeline_config.clone(),
                    );
                    let handle = tokio::spawn(async move {
                        pipeline.run(track.output).await;
                    });
                    self.registry.push_pipeline(id, handle).await;
                }
            }
        }
        debug!(session_id = %id, "event dispatch ended");
    }

    /// Remove one session and release everything it owned.
    async fn release_session(&self, id: SessionId) {
        let Some(entry) = self.registry.remove(id).await else {
            return;
        };
        for handle in &entry.pipelines {
            handle.abort();
        }
        self.close_transport(id, &entry).await;
        gauge!("lens_sessions_active").decrement(1.0);
        info!(session_id = %id, "session released");
    }

    /// Undo a half-created session after a failed negotiation.
    async fn rollback(&self, id: SessionId) {
        warn!(session_id = %id, "negotiation failed, rolling back session");
        self.release_session(id).await;
    }

    async fn close_transport(&self, id: SessionId, entry: &SessionEntry) {
        match tokio::time::timeout(self.teardown_timeout, entry.transport.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(session_id = %id, error = %e, "transport close failed"),
            Err(_) => warn!(session_id = %id, "transport close timed out"),
        }
    }
}
