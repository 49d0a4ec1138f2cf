//! Live session set.
//!
//! The registry is the only state shared between offer handlers, transport
//! event dispatch and shutdown. It exposes add/remove/drain operations
//! only; callers never iterate the underlying map.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use lens_models::{SessionId, SessionState};

use crate::transport::PeerTransport;

/// Everything owned on behalf of one live session.
pub(crate) struct SessionEntry {
    pub state: SessionState,
    pub transport: Arc<dyn PeerTransport>,
    /// Frame pipeline tasks, one per video track
    pub pipelines: Vec<JoinHandle<()>>,
    /// Transport event dispatch task
    pub dispatcher: Option<JoinHandle<()>>,
}

impl SessionEntry {
    pub(crate) fn new(transport: Arc<dyn PeerTransport>) -> Self {
        Self {
            state: SessionState::New,
            transport,
            pipelines: Vec::new(),
            dispatcher: None,
        }
    }
}

/// Concurrency-safe registry of live sessions.
#[derive(Default)]
pub struct SessionRegistry {
    inner: Mutex<HashMap<SessionId, SessionEntry>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }

    pub(crate) async fn insert(&self, id: SessionId, entry: SessionEntry) {
        self.inner.lock().await.insert(id, entry);
    }

    pub(crate) async fn remove(&self, id: SessionId) -> Option<SessionEntry> {
        self.inner.lock().await.remove(&id)
    }

    /// Record a non-terminal state transition. Terminal transitions go
    /// through `remove` instead.
    pub(crate) async fn set_state(&self, id: SessionId, state: SessionState) {
        if let Some(entry) = self.inner.lock().await.get_mut(&id) {
            entry.state = state;
        }
    }

    pub(crate) async fn push_pipeline(&self, id: SessionId, handle: JoinHandle<()>) {
        if let Some(entry) = self.inner.lock().await.get_mut(&id) {
            entry.pipelines.push(handle);
        } else {
            // Session vanished while the track was being attached
            handle.abort();
        }
    }

    pub(crate) async fn set_dispatcher(&self, id: SessionId, handle: JoinHandle<()>) {
        if let Some(entry) = self.inner.lock().await.get_mut(&id) {
            entry.dispatcher = Some(handle);
        } else {
            handle.abort();
        }
    }

    /// Remove and return every live session for bulk teardown.
    pub(crate) async fn drain(&self) -> Vec<(SessionId, SessionEntry)> {
        self.inner.lock().await.drain().collect()
    }
}
