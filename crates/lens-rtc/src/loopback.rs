//! Loopback transport.
//!
//! A stand-in [`TransportFactory`] that answers every offer by echoing its
//! SDP back and carries no media. It keeps the server runnable without a
//! full WebRTC stack: deployments plug a real transport in through
//! [`TransportFactory`] and everything above it stays the same.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

use lens_models::{SessionDescription, SessionState};

use crate::error::{RtcError, RtcResult};
use crate::transport::{PeerTransport, TransportEvent, TransportFactory};

const EVENT_CHANNEL_CAPACITY: usize = 8;

pub struct LoopbackTransport {
    events: Mutex<Option<mpsc::Sender<TransportEvent>>>,
}

#[async_trait]
impl PeerTransport for LoopbackTransport {
    async fn negotiate(&self, offer: SessionDescription) -> RtcResult<SessionDescription> {
        let guard = self.events.lock().await;
        let tx = guard
            .as_ref()
            .ok_or_else(|| RtcError::negotiation("transport already closed"))?;
        let _ = tx
            .send(TransportEvent::StateChanged(SessionState::Connected))
            .await;
        Ok(SessionDescription::answer(offer.sdp))
    }

    async fn close(&self) -> RtcResult<()> {
        // Dropping the sender ends the event stream, which is how the
        // session manager learns the transport is gone.
        if self.events.lock().await.take().is_some() {
            debug!("loopback transport closed");
        }
        Ok(())
    }
}

pub struct LoopbackFactory;

#[async_trait]
impl TransportFactory for LoopbackFactory {
    async fn connect(&self) -> RtcResult<(Arc<dyn PeerTransport>, mpsc::Receiver<TransportEvent>)> {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let transport = LoopbackTransport {
            events: Mutex::new(Some(tx)),
        };
        Ok((Arc::new(transport), rx))
    }
}
