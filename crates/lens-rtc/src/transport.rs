//! Peer transport boundary.
//!
//! Session negotiation, ICE, encryption and packetization live behind the
//! `PeerTransport` trait. Implementations surface everything the session
//! manager needs through an event channel: state changes and new tracks.
//! No callbacks are registered on the transport; the manager's dispatch
//! loop is the single consumer.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use lens_media::{FrameOutput, FrameSource};
use lens_models::{SessionDescription, SessionState};

use crate::error::RtcResult;

/// Kind of media carried by a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Video,
    Audio,
}

/// An inbound decoded track paired with its outbound counterpart.
pub struct MediaTrack {
    pub kind: TrackKind,
    /// Decoded frames as delivered by the remote peer
    pub source: Box<dyn FrameSource>,
    /// Destination for processed frames sent back to the peer
    pub output: Box<dyn FrameOutput>,
}

/// Asynchronous notifications from the transport layer.
pub enum TransportEvent {
    /// The underlying connection changed state. Terminal states release
    /// the session.
    StateChanged(SessionState),
    /// The remote peer added a media track.
    TrackAdded(MediaTrack),
}

/// Black-box peer connection primitive.
///
/// Implementations must drop their `TransportEvent` sender when the
/// connection closes so the manager's dispatch loop terminates.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Apply the remote offer and produce the local answer.
    async fn negotiate(&self, offer: SessionDescription) -> RtcResult<SessionDescription>;

    /// Tear down the connection and release transport resources.
    async fn close(&self) -> RtcResult<()>;
}

/// Creates one transport per incoming session offer.
#[async_trait]
pub trait TransportFactory: Send + Sync {
    async fn connect(&self) -> RtcResult<(Arc<dyn PeerTransport>, mpsc::Receiver<TransportEvent>)>;
}
