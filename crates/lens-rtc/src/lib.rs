//! Peer session lifecycle management.
//!
//! This crate owns the set of live peer sessions: negotiation, state
//! transitions delivered as transport events, per-track frame pipeline
//! tasks, and coordinated teardown. The underlying peer transport is a
//! black-box primitive behind the `PeerTransport` trait.

pub mod error;
pub mod loopback;
pub mod manager;
pub mod registry;
pub mod transport;

pub use error::{RtcError, RtcResult};
pub use loopback::LoopbackFactory;
pub use manager::SessionManager;
pub use registry::SessionRegistry;
pub use transport::{MediaTrack, PeerTransport, TrackKind, TransportEvent, TransportFactory};
