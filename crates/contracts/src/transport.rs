//! MessageTransport trait - node-to-node byte message channel
//!
//! Models the vendor wearable messaging layer: best-effort, no delivery
//! guarantee, ordered per path, with reachability notifications.

use bytes::Bytes;
use std::sync::Arc;

use crate::{MessagePath, PeerId};

/// Message delivered by the transport
///
/// `path` and `source` are left raw; receivers validate them before use.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub source: String,
    pub path: String,
    pub payload: Bytes,
}

/// Everything a transport can report to its listener
#[derive(Debug, Clone)]
pub enum TransportEvent {
    Message(IncomingMessage),
    PeerReachable(PeerId),
    PeerUnreachable(PeerId),
}

/// Transport event callback type
///
/// May be invoked from any thread; implementations must not block.
pub type TransportCallback = Arc<dyn Fn(TransportEvent) + Send + Sync>;

/// Fire-and-forget message channel between two device nodes
pub trait MessageTransport: Send + Sync {
    /// Identifier of the local node
    fn local_id(&self) -> &PeerId;

    /// Queue a message for delivery
    ///
    /// Never blocks and never reports delivery; lost messages are
    /// indistinguishable from slow ones.
    fn send_message(&self, peer: &PeerId, path: MessagePath, payload: Bytes);

    /// Register the event listener, replacing any previous one
    fn listen(&self, callback: TransportCallback);

    /// Drop the event listener
    fn unlisten(&self);
}
