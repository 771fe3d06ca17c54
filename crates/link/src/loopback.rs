//! In-process transport pair.
//!
//! Delivery is synchronous: `send_message` invokes the remote listener on
//! the caller's thread before returning.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use contracts::{
    IncomingMessage, MessagePath, MessageTransport, PeerId, TransportCallback, TransportEvent,
};
use parking_lot::Mutex;
use tracing::{debug, info, trace};

/// Faults applied to data messages (control and probe traffic is spared)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkFaults {
    /// Truncate every n-th data message by one byte (0 = never)
    pub corrupt_every: u64,
    /// Silently lose every n-th data message (0 = never)
    pub drop_every: u64,
}

/// Link counters
#[derive(Debug, Default)]
pub struct LinkStats {
    pub delivered: AtomicU64,
    pub dropped: AtomicU64,
    pub corrupted: AtomicU64,
}

impl LinkStats {
    pub fn snapshot(&self) -> LinkStatsSnapshot {
        LinkStatsSnapshot {
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            corrupted: self.corrupted.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStatsSnapshot {
    pub delivered: u64,
    pub dropped: u64,
    pub corrupted: u64,
}

/// State shared by both ends
struct Wire {
    listeners: [Mutex<Option<TransportCallback>>; 2],
    up: AtomicBool,
    faults: LinkFaults,
    data_sent: AtomicU64,
    stats: LinkStats,
}

impl Wire {
    fn listener(&self, side: usize) -> Option<TransportCallback> {
        // clone out so the callback runs without the lock held
        self.listeners[side].lock().clone()
    }

    fn notify(&self, side: usize, event: TransportEvent) {
        if let Some(callback) = self.listener(side) {
            callback(event);
        }
    }
}

/// One end of a loopback link
pub struct LoopbackTransport {
    side: usize,
    local: PeerId,
    remote: PeerId,
    wire: Arc<Wire>,
}

impl LoopbackTransport {
    /// Connected pair without faults
    pub fn pair(a: PeerId, b: PeerId) -> (Arc<Self>, Arc<Self>) {
        Self::pair_with_faults(a, b, LinkFaults::default())
    }

    pub fn pair_with_faults(a: PeerId, b: PeerId, faults: LinkFaults) -> (Arc<Self>, Arc<Self>) {
        let wire = Arc::new(Wire {
            listeners: [Mutex::new(None), Mutex::new(None)],
            up: AtomicBool::new(true),
            faults,
            data_sent: AtomicU64::new(0),
            stats: LinkStats::default(),
        });

        let first = Arc::new(Self {
            side: 0,
            local: a.clone(),
            remote: b.clone(),
            wire: wire.clone(),
        });
        let second = Arc::new(Self {
            side: 1,
            local: b,
            remote: a,
            wire,
        });
        (first, second)
    }

    pub fn remote_id(&self) -> &PeerId {
        &self.remote
    }

    pub fn stats(&self) -> LinkStatsSnapshot {
        self.wire.stats.snapshot()
    }

    pub fn is_up(&self) -> bool {
        self.wire.up.load(Ordering::SeqCst)
    }

    /// Bring the link down or up, notifying both ends
    pub fn set_link_up(&self, up: bool) {
        if self.wire.up.swap(up, Ordering::SeqCst) == up {
            return;
        }
        info!(local = %self.local, remote = %self.remote, up, "loopback link changed");

        let (mine, theirs) = (self.side, 1 - self.side);
        if up {
            self.wire.notify(mine, TransportEvent::PeerReachable(self.remote.clone()));
            self.wire.notify(theirs, TransportEvent::PeerReachable(self.local.clone()));
        } else {
            self.wire.notify(mine, TransportEvent::PeerUnreachable(self.remote.clone()));
            self.wire.notify(theirs, TransportEvent::PeerUnreachable(self.local.clone()));
        }
    }

    /// Deliver a message with an arbitrary path string to the remote end
    pub fn send_raw(&self, path: &str, payload: Bytes) {
        self.deliver(path.to_string(), payload);
    }

    fn deliver(&self, path: String, payload: Bytes) {
        if !self.is_up() {
            self.wire.stats.dropped.fetch_add(1, Ordering::Relaxed);
            trace!(path = %path, "link down, message lost");
            return;
        }

        let Some(callback) = self.wire.listener(1 - self.side) else {
            self.wire.stats.dropped.fetch_add(1, Ordering::Relaxed);
            trace!(path = %path, "no remote listener, message lost");
            return;
        };

        self.wire.stats.delivered.fetch_add(1, Ordering::Relaxed);
        callback(TransportEvent::Message(IncomingMessage {
            source: self.local.to_string(),
            path,
            payload,
        }));
    }
}

impl MessageTransport for LoopbackTransport {
    fn local_id(&self) -> &PeerId {
        &self.local
    }

    fn send_message(&self, peer: &PeerId, path: MessagePath, mut payload: Bytes) {
        if *peer != self.remote {
            debug!(peer = %peer, "no route to peer, message lost");
            self.wire.stats.dropped.fetch_add(1, Ordering::Relaxed);
            return;
        }

        if path.is_data() {
            let n = self.wire.data_sent.fetch_add(1, Ordering::Relaxed) + 1;
            let faults = self.wire.faults;
            if faults.drop_every > 0 && n.is_multiple_of(faults.drop_every) {
                self.wire.stats.dropped.fetch_add(1, Ordering::Relaxed);
                trace!(path = %path, n, "injected loss");
                return;
            }
            if faults.corrupt_every > 0 && n.is_multiple_of(faults.corrupt_every) {
                self.wire.stats.corrupted.fetch_add(1, Ordering::Relaxed);
                payload.truncate(payload.len().saturating_sub(1));
                trace!(path = %path, n, "injected truncation");
            }
        }

        self.deliver(path.as_str().to_string(), payload);
    }

    fn listen(&self, callback: TransportCallback) {
        *self.wire.listeners[self.side].lock() = Some(callback);
    }

    fn unlisten(&self) {
        self.wire.listeners[self.side].lock().take();
    }
}
