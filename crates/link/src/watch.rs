//! WatchNode - the sending device

use std::str::FromStr;
use std::sync::Arc;

use clock_sync::PongResponder;
use contracts::{
    Clock, IncomingMessage, MessagePath, MessageTransport, PeerId, SensorSource, TransportEvent,
};
use session::{SenderSession, SessionState, StartOutcome};
use stream::{Multiplexer, MultiplexerSnapshot};
use tracing::{debug, info, instrument, warn};

struct WatchShared {
    clock: Arc<dyn Clock>,
    session: Arc<SenderSession>,
    mux: Multiplexer,
    responder: PongResponder,
}

impl WatchShared {
    fn on_event(&self, event: TransportEvent) {
        match event {
            TransportEvent::Message(msg) => self.on_message(msg),
            TransportEvent::PeerReachable(peer) => debug!(peer = %peer, "peer reachable"),
            TransportEvent::PeerUnreachable(peer) => {
                if self.session.disconnect(&peer) {
                    self.mux.stop_all();
                }
            }
        }
    }

    fn on_message(&self, msg: IncomingMessage) {
        let peer = match PeerId::parse(&msg.source) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "message from invalid peer id dropped");
                return;
            }
        };
        let path = match MessagePath::from_str(&msg.path) {
            Ok(p) => p,
            Err(e) => {
                warn!(peer = %peer, error = %e, "dropping incoming message");
                return;
            }
        };

        match path {
            MessagePath::Ping => self.responder.respond(&peer, &msg.payload),
            MessagePath::InitTransfer => {
                match self.session.start(&peer, self.clock.now_nanos()) {
                    Ok(StartOutcome::Started) => self.mux.start_all(),
                    Ok(StartOutcome::AlreadyStreaming) => {}
                    Err(e) => warn!(error = %e, "init-transfer refused"),
                }
            }
            MessagePath::StopTransfer => {
                if self.session.stop(&peer) {
                    self.mux.stop_all();
                }
            }
            other => debug!(peer = %peer, path = %other, "ignored on watch"),
        }
    }
}

/// Sending side
///
/// Every transport event is handled inline on the delivering thread.
pub struct WatchNode {
    transport: Arc<dyn MessageTransport>,
    shared: Arc<WatchShared>,
}

impl WatchNode {
    /// Register `sources` and start listening on `transport`
    pub fn start(
        transport: Arc<dyn MessageTransport>,
        clock: Arc<dyn Clock>,
        sources: Vec<Box<dyn SensorSource>>,
    ) -> Self {
        let session = Arc::new(SenderSession::new());
        let mut mux = Multiplexer::new(session.clone(), transport.clone());
        for source in sources {
            mux.register(source);
        }

        let shared = Arc::new(WatchShared {
            responder: PongResponder::new(transport.clone(), clock.clone()),
            clock,
            session,
            mux,
        });

        let handler = shared.clone();
        transport.listen(Arc::new(move |event| handler.on_event(event)));
        info!(
            id = %transport.local_id(),
            sources = shared.mux.source_count(),
            "watch node listening"
        );

        Self { transport, shared }
    }

    pub fn state(&self) -> SessionState {
        self.shared.session.state()
    }

    pub fn is_streaming(&self) -> bool {
        self.shared.session.is_streaming()
    }

    pub fn stats(&self) -> MultiplexerSnapshot {
        self.shared.mux.stats().snapshot()
    }

    /// Stop the sensors and detach from the transport
    #[instrument(name = "watch_shutdown", skip(self))]
    pub fn shutdown(&self) {
        self.transport.unlisten();
        self.shared.mux.stop_all();
    }
}

impl Drop for WatchNode {
    fn drop(&mut self) {
        // the listener holds the shared state; drop it to break the cycle
        self.transport.unlisten();
    }
}
