//! Watch-side pong replies.

use std::sync::Arc;

use contracts::{Clock, MessagePath, MessageTransport, PeerId};
use tracing::trace;

/// Answers pings with the echoed ping and the local clock
///
/// Receipt and reply are captured as one instant, so the pong carries a
/// single timestamp standing for both t2 and t3.
pub struct PongResponder {
    transport: Arc<dyn MessageTransport>,
    clock: Arc<dyn Clock>,
}

impl PongResponder {
    pub fn new(transport: Arc<dyn MessageTransport>, clock: Arc<dyn Clock>) -> Self {
        Self { transport, clock }
    }

    pub fn respond(&self, peer: &PeerId, ping: &[u8]) {
        let reply_nanos = self.clock.now_nanos();
        trace!(peer = %peer, reply_nanos, "answering ping");
        self.transport
            .send_message(peer, MessagePath::Pong, codec::encode_pong(ping, reply_nanos));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use contracts::{ManualClock, TransportCallback};
    use parking_lot::Mutex;

    struct LastMessage {
        id: PeerId,
        last: Mutex<Option<(PeerId, MessagePath, Bytes)>>,
    }

    impl MessageTransport for LastMessage {
        fn local_id(&self) -> &PeerId {
            &self.id
        }

        fn send_message(&self, peer: &PeerId, path: MessagePath, payload: Bytes) {
            *self.last.lock() = Some((peer.clone(), path, payload));
        }

        fn listen(&self, _callback: TransportCallback) {}

        fn unlisten(&self) {}
    }

    #[test]
    fn test_pong_echoes_ping_and_stamps_reply() {
        let transport = Arc::new(LastMessage {
            id: PeerId::parse("watch").unwrap(),
            last: Mutex::new(None),
        });
        let responder = PongResponder::new(transport.clone(), Arc::new(ManualClock::new(9_000)));
        let phone = PeerId::parse("phone").unwrap();

        responder.respond(&phone, &codec::encode_ping(123));

        let (peer, path, payload) = transport.last.lock().clone().unwrap();
        assert_eq!(peer, phone);
        assert_eq!(path, MessagePath::Pong);
        let pong = codec::decode_pong(&payload).unwrap();
        assert_eq!(pong.echo_t1, 123);
        assert_eq!(pong.reply_nanos, 9_000);
    }
}
