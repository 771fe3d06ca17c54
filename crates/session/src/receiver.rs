//! Phone-side session.

use contracts::{ContractError, PeerId, RecordingId};
use tracing::{debug, info};

/// Receiver session state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ReceiverState {
    #[default]
    Idle,
    /// Clock probing in progress, no recording yet
    Armed { peer: PeerId },
    Streaming {
        peer: PeerId,
        recording_id: RecordingId,
        started_at_nanos: i64,
    },
}

/// The session being ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSession {
    pub peer: PeerId,
    pub recording_id: RecordingId,
    pub started_at_nanos: i64,
}

/// Receiver state machine
///
/// Not synchronized; the owner serializes access.
#[derive(Debug, Default)]
pub struct ReceiverSession {
    state: ReceiverState,
}

impl ReceiverSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ReceiverState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == ReceiverState::Idle
    }

    /// Peer currently armed or streaming
    pub fn peer(&self) -> Option<&PeerId> {
        match &self.state {
            ReceiverState::Idle => None,
            ReceiverState::Armed { peer } | ReceiverState::Streaming { peer, .. } => Some(peer),
        }
    }

    pub fn active(&self) -> Option<ActiveSession> {
        match &self.state {
            ReceiverState::Streaming {
                peer,
                recording_id,
                started_at_nanos,
            } => Some(ActiveSession {
                peer: peer.clone(),
                recording_id: *recording_id,
                started_at_nanos: *started_at_nanos,
            }),
            _ => None,
        }
    }

    /// Reserve the session for `peer` while its clock is probed
    ///
    /// # Errors
    /// `SessionBusy` unless idle; one capture runs at a time.
    pub fn arm(&mut self, peer: &PeerId) -> Result<(), ContractError> {
        if let Some(active) = self.peer() {
            return Err(ContractError::session_busy(active.as_str(), peer.as_str()));
        }
        self.state = ReceiverState::Armed { peer: peer.clone() };
        debug!(peer = %peer, "session armed");
        Ok(())
    }

    /// Armed → Streaming once the recording exists
    ///
    /// # Errors
    /// - `NotStreaming` when nothing is armed (the arm was cancelled)
    /// - `SessionBusy` when another peer holds the session
    pub fn begin(
        &mut self,
        peer: &PeerId,
        recording_id: RecordingId,
        now_nanos: i64,
    ) -> Result<(), ContractError> {
        match &self.state {
            ReceiverState::Armed { peer: armed } if armed == peer => {
                self.state = ReceiverState::Streaming {
                    peer: peer.clone(),
                    recording_id,
                    started_at_nanos: now_nanos,
                };
                info!(peer = %peer, recording = %recording_id, "receiving");
                Ok(())
            }
            ReceiverState::Idle => Err(ContractError::NotStreaming),
            ReceiverState::Armed { peer: active } | ReceiverState::Streaming { peer: active, .. } => {
                Err(ContractError::session_busy(active.as_str(), peer.as_str()))
            }
        }
    }

    /// Armed → Idle; returns the peer that was armed
    pub fn disarm(&mut self) -> Option<PeerId> {
        match std::mem::take(&mut self.state) {
            ReceiverState::Armed { peer } => {
                debug!(peer = %peer, "session disarmed");
                Some(peer)
            }
            other => {
                self.state = other;
                None
            }
        }
    }

    /// End the session on a stop from or to `peer`
    ///
    /// Returns the ended session when `peer` was streaming. An armed
    /// session for `peer` is dropped without a result.
    pub fn stop(&mut self, peer: &PeerId) -> Option<ActiveSession> {
        self.end(peer)
    }

    /// End the session because the transport lost `peer`
    pub fn disconnect(&mut self, peer: &PeerId) -> Option<ActiveSession> {
        self.end(peer)
    }

    fn end(&mut self, peer: &PeerId) -> Option<ActiveSession> {
        if self.peer() != Some(peer) {
            debug!(peer = %peer, "end for inactive peer ignored");
            return None;
        }
        let ended = self.active();
        self.state = ReceiverState::Idle;
        ended
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(id: &str) -> PeerId {
        PeerId::parse(id).unwrap()
    }

    #[test]
    fn test_full_lifecycle() {
        let mut session = ReceiverSession::new();
        session.arm(&peer("w")).unwrap();
        session.begin(&peer("w"), RecordingId(1), 50).unwrap();

        let ended = session.stop(&peer("w")).unwrap();
        assert_eq!(ended.recording_id, RecordingId(1));
        assert_eq!(ended.started_at_nanos, 50);
        assert!(session.is_idle());
    }

    #[test]
    fn test_arm_rejected_while_busy() {
        let mut session = ReceiverSession::new();
        session.arm(&peer("a")).unwrap();
        assert!(matches!(
            session.arm(&peer("b")),
            Err(ContractError::SessionBusy { .. })
        ));
        assert!(session.arm(&peer("a")).is_err());
        assert_eq!(session.state(), &ReceiverState::Armed { peer: peer("a") });
    }

    #[test]
    fn test_begin_after_disarm_fails() {
        let mut session = ReceiverSession::new();
        session.arm(&peer("a")).unwrap();
        assert_eq!(session.disarm(), Some(peer("a")));
        assert!(matches!(
            session.begin(&peer("a"), RecordingId(2), 0),
            Err(ContractError::NotStreaming)
        ));
    }

    #[test]
    fn test_other_peer_cannot_end() {
        let mut session = ReceiverSession::new();
        session.arm(&peer("a")).unwrap();
        session.begin(&peer("a"), RecordingId(3), 0).unwrap();

        assert_eq!(session.stop(&peer("b")), None);
        assert_eq!(session.disconnect(&peer("b")), None);
        assert!(session.active().is_some());
        assert!(session.disconnect(&peer("a")).is_some());
    }

    #[test]
    fn test_disarm_keeps_streaming_state() {
        let mut session = ReceiverSession::new();
        session.arm(&peer("a")).unwrap();
        session.begin(&peer("a"), RecordingId(4), 0).unwrap();
        assert_eq!(session.disarm(), None);
        assert!(session.active().is_some());
    }
}
