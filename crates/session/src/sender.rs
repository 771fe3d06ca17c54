//! Watch-side session.

use contracts::{ContractError, PeerId};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

/// Sender session state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Streaming { peer: PeerId, started_at_nanos: i64 },
}

/// Result of a successful start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// Idle → Streaming
    Started,
    /// Already streaming to the same peer; nothing changed
    AlreadyStreaming,
}

/// Thread-safe sender state machine
#[derive(Debug)]
pub struct SenderSession {
    state: RwLock<SessionState>,
}

impl Default for SenderSession {
    fn default() -> Self {
        Self::new()
    }
}

impl SenderSession {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(SessionState::Idle),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.read().clone()
    }

    pub fn is_streaming(&self) -> bool {
        matches!(*self.state.read(), SessionState::Streaming { .. })
    }

    /// Current destination, if streaming
    pub fn destination(&self) -> Option<PeerId> {
        match &*self.state.read() {
            SessionState::Streaming { peer, .. } => Some(peer.clone()),
            SessionState::Idle => None,
        }
    }

    /// Handle `init-transfer` from `peer`
    ///
    /// # Errors
    /// `SessionBusy` when another peer holds the session.
    pub fn start(&self, peer: &PeerId, now_nanos: i64) -> Result<StartOutcome, ContractError> {
        let mut state = self.state.write();
        match &*state {
            SessionState::Idle => {
                *state = SessionState::Streaming {
                    peer: peer.clone(),
                    started_at_nanos: now_nanos,
                };
                info!(peer = %peer, "session started");
                Ok(StartOutcome::Started)
            }
            SessionState::Streaming { peer: active, .. } if active == peer => {
                debug!(peer = %peer, "start for active peer ignored");
                Ok(StartOutcome::AlreadyStreaming)
            }
            SessionState::Streaming { peer: active, .. } => {
                warn!(active = %active, requested = %peer, "start rejected, session busy");
                Err(ContractError::session_busy(active.as_str(), peer.as_str()))
            }
        }
    }

    /// Handle `stop-transfer` from `peer`; returns whether the session ended
    pub fn stop(&self, peer: &PeerId) -> bool {
        self.end(peer, "stopped")
    }

    /// Handle the transport losing `peer`; returns whether the session ended
    pub fn disconnect(&self, peer: &PeerId) -> bool {
        self.end(peer, "disconnected")
    }

    fn end(&self, peer: &PeerId, reason: &'static str) -> bool {
        let mut state = self.state.write();
        match &*state {
            SessionState::Streaming { peer: active, .. } if active == peer => {
                *state = SessionState::Idle;
                info!(peer = %peer, reason, "session ended");
                true
            }
            _ => {
                debug!(peer = %peer, reason, "end for inactive peer ignored");
                false
            }
        }
    }

    /// Run `f` with the destination while holding the read lock
    ///
    /// A concurrent stop waits for `f` to return, so nothing is sent to a
    /// peer after its session ended. Returns `None` when idle.
    pub fn with_destination<R>(&self, f: impl FnOnce(&PeerId) -> R) -> Option<R> {
        match &*self.state.read() {
            SessionState::Streaming { peer, .. } => Some(f(peer)),
            SessionState::Idle => None,
        }
    }
}
