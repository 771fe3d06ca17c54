//! Layered error definitions
//!
//! Categorized by source: wire / clock / session / store / sink / config

use thiserror::Error;

use crate::RecordingId;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Wire Errors =====
    /// Payload length does not match the fixed width for its path
    #[error("malformed payload on '{path}': expected {expected} bytes, got {actual}")]
    MalformedPayload {
        path: String,
        expected: usize,
        actual: usize,
    },

    /// Message arrived on a path nobody handles
    #[error("unknown message path '{path}'")]
    UnknownPath { path: String },

    // ===== Clock Sync Errors =====
    /// No pong arrived within the probe window
    #[error("clock probe to '{peer}' timed out after {waited_ms}ms")]
    Timeout { peer: String, waited_ms: u64 },

    /// Probe was abandoned because its session was torn down
    #[error("clock probe to '{peer}' cancelled")]
    ProbeCancelled { peer: String },

    /// Every probe of a batch failed
    #[error("clock sync unavailable for '{peer}': {attempted} probes, none usable")]
    ClockSyncUnavailable { peer: String, attempted: usize },

    // ===== Session Errors =====
    /// Start requested while another peer owns the session
    #[error("session busy: streaming to '{active}', rejected '{requested}'")]
    SessionBusy { active: String, requested: String },

    /// Operation requires an active session
    #[error("no active session")]
    NotStreaming,

    /// Transport reported the peer as gone
    #[error("peer '{peer}' unreachable")]
    UnreachablePeer { peer: String },

    /// Peer identifier failed boundary validation
    #[error("invalid peer id {id:?}: {reason}")]
    InvalidPeerId { id: String, reason: &'static str },

    // ===== Store Errors =====
    /// Recording id not present in the store
    #[error("recording {0} not found")]
    RecordingNotFound(RecordingId),

    /// Export attempted before the recording was closed
    #[error("recording {0} is still open")]
    RecordingStillOpen(RecordingId),

    /// Backend failure inside a record store
    #[error("record store error: {message}")]
    Store { message: String },

    // ===== Sink Errors =====
    /// Sink write error
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create malformed payload error
    pub fn malformed(path: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::MalformedPayload {
            path: path.into(),
            expected,
            actual,
        }
    }

    /// Create session busy error
    pub fn session_busy(active: impl Into<String>, requested: impl Into<String>) -> Self {
        Self::SessionBusy {
            active: active.into(),
            requested: requested.into(),
        }
    }

    /// Create record store error
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create sink write error
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Whether the stream should keep going after this error
    ///
    /// Wire-level failures only affect the message that carried them.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::MalformedPayload { .. } | Self::UnknownPath { .. } | Self::Timeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_message() {
        let err = ContractError::malformed("gyroscope-data", 20, 15);
        assert_eq!(
            err.to_string(),
            "malformed payload on 'gyroscope-data': expected 20 bytes, got 15"
        );
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_session_errors_not_recoverable() {
        assert!(!ContractError::session_busy("a", "b").is_recoverable());
        assert!(!ContractError::NotStreaming.is_recoverable());
    }

    #[test]
    fn test_timeout_recoverable_cancel_not() {
        let peer = "watch".to_string();
        assert!(ContractError::Timeout {
            peer: peer.clone(),
            waited_ms: 20
        }
        .is_recoverable());
        assert!(!ContractError::ProbeCancelled { peer: peer.clone() }.is_recoverable());
        assert!(!ContractError::UnreachablePeer { peer }.is_recoverable());
    }
}
