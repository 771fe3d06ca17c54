//! Recording - phone-side metadata for one capture session

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{ClockOffsetEstimate, PeerId};

/// Store-assigned recording identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordingId(pub u64);

impl fmt::Display for RecordingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Recording lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordingStatus {
    /// Accumulating samples
    Open,
    /// Session ended, immutable
    Closed,
    /// Written to a file at least once
    Exported,
}

/// Why a recording stopped accumulating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    /// Phone-side stop
    Stopped,
    /// Watch sent `stop-transfer`
    PeerStopped,
    /// Transport reported the watch unreachable
    Disconnected,
}

impl CloseReason {
    pub fn as_str(self) -> &'static str {
        match self {
            CloseReason::Stopped => "stopped",
            CloseReason::PeerStopped => "peer_stopped",
            CloseReason::Disconnected => "disconnected",
        }
    }
}

/// Input to [`crate::RecordStore::create`]
#[derive(Debug, Clone)]
pub struct NewRecording {
    pub title: String,
    pub peer: PeerId,
    pub clock: Option<ClockOffsetEstimate>,
    pub started_at_nanos: i64,
    pub started_at_millis: i64,
}

/// Recording metadata row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    pub id: RecordingId,
    pub title: String,
    pub peer: PeerId,
    pub status: RecordingStatus,

    /// Watch clock ahead of phone clock (None = unsynchronized)
    pub clock_offset_nanos: Option<i64>,
    pub round_trip_delay_nanos: Option<u64>,

    /// Phone monotonic clock at session start
    pub started_at_nanos: i64,
    /// Wall clock at session start
    pub started_at_millis: i64,
    pub stopped_at_nanos: Option<i64>,
    pub stopped_at_millis: Option<i64>,
    pub close_reason: Option<CloseReason>,

    /// Samples persisted so far
    pub sample_count: u64,
}

impl Recording {
    /// Build the row for a freshly created recording
    pub fn open(id: RecordingId, new: NewRecording) -> Self {
        Self {
            id,
            title: new.title,
            peer: new.peer,
            status: RecordingStatus::Open,
            clock_offset_nanos: new.clock.map(|c| c.offset_nanos),
            round_trip_delay_nanos: new.clock.map(|c| c.round_trip_delay_nanos),
            started_at_nanos: new.started_at_nanos,
            started_at_millis: new.started_at_millis,
            stopped_at_nanos: None,
            stopped_at_millis: None,
            close_reason: None,
            sample_count: 0,
        }
    }

    /// Mark closed; a no-op on anything but an open recording
    pub fn close(&mut self, reason: CloseReason, stopped_at_nanos: i64, stopped_at_millis: i64) {
        if self.status != RecordingStatus::Open {
            return;
        }
        self.status = RecordingStatus::Closed;
        self.close_reason = Some(reason);
        self.stopped_at_nanos = Some(stopped_at_nanos);
        self.stopped_at_millis = Some(stopped_at_millis);
    }

    pub fn is_open(&self) -> bool {
        self.status == RecordingStatus::Open
    }

    pub fn is_synchronized(&self) -> bool {
        self.clock_offset_nanos.is_some()
    }

    /// The estimate the recording was started with
    pub fn clock_estimate(&self) -> Option<ClockOffsetEstimate> {
        Some(ClockOffsetEstimate {
            offset_nanos: self.clock_offset_nanos?,
            round_trip_delay_nanos: self.round_trip_delay_nanos.unwrap_or(0),
        })
    }

    /// Capture length on the phone clock, if closed
    pub fn duration_nanos(&self) -> Option<i64> {
        self.stopped_at_nanos
            .map(|stop| stop.saturating_sub(self.started_at_nanos))
    }
}
