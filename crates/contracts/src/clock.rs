//! Device clocks and clock-offset arithmetic.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Local device clock
pub trait Clock: Send + Sync {
    /// Monotonic time in nanoseconds
    fn now_nanos(&self) -> i64;

    /// Wall-clock time in milliseconds since the Unix epoch
    fn wall_millis(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or_default()
    }
}

/// `Instant`-based clock with an optional fixed skew
///
/// Two instances created with different offsets behave like two devices
/// whose monotonic clocks disagree by a constant amount.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: Instant,
    offset_nanos: i64,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self::with_offset(0)
    }

    pub fn with_offset(offset_nanos: i64) -> Self {
        Self {
            origin: Instant::now(),
            offset_nanos,
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_nanos(&self) -> i64 {
        let elapsed = self.origin.elapsed().as_nanos() as i64;
        elapsed.saturating_add(self.offset_nanos)
    }
}

/// Hand-driven clock for tests; clones share the same time
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(start_nanos: i64) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(start_nanos)),
        }
    }

    pub fn set(&self, nanos: i64) {
        self.now.store(nanos, Ordering::SeqCst);
    }

    pub fn advance(&self, nanos: i64) {
        self.now.fetch_add(nanos, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_nanos(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }

    fn wall_millis(&self) -> i64 {
        self.now_nanos() / 1_000_000
    }
}

/// Four timestamps of one ping/pong exchange
///
/// - `t1`: requester send time (requester clock)
/// - `t2`: peer receipt time (peer clock)
/// - `t3`: peer reply time (peer clock)
/// - `t4`: requester receipt time (requester clock)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockSyncProbe {
    pub t1: i64,
    pub t2: i64,
    pub t3: i64,
    pub t4: i64,
}

impl ClockSyncProbe {
    /// offset = ((t2 - t1) - (t4 - t3)) / 2, delay = (t4 - t1) - (t3 - t2)
    pub fn estimate(&self) -> ClockOffsetEstimate {
        let (t1, t2, t3, t4) = (
            self.t1 as i128,
            self.t2 as i128,
            self.t3 as i128,
            self.t4 as i128,
        );

        let offset = ((t2 - t1) - (t4 - t3)) / 2;
        let delay = (t4 - t1) - (t3 - t2);

        ClockOffsetEstimate {
            offset_nanos: offset.clamp(i64::MIN as i128, i64::MAX as i128) as i64,
            round_trip_delay_nanos: delay.clamp(0, u64::MAX as i128) as u64,
        }
    }
}

/// Result of one probe: how far the remote clock runs ahead of ours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockOffsetEstimate {
    pub offset_nanos: i64,
    pub round_trip_delay_nanos: u64,
}

impl ClockOffsetEstimate {
    /// Map a remote timestamp into the local clock domain
    #[inline]
    pub fn correct(&self, remote_timestamp_nanos: i64) -> i64 {
        remote_timestamp_nanos.saturating_sub(self.offset_nanos)
    }
}

/// Correction in force for an open recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClockCorrection {
    Synchronized(ClockOffsetEstimate),
    /// No estimate; timestamps pass through and samples are flagged
    #[default]
    Unsynchronized,
}

impl ClockCorrection {
    /// Returns `(corrected_timestamp, synchronized)`
    #[inline]
    pub fn apply(&self, remote_timestamp_nanos: i64) -> (i64, bool) {
        match self {
            ClockCorrection::Synchronized(est) => (est.correct(remote_timestamp_nanos), true),
            ClockCorrection::Unsynchronized => (remote_timestamp_nanos, false),
        }
    }

    pub fn estimate(&self) -> Option<ClockOffsetEstimate> {
        match self {
            ClockCorrection::Synchronized(est) => Some(*est),
            ClockCorrection::Unsynchronized => None,
        }
    }
}
