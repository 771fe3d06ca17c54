//! # Clock Sync
//!
//! Ping/pong estimation of the offset between the phone's and the watch's
//! monotonic clocks.
//!
//! Responsibilities:
//! - Run probe batches from the phone and keep the minimum-delay result
//! - Answer pings on the watch
//! - Cancel in-flight probes when a session is torn down
//!
//! ## Usage Example
//!
//! ```ignore
//! use clock_sync::ClockSyncProber;
//!
//! let prober = ClockSyncProber::new(transport.clone(), clock.clone());
//! // message loop: prober.handle_pong(&payload)
//! let estimate = prober.probe_batch(&peer, &config.clock_sync).await?;
//! let corrected = estimate.correct(sample.timestamp_nanos());
//! ```

mod estimator;
mod prober;
mod responder;

pub use contracts::{ClockCorrection, ClockOffsetEstimate, ClockSyncProbe};
pub use estimator::ClockSyncEstimator;
pub use prober::ClockSyncProber;
pub use responder::PongResponder;
