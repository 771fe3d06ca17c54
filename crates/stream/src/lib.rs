//! # Stream
//!
//! Per-sensor sample streams on both ends of the link.
//!
//! Responsibilities:
//! - Watch: subscribe sensor sources, encode, path-tag and send each sample
//!   to the session's destination ([`Multiplexer`])
//! - Phone: dispatch incoming messages by path, decode, correct and append
//!   to per-kind streams ([`Demultiplexer`])
//! - Mock sensor sources for running without hardware
//!
//! ## Usage Example
//!
//! ```ignore
//! use stream::{Demultiplexer, DispatchOutcome};
//!
//! let mut demux = Demultiplexer::new(ClockCorrection::Synchronized(estimate));
//! match demux.dispatch(&msg.path, &msg.payload) {
//!     DispatchOutcome::Appended(kind) => { /* buffered */ }
//!     DispatchOutcome::NotData(path) => { /* control or probe */ }
//!     DispatchOutcome::Rejected(err) => { /* logged, counted, skipped */ }
//! }
//! let batch = demux.streams_mut().drain();
//! ```

mod demultiplexer;
mod mock;
mod multiplexer;
mod streams;

pub use demultiplexer::{DemuxStats, Demultiplexer, DispatchOutcome};
pub use mock::{MockSensorConfig, MockSensorSource, ScriptedSensorSource};
pub use multiplexer::{Multiplexer, MultiplexerSnapshot, MultiplexerStats};
pub use streams::{RecordingStreams, SampleStream};
