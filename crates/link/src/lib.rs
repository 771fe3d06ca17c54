//! # Link
//!
//! Wires the protocol pieces into the two device roles.
//!
//! - [`WatchNode`]: answers pings, follows `init-transfer` / `stop-transfer`
//!   and streams its sensor sources to the phone
//! - [`PhoneNode`]: probes the watch clock, drives recordings and persists
//!   corrected samples into a [`contracts::RecordStore`]
//! - [`LoopbackTransport`]: in-process transport pair with fault injection
//! - [`MemoryRecordStore`]: in-memory store

pub mod loopback;
pub mod phone;
pub mod store;
pub mod watch;

pub use loopback::{LinkFaults, LinkStats, LinkStatsSnapshot, LoopbackTransport};
pub use phone::PhoneNode;
pub use store::MemoryRecordStore;
pub use watch::WatchNode;
