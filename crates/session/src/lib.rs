//! # Session
//!
//! Start/stop handshake state on both ends of the link.
//!
//! - [`SenderSession`] (watch): at most one destination at a time; sends
//!   read the destination under the same lock that start/stop write it
//! - [`ReceiverSession`] (phone): Idle → Armed (probing) → Streaming
//!
//! Only the active peer can end a session. Starting again for the active
//! peer is idempotent; starting for another peer is rejected with
//! `SessionBusy` and leaves the state untouched.

mod receiver;
mod sender;

pub use receiver::{ActiveSession, ReceiverSession, ReceiverState};
pub use sender::{SenderSession, SessionState, StartOutcome};
