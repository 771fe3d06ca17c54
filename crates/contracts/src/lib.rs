//! # Contracts
//!
//! Frozen interface contracts shared by the watch (sender) and the phone
//! (receiver). Every other crate in the workspace depends on this crate only;
//! reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Each device has its own monotonic clock, in nanoseconds (`i64`)
//! - Samples carry the sender's clock; the phone maps them into its own
//!   domain with a [`ClockCorrection`]
//! - Wall-clock milliseconds are only used for recording metadata

mod clock;
mod dataset;
mod error;
mod link_config;
mod path;
mod peer_id;
mod recording;
mod sample;
mod sensor_source;
mod sink;
mod store;
mod transport;

pub use clock::*;
pub use dataset::*;
pub use error::*;
pub use link_config::*;
pub use path::MessagePath;
pub use peer_id::{PeerId, MAX_PEER_ID_LEN};
pub use recording::*;
pub use sample::*;
pub use sensor_source::{SampleCallback, SensorSource};
pub use sink::*;
pub use store::*;
pub use transport::*;
