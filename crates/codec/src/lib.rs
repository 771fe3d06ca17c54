//! # Codec
//!
//! Fixed-width little-endian wire format for sensor samples and clock probes.
//!
//! | Shape      | Layout                         | Bytes |
//! |------------|--------------------------------|-------|
//! | ThreeAxis  | `x:f32 y:f32 z:f32 ts:i64`     | 20    |
//! | Scalar     | `value:f32 ts:i64`             | 12    |
//! | HeartRate  | `bpm:i32 ts:i64`               | 12    |
//! | Ping       | `t1:i64`                       | 8     |
//! | Pong       | `echo:i64 reply:i64`           | 16    |
//!
//! Decoding is all-or-nothing: a payload whose length differs from the
//! shape's width is rejected with `ContractError::MalformedPayload`.
//!
//! ```
//! use contracts::{SensorKind, SensorSample};
//!
//! let sample = SensorSample::three_axis(0.1, -9.8, f32::NAN, 1_000);
//! let bytes = codec::encode(&sample);
//! assert_eq!(bytes.len(), 20);
//! assert_eq!(codec::decode_kind(SensorKind::Gyroscope, &bytes).unwrap(), sample);
//! ```

mod probe;
mod sample;

pub use probe::{
    decode_ping, decode_pong, encode_ping, encode_pong, PongPayload, PING_WIDTH, PONG_WIDTH,
};
pub use sample::{decode, decode_kind, encode};
