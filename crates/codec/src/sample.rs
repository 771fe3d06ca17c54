//! Sample encode/decode

use bytes::{Buf, BufMut, Bytes, BytesMut};
use contracts::{ContractError, SampleShape, SensorKind, SensorSample};

/// Encode a sample into its fixed-width representation
pub fn encode(sample: &SensorSample) -> Bytes {
    let mut buf = BytesMut::with_capacity(sample.shape().width());

    match *sample {
        SensorSample::ThreeAxis {
            x,
            y,
            z,
            timestamp_nanos,
        } => {
            buf.put_f32_le(x);
            buf.put_f32_le(y);
            buf.put_f32_le(z);
            buf.put_i64_le(timestamp_nanos);
        }
        SensorSample::Scalar {
            value,
            timestamp_nanos,
        } => {
            buf.put_f32_le(value);
            buf.put_i64_le(timestamp_nanos);
        }
        SensorSample::HeartRate {
            bpm,
            timestamp_nanos,
        } => {
            buf.put_i32_le(bpm);
            buf.put_i64_le(timestamp_nanos);
        }
    }

    buf.freeze()
}

/// Decode a payload of the given shape
///
/// # Errors
/// `MalformedPayload` when `bytes.len()` differs from `shape.width()`.
pub fn decode(shape: SampleShape, mut bytes: &[u8]) -> Result<SensorSample, ContractError> {
    if bytes.len() != shape.width() {
        return Err(ContractError::malformed(
            shape_label(shape),
            shape.width(),
            bytes.len(),
        ));
    }

    let sample = match shape {
        SampleShape::ThreeAxis => SensorSample::ThreeAxis {
            x: bytes.get_f32_le(),
            y: bytes.get_f32_le(),
            z: bytes.get_f32_le(),
            timestamp_nanos: bytes.get_i64_le(),
        },
        SampleShape::Scalar => SensorSample::Scalar {
            value: bytes.get_f32_le(),
            timestamp_nanos: bytes.get_i64_le(),
        },
        SampleShape::HeartRate => SensorSample::HeartRate {
            bpm: bytes.get_i32_le(),
            timestamp_nanos: bytes.get_i64_le(),
        },
    };

    Ok(sample)
}

/// Decode a payload received on `kind`'s data path
///
/// Errors name the wire path rather than the shape.
pub fn decode_kind(kind: SensorKind, bytes: &[u8]) -> Result<SensorSample, ContractError> {
    let shape = kind.shape();
    if bytes.len() != shape.width() {
        return Err(ContractError::malformed(
            kind.path().as_str(),
            shape.width(),
            bytes.len(),
        ));
    }
    decode(shape, bytes)
}

fn shape_label(shape: SampleShape) -> &'static str {
    match shape {
        SampleShape::ThreeAxis => "three-axis",
        SampleShape::Scalar => "scalar",
        SampleShape::HeartRate => "heart-rate",
    }
}
