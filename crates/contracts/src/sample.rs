//! Sensor samples as produced on the watch and rebuilt on the phone.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::MessagePath;

/// Sensor kinds streamed by the watch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    Accelerometer,
    LinearAcceleration,
    Gyroscope,
    Gravity,
    AmbientTemperature,
    HeartRate,
}

impl SensorKind {
    /// All kinds, in column order for exports
    pub const ALL: [SensorKind; 6] = [
        SensorKind::Accelerometer,
        SensorKind::LinearAcceleration,
        SensorKind::Gyroscope,
        SensorKind::Gravity,
        SensorKind::AmbientTemperature,
        SensorKind::HeartRate,
    ];

    /// Wire path carrying this kind
    pub fn path(self) -> MessagePath {
        match self {
            SensorKind::Accelerometer => MessagePath::AccelerometerData,
            SensorKind::LinearAcceleration => MessagePath::LinearAccelerationData,
            SensorKind::Gyroscope => MessagePath::GyroscopeData,
            SensorKind::Gravity => MessagePath::GravityData,
            SensorKind::AmbientTemperature => MessagePath::AmbientTemperatureData,
            SensorKind::HeartRate => MessagePath::HeartRateData,
        }
    }

    /// Binary shape of this kind's samples
    pub fn shape(self) -> SampleShape {
        match self {
            SensorKind::Accelerometer
            | SensorKind::LinearAcceleration
            | SensorKind::Gyroscope
            | SensorKind::Gravity => SampleShape::ThreeAxis,
            SensorKind::AmbientTemperature => SampleShape::Scalar,
            SensorKind::HeartRate => SampleShape::HeartRate,
        }
    }

    /// Stable snake_case name (metrics labels, export columns)
    pub fn as_str(self) -> &'static str {
        match self {
            SensorKind::Accelerometer => "accelerometer",
            SensorKind::LinearAcceleration => "linear_acceleration",
            SensorKind::Gyroscope => "gyroscope",
            SensorKind::Gravity => "gravity",
            SensorKind::AmbientTemperature => "ambient_temperature",
            SensorKind::HeartRate => "heart_rate",
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed binary layout of a sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleShape {
    /// 3 x f32 + i64
    ThreeAxis,
    /// f32 + i64
    Scalar,
    /// i32 + i64
    HeartRate,
}

impl SampleShape {
    /// Encoded width in bytes
    pub const fn width(self) -> usize {
        match self {
            SampleShape::ThreeAxis => 20,
            SampleShape::Scalar | SampleShape::HeartRate => 12,
        }
    }
}

/// A single measurement, stamped with the sender's monotonic clock
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum SensorSample {
    ThreeAxis {
        x: f32,
        y: f32,
        z: f32,
        timestamp_nanos: i64,
    },
    Scalar {
        value: f32,
        timestamp_nanos: i64,
    },
    HeartRate {
        bpm: i32,
        timestamp_nanos: i64,
    },
}

impl SensorSample {
    pub fn three_axis(x: f32, y: f32, z: f32, timestamp_nanos: i64) -> Self {
        Self::ThreeAxis {
            x,
            y,
            z,
            timestamp_nanos,
        }
    }

    pub fn scalar(value: f32, timestamp_nanos: i64) -> Self {
        Self::Scalar {
            value,
            timestamp_nanos,
        }
    }

    pub fn heart_rate(bpm: i32, timestamp_nanos: i64) -> Self {
        Self::HeartRate {
            bpm,
            timestamp_nanos,
        }
    }

    /// Sender-clock timestamp
    pub fn timestamp_nanos(&self) -> i64 {
        match *self {
            SensorSample::ThreeAxis {
                timestamp_nanos, ..
            }
            | SensorSample::Scalar {
                timestamp_nanos, ..
            }
            | SensorSample::HeartRate {
                timestamp_nanos, ..
            } => timestamp_nanos,
        }
    }

    pub fn shape(&self) -> SampleShape {
        match self {
            SensorSample::ThreeAxis { .. } => SampleShape::ThreeAxis,
            SensorSample::Scalar { .. } => SampleShape::Scalar,
            SensorSample::HeartRate { .. } => SampleShape::HeartRate,
        }
    }
}

// Bit-exact equality so NaN payloads survive round-trip comparisons.
impl PartialEq for SensorSample {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                SensorSample::ThreeAxis {
                    x: x1,
                    y: y1,
                    z: z1,
                    timestamp_nanos: t1,
                },
                SensorSample::ThreeAxis {
                    x: x2,
                    y: y2,
                    z: z2,
                    timestamp_nanos: t2,
                },
            ) => {
                x1.to_bits() == x2.to_bits()
                    && y1.to_bits() == y2.to_bits()
                    && z1.to_bits() == z2.to_bits()
                    && t1 == t2
            }
            (
                SensorSample::Scalar {
                    value: v1,
                    timestamp_nanos: t1,
                },
                SensorSample::Scalar {
                    value: v2,
                    timestamp_nanos: t2,
                },
            ) => v1.to_bits() == v2.to_bits() && t1 == t2,
            (
                SensorSample::HeartRate {
                    bpm: b1,
                    timestamp_nanos: t1,
                },
                SensorSample::HeartRate {
                    bpm: b2,
                    timestamp_nanos: t2,
                },
            ) => b1 == b2 && t1 == t2,
            _ => false,
        }
    }
}

impl Eq for SensorSample {}

/// Sample paired with the sensor that produced it (watch side)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaggedSample {
    pub kind: SensorKind,
    pub sample: SensorSample,
}

impl TaggedSample {
    pub fn new(kind: SensorKind, sample: SensorSample) -> Self {
        Self { kind, sample }
    }
}

/// Sample placed on the phone's timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncedSample {
    /// Sensor that produced the sample
    pub kind: SensorKind,

    /// Sample as decoded (sender-clock timestamp untouched)
    pub sample: SensorSample,

    /// Timestamp in the phone's clock domain
    pub corrected_timestamp_nanos: i64,

    /// False when no clock offset estimate was available
    pub synchronized: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_kind_has_distinct_path() {
        let paths: std::collections::HashSet<_> =
            SensorKind::ALL.iter().map(|k| k.path()).collect();
        assert_eq!(paths.len(), SensorKind::ALL.len());
        assert!(paths.iter().all(|p| p.is_data()));
    }

    #[test]
    fn test_shape_widths() {
        assert_eq!(SensorKind::Gravity.shape().width(), 20);
        assert_eq!(SensorKind::AmbientTemperature.shape().width(), 12);
        assert_eq!(SensorKind::HeartRate.shape().width(), 12);
    }

    #[test]
    fn test_nan_equality_is_bitwise() {
        let a = SensorSample::scalar(f32::NAN, 1);
        let b = SensorSample::scalar(f32::NAN, 1);
        assert_eq!(a, b);
        assert_ne!(
            SensorSample::scalar(0.0, 1),
            SensorSample::scalar(-0.0, 1)
        );
    }

    #[test]
    fn test_timestamp_accessor() {
        assert_eq!(SensorSample::heart_rate(72, 99).timestamp_nanos(), 99);
        assert_eq!(
            SensorSample::three_axis(1.0, 2.0, 3.0, -5).timestamp_nanos(),
            -5
        );
    }
}
