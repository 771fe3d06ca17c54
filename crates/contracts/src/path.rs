//! MessagePath - path tags carried by every transport message

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{ContractError, SensorKind};

/// Path tag identifying a message's semantic type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessagePath {
    /// phone -> watch, empty
    InitTransfer,
    /// either direction, empty
    StopTransfer,
    /// phone -> watch, 8-byte t1
    Ping,
    /// watch -> phone, echo + reply timestamp
    Pong,
    AccelerometerData,
    LinearAccelerationData,
    GyroscopeData,
    GravityData,
    AmbientTemperatureData,
    HeartRateData,
}

impl MessagePath {
    pub const fn as_str(self) -> &'static str {
        match self {
            MessagePath::InitTransfer => "init-transfer",
            MessagePath::StopTransfer => "stop-transfer",
            MessagePath::Ping => "ping",
            MessagePath::Pong => "pong",
            MessagePath::AccelerometerData => "accelerometer-data",
            MessagePath::LinearAccelerationData => "linear-acceleration-data",
            MessagePath::GyroscopeData => "gyroscope-data",
            MessagePath::GravityData => "gravity-data",
            MessagePath::AmbientTemperatureData => "ambient-temperature-data",
            MessagePath::HeartRateData => "heart-rate-data",
        }
    }

    /// Sensor kind for data paths, `None` for control paths
    pub fn sensor_kind(self) -> Option<SensorKind> {
        match self {
            MessagePath::AccelerometerData => Some(SensorKind::Accelerometer),
            MessagePath::LinearAccelerationData => Some(SensorKind::LinearAcceleration),
            MessagePath::GyroscopeData => Some(SensorKind::Gyroscope),
            MessagePath::GravityData => Some(SensorKind::Gravity),
            MessagePath::AmbientTemperatureData => Some(SensorKind::AmbientTemperature),
            MessagePath::HeartRateData => Some(SensorKind::HeartRate),
            MessagePath::InitTransfer
            | MessagePath::StopTransfer
            | MessagePath::Ping
            | MessagePath::Pong => None,
        }
    }

    pub fn is_data(self) -> bool {
        self.sensor_kind().is_some()
    }
}

impl fmt::Display for MessagePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessagePath {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let path = match s {
            "init-transfer" => MessagePath::InitTransfer,
            "stop-transfer" => MessagePath::StopTransfer,
            "ping" => MessagePath::Ping,
            "pong" => MessagePath::Pong,
            "accelerometer-data" => MessagePath::AccelerometerData,
            "linear-acceleration-data" => MessagePath::LinearAccelerationData,
            "gyroscope-data" => MessagePath::GyroscopeData,
            "gravity-data" => MessagePath::GravityData,
            "ambient-temperature-data" => MessagePath::AmbientTemperatureData,
            "heart-rate-data" => MessagePath::HeartRateData,
            other => {
                return Err(ContractError::UnknownPath {
                    path: other.to_string(),
                })
            }
        };
        Ok(path)
    }
}
