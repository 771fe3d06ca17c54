//! Dataset - Reconstructor output
//!
//! Export-ready, timestamp-ordered view of a closed recording.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{SensorKind, SensorSample};

/// Measured values of a sample, without its timestamp
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SampleValues {
    ThreeAxis { x: f32, y: f32, z: f32 },
    Scalar { value: f32 },
    HeartRate { bpm: i32 },
}

impl From<&SensorSample> for SampleValues {
    fn from(sample: &SensorSample) -> Self {
        match *sample {
            SensorSample::ThreeAxis { x, y, z, .. } => SampleValues::ThreeAxis { x, y, z },
            SensorSample::Scalar { value, .. } => SampleValues::Scalar { value },
            SensorSample::HeartRate { bpm, .. } => SampleValues::HeartRate { bpm },
        }
    }
}

/// One exported sample (long layout)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRow {
    /// Phone-clock timestamp, sort key
    pub timestamp_nanos: i64,
    /// Watch-clock timestamp as received
    pub source_timestamp_nanos: i64,
    pub kind: SensorKind,
    pub values: SampleValues,
    pub synchronized: bool,
}

/// One timestamp bucket (wide layout)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WideRow {
    pub bucket_start_nanos: i64,
    /// Last value of each kind seen inside the bucket
    pub values: BTreeMap<SensorKind, SampleValues>,
}

/// Export layout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportLayout {
    /// One row per sample
    #[default]
    Long,
    /// One row per timestamp bucket
    Wide,
}

/// Reconstructed dataset
#[derive(Debug, Clone, PartialEq)]
pub enum Dataset {
    Long(Vec<DatasetRow>),
    Wide { bucket_nanos: i64, rows: Vec<WideRow> },
}

impl Dataset {
    pub fn layout(&self) -> ExportLayout {
        match self {
            Dataset::Long(_) => ExportLayout::Long,
            Dataset::Wide { .. } => ExportLayout::Wide,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Dataset::Long(rows) => rows.len(),
            Dataset::Wide { rows, .. } => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// First and last row timestamps
    pub fn time_span(&self) -> Option<(i64, i64)> {
        match self {
            Dataset::Long(rows) => Some((rows.first()?.timestamp_nanos, rows.last()?.timestamp_nanos)),
            Dataset::Wide { rows, .. } => Some((
                rows.first()?.bucket_start_nanos,
                rows.last()?.bucket_start_nanos,
            )),
        }
    }
}
