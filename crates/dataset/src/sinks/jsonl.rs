//! JsonLinesSink - one JSON object per dataset row

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use contracts::{ContractError, Dataset, DatasetSink, Recording};
use serde::Serialize;
use tracing::{debug, error, instrument};

use super::export_millis;
use crate::file_name::export_file_name;

/// Sink that writes `<title>_<millis>.jsonl`
pub struct JsonLinesSink {
    name: String,
    fixed_millis: Option<i64>,
}

impl JsonLinesSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fixed_millis: None,
        }
    }

    /// Use a fixed timestamp in file names instead of the export time
    pub fn with_export_millis(mut self, millis: i64) -> Self {
        self.fixed_millis = Some(millis);
        self
    }

    fn write_rows<T: Serialize>(out: &mut impl Write, rows: &[T]) -> std::io::Result<()> {
        for row in rows {
            serde_json::to_writer(&mut *out, row)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
            out.write_all(b"\n")?;
        }
        Ok(())
    }

    fn write_file(
        &self,
        recording: &Recording,
        dataset: &Dataset,
        destination_dir: &Path,
    ) -> std::io::Result<PathBuf> {
        fs::create_dir_all(destination_dir)?;
        let path = destination_dir.join(export_file_name(
            &recording.title,
            export_millis(self.fixed_millis),
            "jsonl",
        ));

        let mut out = BufWriter::new(File::create(&path)?);
        match dataset {
            Dataset::Long(rows) => Self::write_rows(&mut out, rows)?,
            Dataset::Wide { rows, .. } => Self::write_rows(&mut out, rows)?,
        }
        out.flush()?;
        Ok(path)
    }
}

impl DatasetSink for JsonLinesSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "jsonl_sink_export",
        skip(self, recording, dataset),
        fields(sink = %self.name, recording = %recording.id, rows = dataset.len())
    )]
    async fn export(
        &mut self,
        recording: &Recording,
        dataset: &Dataset,
        destination_dir: &Path,
    ) -> Result<Option<PathBuf>, ContractError> {
        let path = self
            .write_file(recording, dataset, destination_dir)
            .map_err(|e| {
                error!(sink = %self.name, error = %e, "Write failed");
                ContractError::sink_write(&self.name, e.to_string())
            })?;
        debug!(path = %path.display(), "JSON lines written");
        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{
        DatasetRow, NewRecording, PeerId, RecordingId, SampleValues, SensorKind,
    };
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_jsonl_rows() {
        let dir = tempdir().unwrap();
        let recording = Recording::open(
            RecordingId(9),
            NewRecording {
                title: "".to_string(),
                peer: PeerId::parse("watch").unwrap(),
                clock: None,
                started_at_nanos: 0,
                started_at_millis: 0,
            },
        );
        let dataset = Dataset::Long(vec![DatasetRow {
            timestamp_nanos: 1,
            source_timestamp_nanos: 2,
            kind: SensorKind::HeartRate,
            values: SampleValues::HeartRate { bpm: 70 },
            synchronized: false,
        }]);

        let mut sink = JsonLinesSink::new("jsonl").with_export_millis(5);
        let path = sink
            .export(&recording, &dataset, dir.path())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(path.file_name().unwrap(), "recording_5.jsonl");

        let text = fs::read_to_string(path).unwrap();
        let value: serde_json::Value = serde_json::from_str(text.trim()).unwrap();
        assert_eq!(value["kind"], "heart_rate");
        assert_eq!(value["values"]["bpm"], 70);
        assert_eq!(value["synchronized"], false);
    }
}
