//! CsvSink - writes a dataset as one CSV file

use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use contracts::{
    ContractError, Dataset, DatasetRow, DatasetSink, Recording, SampleShape, SampleValues,
    SensorKind, WideRow,
};
use tracing::{debug, error, instrument};

use super::export_millis;
use crate::file_name::export_file_name;

const LONG_HEADER: &str = "timestamp_nanos,source_timestamp_nanos,sensor,x,y,z,value,bpm,synchronized";

/// Sink that writes `<title>_<millis>.csv`
pub struct CsvSink {
    name: String,
    fixed_millis: Option<i64>,
}

impl CsvSink {
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

    fn write_long(out: &mut impl Write, rows: &[DatasetRow]) -> std::io::Result<()> {
        writeln!(out, "{LONG_HEADER}")?;
        for row in rows {
            let (x, y, z, value, bpm) = match row.values {
                SampleValues::ThreeAxis { x, y, z } => {
                    (x.to_string(), y.to_string(), z.to_string(), String::new(), String::new())
                }
                SampleValues::Scalar { value } => {
                    (String::new(), String::new(), String::new(), value.to_string(), String::new())
                }
                SampleValues::HeartRate { bpm } => {
                    (String::new(), String::new(), String::new(), String::new(), bpm.to_string())
                }
            };
            writeln!(
                out,
                "{},{},{},{},{},{},{},{},{}",
                row.timestamp_nanos,
                row.source_timestamp_nanos,
                row.kind,
                x,
                y,
                z,
                value,
                bpm,
                row.synchronized
            )?;
        }
        Ok(())
    }

    fn wide_header() -> String {
        let mut header = String::from("bucket_start_nanos");
        for kind in SensorKind::ALL {
            match kind.shape() {
                SampleShape::ThreeAxis => {
                    let _ = write!(header, ",{kind}_x,{kind}_y,{kind}_z");
                }
                SampleShape::Scalar | SampleShape::HeartRate => {
                    let _ = write!(header, ",{kind}");
                }
            }
        }
        header
    }

    fn write_wide(out: &mut impl Write, rows: &[WideRow]) -> std::io::Result<()> {
        writeln!(out, "{}", Self::wide_header())?;
        for row in rows {
            let mut line = row.bucket_start_nanos.to_string();
            for kind in SensorKind::ALL {
                match (kind.shape(), row.values.get(&kind)) {
                    (_, Some(SampleValues::ThreeAxis { x, y, z })) => {
                        let _ = write!(line, ",{x},{y},{z}");
                    }
                    (_, Some(SampleValues::Scalar { value })) => {
                        let _ = write!(line, ",{value}");
                    }
                    (_, Some(SampleValues::HeartRate { bpm })) => {
                        let _ = write!(line, ",{bpm}");
                    }
                    (SampleShape::ThreeAxis, None) => line.push_str(",,,"),
                    (_, None) => line.push(','),
                }
            }
            writeln!(out, "{line}")?;
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
            "csv",
        ));

        let mut out = BufWriter::new(File::create(&path)?);
        match dataset {
            Dataset::Long(rows) => Self::write_long(&mut out, rows)?,
            Dataset::Wide { rows, .. } => Self::write_wide(&mut out, rows)?,
        }
        out.flush()?;
        Ok(path)
    }
}

impl DatasetSink for CsvSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "csv_sink_export",
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
        debug!(path = %path.display(), "CSV written");
        Ok(Some(path))
    }
}
