//! Sink implementations
//!
//! Contains CsvSink, JsonLinesSink and LogSink, plus [`ExportSink`] to pick
//! one from configuration.

mod csv;
mod jsonl;
mod log;

use std::path::{Path, PathBuf};

use contracts::{ContractError, Dataset, DatasetSink, ExportFormat, Recording};

pub use self::csv::CsvSink;
pub use self::jsonl::JsonLinesSink;
pub use self::log::LogSink;

/// Sink selected at runtime
pub enum ExportSink {
    Csv(CsvSink),
    Jsonl(JsonLinesSink),
    Log(LogSink),
}

impl ExportSink {
    /// File sink for the configured format
    pub fn for_format(format: ExportFormat) -> Self {
        match format {
            ExportFormat::Csv => ExportSink::Csv(CsvSink::new("csv")),
            ExportFormat::Jsonl => ExportSink::Jsonl(JsonLinesSink::new("jsonl")),
        }
    }
}

impl DatasetSink for ExportSink {
    fn name(&self) -> &str {
        match self {
            ExportSink::Csv(s) => s.name(),
            ExportSink::Jsonl(s) => s.name(),
            ExportSink::Log(s) => s.name(),
        }
    }

    async fn export(
        &mut self,
        recording: &Recording,
        dataset: &Dataset,
        destination_dir: &Path,
    ) -> Result<Option<PathBuf>, ContractError> {
        match self {
            ExportSink::Csv(s) => s.export(recording, dataset, destination_dir).await,
            ExportSink::Jsonl(s) => s.export(recording, dataset, destination_dir).await,
            ExportSink::Log(s) => s.export(recording, dataset, destination_dir).await,
        }
    }
}

/// Export time stamped into file names
fn export_millis(fixed: Option<i64>) -> i64 {
    fixed.unwrap_or_else(|| chrono::Utc::now().timestamp_millis())
}
