//! LogSink - logs a dataset summary via tracing

use std::path::{Path, PathBuf};

use contracts::{ContractError, Dataset, DatasetSink, Recording};
use tracing::{info, instrument};

/// Sink that only logs what would have been exported
pub struct LogSink {
    name: String,
}

impl LogSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn log_summary(&self, recording: &Recording, dataset: &Dataset) {
        let (first, last) = dataset.time_span().unwrap_or_default();
        info!(
            sink = %self.name,
            recording = %recording.id,
            title = %recording.title,
            layout = ?dataset.layout(),
            rows = dataset.len(),
            first_nanos = first,
            last_nanos = last,
            synchronized = recording.is_synchronized(),
            "dataset reconstructed"
        );
    }
}

impl DatasetSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "log_sink_export", skip_all, fields(sink = %self.name))]
    async fn export(
        &mut self,
        recording: &Recording,
        dataset: &Dataset,
        _destination_dir: &Path,
    ) -> Result<Option<PathBuf>, ContractError> {
        self.log_summary(recording, dataset);
        Ok(None)
    }
}
