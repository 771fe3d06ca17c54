//! Export a closed recording through a sink.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use contracts::{
    ContractError, DatasetSink, ExportConfig, ExportLayout, RecordStore, RecordingId,
    RecordingStatus,
};
use tracing::{info, instrument, warn};

use crate::reconstructor::reconstruct;

/// Loads, reconstructs and writes recordings held by a [`RecordStore`]
pub struct DatasetExporter<S> {
    store: Arc<S>,
    layout: ExportLayout,
    bucket_nanos: i64,
}

impl<S: RecordStore> DatasetExporter<S> {
    pub fn new(store: Arc<S>, layout: ExportLayout, bucket_nanos: i64) -> Self {
        Self {
            store,
            layout,
            bucket_nanos,
        }
    }

    pub fn from_config(store: Arc<S>, config: &ExportConfig) -> Self {
        Self::new(store, config.layout, config.bucket_nanos())
    }

    /// Export one recording; returns the written path, if the sink wrote a file
    ///
    /// # Errors
    /// - `RecordingNotFound` for an unknown id
    /// - `RecordingStillOpen` while the session is still accumulating
    /// - whatever the store or sink reports
    #[instrument(name = "dataset_export", skip(self, sink, destination_dir), fields(sink = sink.name()))]
    pub async fn export<K: DatasetSink>(
        &self,
        id: RecordingId,
        sink: &mut K,
        destination_dir: &Path,
    ) -> Result<Option<PathBuf>, ContractError> {
        let mut recording = self
            .store
            .get_by_id(id)
            .await?
            .ok_or(ContractError::RecordingNotFound(id))?;
        if recording.is_open() {
            return Err(ContractError::RecordingStillOpen(id));
        }

        let samples = self.store.samples(id).await?;
        let dataset = reconstruct(&samples, self.layout, self.bucket_nanos);

        let result = sink.export(&recording, &dataset, destination_dir).await;
        observability::record_export(sink.name(), result.is_ok());
        let path = result.inspect_err(|e| warn!(error = %e, "export failed"))?;

        if recording.status != RecordingStatus::Exported {
            recording.status = RecordingStatus::Exported;
            self.store.update(recording).await?;
        }

        info!(
            rows = dataset.len(),
            path = ?path,
            "recording exported"
        );
        Ok(path)
    }
}
