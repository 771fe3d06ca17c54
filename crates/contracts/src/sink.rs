//! DatasetSink trait - export output interface
//!
//! Defines the abstract interface for export sinks.

use std::path::{Path, PathBuf};

use crate::{ContractError, Dataset, Recording};

/// Export output trait
///
/// All sink implementations must implement this trait.
#[trait_variant::make(DatasetSink: Send)]
pub trait LocalDatasetSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Write a reconstructed dataset under `destination_dir`
    ///
    /// Returns the path of the written file (if any).
    ///
    /// # Errors
    /// Returns write error (should include context)
    async fn export(
        &mut self,
        recording: &Recording,
        dataset: &Dataset,
        destination_dir: &Path,
    ) -> Result<Option<PathBuf>, ContractError>;
}
