//! RecordStore trait - persistence contract for recordings
//!
//! The phone exclusively owns recordings; the watch never persists.

use tokio::sync::watch;

use crate::{ContractError, NewRecording, Recording, RecordingId, SyncedSample};

/// Recording persistence
#[trait_variant::make(RecordStore: Send)]
pub trait LocalRecordStore {
    /// Insert a new open recording and assign its id
    async fn create(&self, new: NewRecording) -> Result<Recording, ContractError>;

    /// Fetch one recording's metadata
    async fn get_by_id(&self, id: RecordingId) -> Result<Option<Recording>, ContractError>;

    /// Append samples to a recording, preserving slice order
    ///
    /// # Errors
    /// `RecordingNotFound` if the id is unknown.
    async fn insert_samples(
        &self,
        id: RecordingId,
        samples: &[SyncedSample],
    ) -> Result<(), ContractError>;

    /// All samples of a recording, in insertion order
    async fn samples(&self, id: RecordingId) -> Result<Vec<SyncedSample>, ContractError>;

    /// Replace a recording's metadata row
    async fn update(&self, recording: Recording) -> Result<(), ContractError>;

    /// Live view of every recording, updated on each change
    fn get_all(&self) -> watch::Receiver<Vec<Recording>>;

    /// Remove a recording and its samples; returns whether it existed
    async fn delete_by_id(&self, id: RecordingId) -> Result<bool, ContractError>;
}
