//! MemoryRecordStore - recordings kept in process memory

use std::collections::{BTreeMap, HashMap};

use contracts::{ContractError, NewRecording, RecordStore, Recording, RecordingId, SyncedSample};
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::debug;

#[derive(Default)]
struct Tables {
    next_id: u64,
    recordings: BTreeMap<RecordingId, Recording>,
    samples: HashMap<RecordingId, Vec<SyncedSample>>,
}

impl Tables {
    fn listing(&self) -> Vec<Recording> {
        self.recordings.values().cloned().collect()
    }
}

/// Store backed by in-memory tables
///
/// `sample_count` of a recording is maintained by `insert_samples`.
pub struct MemoryRecordStore {
    tables: Mutex<Tables>,
    all: watch::Sender<Vec<Recording>>,
}

impl Default for MemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            all: watch::Sender::new(Vec::new()),
        }
    }

    fn publish(&self, tables: &Tables) {
        self.all.send_replace(tables.listing());
    }
}

impl RecordStore for MemoryRecordStore {
    async fn create(&self, new: NewRecording) -> Result<Recording, ContractError> {
        let mut tables = self.tables.lock();
        tables.next_id += 1;
        let id = RecordingId(tables.next_id);
        let recording = Recording::open(id, new);

        tables.recordings.insert(id, recording.clone());
        tables.samples.insert(id, Vec::new());
        self.publish(&tables);

        debug!(recording = %id, "recording created");
        Ok(recording)
    }

    async fn get_by_id(&self, id: RecordingId) -> Result<Option<Recording>, ContractError> {
        Ok(self.tables.lock().recordings.get(&id).cloned())
    }

    async fn insert_samples(
        &self,
        id: RecordingId,
        samples: &[SyncedSample],
    ) -> Result<(), ContractError> {
        let mut tables = self.tables.lock();
        let Tables {
            recordings,
            samples: stored,
            ..
        } = &mut *tables;

        let recording = recordings
            .get_mut(&id)
            .ok_or(ContractError::RecordingNotFound(id))?;
        recording.sample_count += samples.len() as u64;
        stored.entry(id).or_default().extend_from_slice(samples);

        self.publish(&tables);
        Ok(())
    }

    async fn samples(&self, id: RecordingId) -> Result<Vec<SyncedSample>, ContractError> {
        let tables = self.tables.lock();
        if !tables.recordings.contains_key(&id) {
            return Err(ContractError::RecordingNotFound(id));
        }
        Ok(tables.samples.get(&id).cloned().unwrap_or_default())
    }

    async fn update(&self, recording: Recording) -> Result<(), ContractError> {
        let mut tables = self.tables.lock();
        let slot = tables
            .recordings
            .get_mut(&recording.id)
            .ok_or(ContractError::RecordingNotFound(recording.id))?;
        *slot = recording;
        self.publish(&tables);
        Ok(())
    }

    fn get_all(&self) -> watch::Receiver<Vec<Recording>> {
        self.all.subscribe()
    }

    async fn delete_by_id(&self, id: RecordingId) -> Result<bool, ContractError> {
        let mut tables = self.tables.lock();
        let existed = tables.recordings.remove(&id).is_some();
        tables.samples.remove(&id);
        if existed {
            self.publish(&tables);
            debug!(recording = %id, "recording deleted");
        }
        Ok(existed)
    }
}
