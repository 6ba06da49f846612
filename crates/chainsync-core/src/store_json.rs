use std::fs;
use std::io::ErrorKind;
use std::sync::{Mutex, MutexGuard, PoisonError};

use camino::{Utf8Path, Utf8PathBuf};
use chainsync_domain::{
    CreatePayload, Job, JobId, JobSnapshot, JobStore, JobTable, PayloadStatus, StoreError,
};
use tracing::debug;

/// Job store persisted as a single JSON document, rewritten after every change.
#[derive(Debug)]
pub struct JsonFileStore {
    path: Utf8PathBuf,
    table: Mutex<JobTable>,
}

impl JsonFileStore {
    /// Opens the store at `path`; a missing file is an empty store.
    pub fn open(path: impl Into<Utf8PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let table = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)
                .map_err(|err| StoreError::Backend(format!("failed to parse {path}: {err}")))?,
            Err(err) if err.kind() == ErrorKind::NotFound => JobTable::default(),
            Err(err) => {
                return Err(StoreError::Backend(format!("failed to read {path}: {err}")));
            }
        };
        Ok(Self {
            path,
            table: Mutex::new(table),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    fn table(&self) -> MutexGuard<'_, JobTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, table: &JobTable) -> Result<(), StoreError> {
        let contents = serde_json::to_string_pretty(table)
            .map_err(|err| StoreError::Backend(format!("failed to serialize store: {err}")))?;
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|err| StoreError::Backend(format!("failed to create {parent}: {err}")))?;
        }
        fs::write(&self.path, contents)
            .map_err(|err| StoreError::Backend(format!("failed to write {}: {err}", self.path)))?;
        debug!(path = %self.path, jobs = table.len(), "saved job store");
        Ok(())
    }
}

impl JobStore for JsonFileStore {
    fn get(&self, id: JobId) -> Result<Option<Job>, StoreError> {
        Ok(self.table().get(id).cloned())
    }

    fn list(&self, scheduler: &str) -> Result<Vec<Job>, StoreError> {
        Ok(self.table().list(scheduler))
    }

    fn create(&self, job: Job) -> CreatePayload {
        let mut table = self.table();
        let payload = table.create(job);
        if payload.status != PayloadStatus::Created {
            return payload;
        }
        match self.persist(&table) {
            Ok(()) => payload,
            Err(err) => {
                if let Some(id) = payload.job.as_ref().and_then(|job| job.id) {
                    let _ = table.delete(id);
                }
                CreatePayload::error(err.to_string())
            }
        }
    }

    fn update(&self, job: &Job) -> Result<(), StoreError> {
        let mut table = self.table();
        table.update(job)?;
        self.persist(&table)
    }

    fn delete(&self, id: JobId) -> Result<Job, StoreError> {
        let mut table = self.table();
        let removed = table.delete(id)?;
        self.persist(&table)?;
        Ok(removed)
    }

    fn original_fields(&self, job: &Job) -> Option<JobSnapshot> {
        self.table().snapshot(job)
    }
}
