//! Persistence seam for job chains.
//!
//! The reconciliation engine treats the store as opaque: it only needs
//! get/create/update/delete plus a snapshot of the fields as they were last
//! persisted, which is how renames are detected.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::job::{Job, JobId};

/// Outcome tag attached to store results and fetch events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadStatus {
    Found,
    NotFound,
    Created,
    AlreadyExists,
    Error,
}

impl PayloadStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Found => "found",
            Self::NotFound => "not_found",
            Self::Created => "created",
            Self::AlreadyExists => "already_exists",
            Self::Error => "error",
        }
    }
}

/// Result of [`JobStore::create`].
#[derive(Debug, Clone)]
pub struct CreatePayload {
    pub status: PayloadStatus,
    pub job: Option<Job>,
    pub message: Option<String>,
}

impl CreatePayload {
    pub fn created(job: Job) -> Self {
        Self {
            status: PayloadStatus::Created,
            job: Some(job),
            message: None,
        }
    }

    pub fn already_exists(job: Job) -> Self {
        Self {
            status: PayloadStatus::AlreadyExists,
            job: Some(job),
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: PayloadStatus::Error,
            job: None,
            message: Some(message.into()),
        }
    }
}

/// Locating fields of a job as they were last persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSnapshot {
    pub name: String,
    pub scheduler: Option<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("job chain not found: {0}")]
    NotFound(JobId),

    #[error("job chain '{name}' already exists for scheduler '{scheduler}'")]
    Conflict { scheduler: String, name: String },

    #[error("invalid job chain data: {0}")]
    Validation(String),

    #[error("store backend error: {0}")]
    Backend(String),
}

pub trait JobStore: Send + Sync {
    fn get(&self, id: JobId) -> Result<Option<Job>, StoreError>;

    /// Every job chain owned by `scheduler`, in insertion order.
    fn list(&self, scheduler: &str) -> Result<Vec<Job>, StoreError>;

    fn create(&self, job: Job) -> CreatePayload;

    fn update(&self, job: &Job) -> Result<(), StoreError>;

    fn delete(&self, id: JobId) -> Result<Job, StoreError>;

    /// Fields of `job` as currently persisted, before any pending update.
    fn original_fields(&self, job: &Job) -> Option<JobSnapshot>;
}

/// Plain job table shared by the in-memory and file-backed stores.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobTable {
    #[serde(default)]
    next_id: u64,
    #[serde(default)]
    jobs: Vec<Job>,
}

impl JobTable {
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn get(&self, id: JobId) -> Option<&Job> {
        self.jobs.iter().find(|job| job.id == Some(id))
    }

    pub fn find(&self, scheduler: &str, name: &str) -> Option<&Job> {
        self.jobs
            .iter()
            .find(|job| job.name == name && job.belongs_to(scheduler))
    }

    pub fn list(&self, scheduler: &str) -> Vec<Job> {
        self.jobs
            .iter()
            .filter(|job| job.belongs_to(scheduler))
            .cloned()
            .collect()
    }

    pub fn create(&mut self, mut job: Job) -> CreatePayload {
        if job.name.is_empty() {
            return CreatePayload::error("a job chain needs a name");
        }
        let Some(scheduler) = job.scheduler_name().map(ToOwned::to_owned) else {
            return CreatePayload::error("a job chain needs a scheduler");
        };
        if let Some(existing) = self.find(&scheduler, &job.name) {
            return CreatePayload::already_exists(existing.clone());
        }
        self.next_id += 1;
        job.id = Some(JobId(self.next_id));
        debug!(id = %self.next_id, name = %job.name, %scheduler, "stored job chain");
        self.jobs.push(job.clone());
        CreatePayload::created(job)
    }

    pub fn update(&mut self, job: &Job) -> Result<(), StoreError> {
        let id = job
            .id
            .ok_or_else(|| StoreError::Validation("cannot update an unsaved job chain".into()))?;
        if job.name.is_empty() {
            return Err(StoreError::Validation("a job chain needs a name".into()));
        }
        let scheduler = job
            .scheduler_name()
            .ok_or_else(|| StoreError::Validation("a job chain needs a scheduler".into()))?;
        if self
            .find(scheduler, &job.name)
            .is_some_and(|other| other.id != Some(id))
        {
            return Err(StoreError::Conflict {
                scheduler: scheduler.to_string(),
                name: job.name.clone(),
            });
        }
        let slot = self
            .jobs
            .iter_mut()
            .find(|stored| stored.id == Some(id))
            .ok_or(StoreError::NotFound(id))?;
        *slot = job.clone();
        Ok(())
    }

    pub fn delete(&mut self, id: JobId) -> Result<Job, StoreError> {
        let index = self
            .jobs
            .iter()
            .position(|job| job.id == Some(id))
            .ok_or(StoreError::NotFound(id))?;
        Ok(self.jobs.remove(index))
    }

    pub fn snapshot(&self, job: &Job) -> Option<JobSnapshot> {
        let stored = self.get(job.id?)?;
        Some(JobSnapshot {
            name: stored.name.clone(),
            scheduler: stored.scheduler_name().map(ToOwned::to_owned),
        })
    }
}

/// Process-local store, mostly for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryStore {
    table: Mutex<JobTable>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store, assigning ids in order. Jobs that fail to insert are dropped.
    pub fn with_jobs(jobs: impl IntoIterator<Item = Job>) -> Self {
        let mut table = JobTable::default();
        for job in jobs {
            table.create(job);
        }
        Self {
            table: Mutex::new(table),
        }
    }

    fn table(&self) -> MutexGuard<'_, JobTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl JobStore for MemoryStore {
    fn get(&self, id: JobId) -> Result<Option<Job>, StoreError> {
        Ok(self.table().get(id).cloned())
    }

    fn list(&self, scheduler: &str) -> Result<Vec<Job>, StoreError> {
        Ok(self.table().list(scheduler))
    }

    fn create(&self, job: Job) -> CreatePayload {
        self.table().create(job)
    }

    fn update(&self, job: &Job) -> Result<(), StoreError> {
        self.table().update(job)
    }

    fn delete(&self, id: JobId) -> Result<Job, StoreError> {
        self.table().delete(id)
    }

    fn original_fields(&self, job: &Job) -> Option<JobSnapshot> {
        self.table().snapshot(job)
    }
}
