//! Reconciliation between the job store and the live folder.
//!
//! The store owns job chains; files under `{root}/{scheduler}/` are a
//! projection of it. Single record events push store changes out to disk,
//! while a collection fetch also pulls orphan files back into the store.
//! Nothing here is transactional across the two sides: every step is either
//! idempotent (create if absent, remove if present) or an overwrite, so a
//! failed operation is repaired by running it again.

use std::collections::HashSet;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use chainsync_domain::{Job, JobStore, PayloadStatus, SchedulerRef};
use tracing::{debug, info, warn};

use crate::codec::{CodecRegistry, EntityKind, RecordCodec};
use crate::config::{Config, MalformedPolicy};
use crate::error::SyncError;
use crate::files::FileStore;
use crate::paths::PathResolver;

const KIND: EntityKind = EntityKind::JobChain;

/// Merged view produced by [`ReconciliationEngine::on_collection_fetch`].
#[derive(Debug, Clone)]
pub struct Reconciliation {
    /// Store rows first, in their original order, then jobs created from orphan files.
    pub jobs: Vec<Job>,
    pub status: PayloadStatus,
    /// Files written for store rows that had none.
    pub written: usize,
    /// Orphan files that produced a new store record.
    pub materialized: usize,
    /// Orphan files left out of the merged view (unusable name, undecodable,
    /// or refused by the store).
    pub skipped: Vec<Utf8PathBuf>,
}

pub struct ReconciliationEngine {
    paths: PathResolver,
    files: FileStore,
    codecs: CodecRegistry,
    store: Arc<dyn JobStore>,
    on_malformed: MalformedPolicy,
}

impl ReconciliationEngine {
    pub fn new(config: &Config, codecs: CodecRegistry, store: Arc<dyn JobStore>) -> Self {
        Self {
            paths: PathResolver::new(config.live_folder()),
            files: FileStore::new(config.live_folder()),
            codecs,
            store,
            on_malformed: config.on_malformed(),
        }
    }

    #[must_use]
    pub fn paths(&self) -> &PathResolver {
        &self.paths
    }

    #[must_use]
    pub fn store(&self) -> &dyn JobStore {
        self.store.as_ref()
    }

    /// Writes the file for a created or fetched job unless one already exists.
    ///
    /// Returns whether a file was written. An existing file is never replaced,
    /// even when its content is stale; only [`Self::on_update`] overwrites.
    pub fn on_create(&self, job: &Job) -> Result<bool, SyncError> {
        self.write_document(job, false)
    }

    /// Moves and rewrites the file of an updated job.
    ///
    /// `original_name` is the name the job had when it was last persisted.
    pub fn on_update(&self, job: &Job, original_name: &str) -> Result<(), SyncError> {
        let path = self.job_path(job)?;
        if !original_name.is_empty() && original_name != job.name {
            let scheduler = scheduler_name(job)?;
            let old_path = self.paths.resolve(scheduler, original_name);
            debug!(from = %old_path, to = %path, "job chain renamed");
            self.files.remove(&old_path)?;
        }
        self.write_document(job, true)?;
        Ok(())
    }

    pub fn on_delete(&self, job: &Job) -> Result<(), SyncError> {
        let path = self.job_path(job)?;
        self.files.remove(&path)
    }

    /// Reconciles a whole scheduler scope after its rows were fetched.
    ///
    /// Every row gets its file if missing. Every job chain file without a row
    /// is decoded and created in the store; the ones the store accepts are
    /// appended after the rows. A `NotFound` fetch becomes `Found` when the
    /// merged view is not empty.
    pub fn on_collection_fetch(
        &self,
        scheduler: &SchedulerRef,
        rows: Vec<Job>,
        status: PayloadStatus,
    ) -> Result<Reconciliation, SyncError> {
        if scheduler.name.is_empty() {
            return Err(SyncError::invalid("a job scheduler needs a name"));
        }

        let mut seen = HashSet::with_capacity(rows.len());
        let mut written = 0;
        for row in &rows {
            if self.on_create(row)? {
                written += 1;
            }
            seen.insert(row.name.clone());
        }

        let scope = self.paths.scope_dir(&scheduler.name);
        let mut jobs = rows;
        let mut materialized = 0;
        let mut skipped = Vec::new();
        for file_name in self.files.list_files(&scope, KIND.file_suffix())? {
            let Some(name) = PathResolver::job_name_from_file(&file_name) else {
                continue;
            };
            if seen.contains(name) {
                continue;
            }
            let path = scope.join(&file_name);
            if let Err(err) = validate_name(name) {
                warn!(%path, error = %err, "ignoring job chain file with unusable name");
                skipped.push(path);
                continue;
            }
            let Some(mut job) = self.decode_orphan(&path)? else {
                skipped.push(path);
                continue;
            };
            job.name = name.to_string();
            job.scheduler = Some(scheduler.clone());

            let payload = self.store.create(job);
            if payload.status == PayloadStatus::Created {
                if let Some(created) = payload.job {
                    debug!(%path, name = %created.name, "imported orphan job chain");
                    self.canonicalize(&path, scheduler, &created)?;
                    seen.insert(created.name.clone());
                    materialized += 1;
                    jobs.push(created);
                    continue;
                }
            }
            warn!(
                %path,
                status = payload.status.as_str(),
                message = payload.message.as_deref().unwrap_or_default(),
                "store did not create job chain from orphan file"
            );
            skipped.push(path);
        }

        let status = if status == PayloadStatus::NotFound && !jobs.is_empty() {
            PayloadStatus::Found
        } else {
            status
        };
        info!(
            scheduler = %scheduler.name,
            jobs = jobs.len(),
            written,
            materialized,
            skipped = skipped.len(),
            status = status.as_str(),
            "reconciled job chain scope"
        );
        Ok(Reconciliation {
            jobs,
            status,
            written,
            materialized,
            skipped,
        })
    }

    fn write_document(&self, job: &Job, force: bool) -> Result<bool, SyncError> {
        let path = self.job_path(job)?;
        if self.files.exists(&path) {
            if !force {
                return Ok(false);
            }
            self.files.remove(&path)?;
        }
        let bytes = self
            .codec()?
            .encode(job)
            .map_err(|source| SyncError::Encode {
                name: job.name.clone(),
                source,
            })?;
        self.files.write(&path, &bytes)?;
        Ok(true)
    }

    /// Moves an imported file whose suffix differs only in case onto the
    /// canonical name, so the next fetch does not write a second copy.
    fn canonicalize(
        &self,
        path: &Utf8Path,
        scheduler: &SchedulerRef,
        job: &Job,
    ) -> Result<(), SyncError> {
        let canonical = self.paths.resolve(&scheduler.name, &job.name);
        if path == canonical.as_path() {
            return Ok(());
        }
        if self.files.exists(&canonical) {
            warn!(%path, %canonical, "canonical file name taken, keeping imported file name");
            return Ok(());
        }
        self.files.rename(path, &canonical)
    }

    fn decode_orphan(&self, path: &Utf8Path) -> Result<Option<Job>, SyncError> {
        let bytes = self.files.read(path)?;
        match self.codec()?.decode(&bytes) {
            Ok(job) => Ok(Some(job)),
            Err(source) => match self.on_malformed {
                MalformedPolicy::Abort => Err(SyncError::Decode {
                    path: path.to_owned(),
                    source,
                }),
                MalformedPolicy::Skip => {
                    warn!(%path, error = %source, "skipping malformed job chain file");
                    Ok(None)
                }
            },
        }
    }

    fn codec(&self) -> Result<&dyn RecordCodec, SyncError> {
        self.codecs
            .get(KIND)
            .ok_or(SyncError::MissingCodec { kind: KIND })
    }

    fn job_path(&self, job: &Job) -> Result<Utf8PathBuf, SyncError> {
        validate_name(&job.name)?;
        let scheduler = scheduler_name(job)?;
        Ok(self.paths.resolve(scheduler, &job.name))
    }
}

fn scheduler_name(job: &Job) -> Result<&str, SyncError> {
    match job.scheduler_name() {
        Some(name) if !name.is_empty() => Ok(name),
        _ => Err(SyncError::invalid(format!(
            "job chain '{}' has no job scheduler",
            job.name
        ))),
    }
}

fn validate_name(name: &str) -> Result<(), SyncError> {
    if name.is_empty() {
        return Err(SyncError::invalid("a job chain needs a name"));
    }
    if name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(SyncError::invalid(format!(
            "job chain name '{name}' cannot be used as a file name"
        )));
    }
    Ok(())
}
