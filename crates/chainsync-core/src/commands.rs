//! Command entry points used by the `chainsync` binary.
//!
//! Each command drives the store and raises the same events the store layer
//! would, so the live folder is updated through the registered subscriber
//! rather than by touching the engine directly.

use std::sync::Arc;

use anyhow::{Context, Result};
use chainsync_domain::{Job, JobStore, PayloadStatus, SchedulerRef};
use serde_json::{json, Value};
use tracing::info;

use crate::codec::CodecRegistry;
use crate::config::Config;
use crate::engine::ReconciliationEngine;
use crate::events::{CollectionFetched, Dispatcher, Event, EventKind, JobChainSubscriber};
use crate::outcome::ExecutionOutcome;
use crate::paths::PathResolver;
use crate::store_json::JsonFileStore;

pub struct CommandContext {
    config: Config,
    store: Arc<dyn JobStore>,
    dispatcher: Dispatcher,
}

impl CommandContext {
    /// Wires the job chain subscriber against `store`.
    pub fn new(config: Config, store: Arc<dyn JobStore>) -> Self {
        let engine =
            ReconciliationEngine::new(&config, CodecRegistry::with_defaults(), Arc::clone(&store));
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(Arc::new(JobChainSubscriber::new(engine)));
        Self {
            config,
            store,
            dispatcher,
        }
    }

    /// Opens the JSON store named by the configuration.
    ///
    /// # Errors
    /// Returns an error if the store file exists but cannot be read.
    pub fn open(config: Config) -> Result<Self> {
        let store = JsonFileStore::open(config.store())
            .with_context(|| format!("failed to open job store {}", config.store()))?;
        Ok(Self::new(config, Arc::new(store)))
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &dyn JobStore {
        self.store.as_ref()
    }

    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    fn find_job(&self, scheduler: &str, name: &str) -> Result<Option<Job>> {
        Ok(self
            .store
            .list(scheduler)?
            .into_iter()
            .find(|job| job.name == name))
    }
}

/// Fetches every job chain of `scheduler` and reconciles its live folder scope.
pub fn sync_scheduler(ctx: &CommandContext, scheduler: &str) -> Result<ExecutionOutcome> {
    let rows = ctx.store.list(scheduler)?;
    let (kind, status) = if rows.is_empty() {
        (EventKind::CollectionFetchError, PayloadStatus::NotFound)
    } else {
        (EventKind::CollectionFetchPost, PayloadStatus::Found)
    };
    let fetched_rows = rows.len();
    let mut event = Event::CollectionFetched(CollectionFetched {
        scheduler: SchedulerRef::new(scheduler),
        rows,
        status,
    });
    if let Err(err) = ctx.dispatcher.dispatch(kind, &mut event) {
        return Ok(err.into());
    }
    let Event::CollectionFetched(fetched) = event else {
        return Ok(ExecutionOutcome::failure(
            "collection fetch handler replaced the event",
            json!({ "reason": "unexpected_event" }),
        ));
    };

    let imported = fetched.rows.len().saturating_sub(fetched_rows);
    let paths = PathResolver::new(ctx.config.live_folder());
    let jobs: Vec<Value> = fetched
        .rows
        .iter()
        .map(|job| {
            json!({
                "id": job.id.map(|id| id.0),
                "name": job.name,
                "title": job.title,
                "path": paths.resolve(scheduler, &job.name).as_str(),
            })
        })
        .collect();
    let details = json!({
        "scheduler": scheduler,
        "status": fetched.status.as_str(),
        "imported": imported,
        "jobs": jobs,
    });
    if fetched.status == PayloadStatus::NotFound {
        return Ok(ExecutionOutcome::user_error(
            format!("no job chains found for scheduler '{scheduler}'"),
            details,
        ));
    }
    info!(%scheduler, jobs = fetched.rows.len(), imported, "sync complete");
    Ok(ExecutionOutcome::success(
        format!(
            "{} job chain(s) in sync for '{scheduler}' ({imported} imported from disk)",
            fetched.rows.len()
        ),
        details,
    ))
}

/// Renames a job chain in the store and moves its file.
pub fn rename_job(
    ctx: &CommandContext,
    scheduler: &str,
    from: &str,
    to: &str,
) -> Result<ExecutionOutcome> {
    let Some(mut job) = ctx.find_job(scheduler, from)? else {
        return Ok(unknown_job(scheduler, from));
    };
    if ctx.find_job(scheduler, to)?.is_some() {
        return Ok(ExecutionOutcome::user_error(
            format!("job chain '{to}' already exists for scheduler '{scheduler}'"),
            json!({ "reason": "already_exists", "scheduler": scheduler, "name": to }),
        ));
    }
    job.name = to.to_string();
    let mut event = Event::RecordUpdateValidated(job.clone());
    if let Err(err) = ctx.dispatcher.dispatch(EventKind::UpdateValid, &mut event) {
        return Ok(err.into());
    }
    ctx.store.update(&job)?;
    Ok(ExecutionOutcome::success(
        format!("renamed job chain '{from}' to '{to}'"),
        json!({ "scheduler": scheduler, "from": from, "to": to }),
    ))
}

/// Deletes a job chain from the store and removes its file.
pub fn remove_job(ctx: &CommandContext, scheduler: &str, name: &str) -> Result<ExecutionOutcome> {
    let Some(job) = ctx.find_job(scheduler, name)? else {
        return Ok(unknown_job(scheduler, name));
    };
    let removed = match job.id {
        Some(id) => ctx.store.delete(id)?,
        None => job,
    };
    let mut event = Event::RecordDeleted(removed);
    if let Err(err) = ctx.dispatcher.dispatch(EventKind::DeletePost, &mut event) {
        return Ok(err.into());
    }
    Ok(ExecutionOutcome::success(
        format!("removed job chain '{name}'"),
        json!({ "scheduler": scheduler, "name": name }),
    ))
}

/// Reports the canonical live folder location of a scope or job chain.
#[must_use]
pub fn job_path(config: &Config, scheduler: &str, name: Option<&str>) -> ExecutionOutcome {
    let paths = PathResolver::new(config.live_folder());
    let path = match name {
        Some(name) => paths.resolve(scheduler, name),
        None => paths.scope_dir(scheduler),
    };
    ExecutionOutcome::success(
        path.to_string(),
        json!({ "path": path.as_str(), "passthrough": true }),
    )
}

fn unknown_job(scheduler: &str, name: &str) -> ExecutionOutcome {
    ExecutionOutcome::user_error(
        format!("no job chain '{name}' for scheduler '{scheduler}'"),
        json!({ "reason": "not_found", "scheduler": scheduler, "name": name }),
    )
}
