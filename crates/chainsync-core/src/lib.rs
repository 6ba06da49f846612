#![deny(clippy::all)]

pub mod codec;
pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod files;
pub mod outcome;
pub mod paths;
pub mod store_json;

pub use crate::codec::{CodecError, CodecRegistry, EntityKind, JobChainXmlCodec, RecordCodec};
pub use crate::commands::{job_path, remove_job, rename_job, sync_scheduler, CommandContext};
pub use crate::config::{Config, ConfigOverrides, MalformedPolicy};
pub use crate::engine::{Reconciliation, ReconciliationEngine};
pub use crate::error::SyncError;
pub use crate::events::{
    CollectionFetched, Dispatcher, Event, EventKind, Handler, JobChainSubscriber, Subscriber,
};
pub use crate::files::FileStore;
pub use crate::outcome::{CommandStatus, ExecutionOutcome};
pub use crate::paths::{PathResolver, JOB_CHAIN_SUFFIX};
pub use crate::store_json::JsonFileStore;

pub use chainsync_domain::{
    CreatePayload, Job, JobChainNode, JobId, JobSnapshot, JobStore, MemoryStore, PayloadStatus,
    SchedulerRef, StoreError,
};
