#![deny(clippy::all)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]

pub mod job;
pub mod store;

pub use job::{Job, JobChainNode, JobId, SchedulerRef};
pub use store::{
    CreatePayload, JobSnapshot, JobStore, JobTable, MemoryStore, PayloadStatus, StoreError,
};
