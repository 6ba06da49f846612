use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity assigned by the store when a job chain is first persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Reference to the scheduler that owns a job chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SchedulerRef {
    pub name: String,
}

impl SchedulerRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// One step of a job chain. Nodes without a job are end states.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobChainNode {
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<u32>,
}

impl JobChainNode {
    pub fn step(
        state: impl Into<String>,
        job: impl Into<String>,
        next_state: impl Into<String>,
        error_state: impl Into<String>,
    ) -> Self {
        Self {
            state: state.into(),
            job: Some(job.into()),
            next_state: Some(next_state.into()),
            error_state: Some(error_state.into()),
            delay: None,
        }
    }

    pub fn end(state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            ..Self::default()
        }
    }

    pub fn is_end(&self) -> bool {
        self.job.is_none()
    }
}

/// A job chain record as owned by the store.
///
/// `name` and `scheduler` locate the record; everything else is payload that
/// only the codec looks at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<JobId>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduler: Option<SchedulerRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default = "default_true")]
    pub orders_recoverable: bool,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub distributed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_orders: Option<u32>,
    #[serde(default)]
    pub nodes: Vec<JobChainNode>,
}

fn default_true() -> bool {
    true
}

impl Default for Job {
    fn default() -> Self {
        Self {
            id: None,
            name: String::new(),
            scheduler: None,
            title: None,
            orders_recoverable: true,
            visible: true,
            distributed: false,
            max_orders: None,
            nodes: Vec::new(),
        }
    }
}

impl Job {
    pub fn new(name: impl Into<String>, scheduler: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scheduler: Some(SchedulerRef::new(scheduler)),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn with_node(mut self, node: JobChainNode) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn scheduler_name(&self) -> Option<&str> {
        self.scheduler.as_ref().map(|scheduler| scheduler.name.as_str())
    }

    pub fn belongs_to(&self, scheduler: &str) -> bool {
        self.scheduler_name() == Some(scheduler)
    }
}
