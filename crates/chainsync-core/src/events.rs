//! Event routing from the store layer to the reconciliation engine.
//!
//! Subscribers publish a static table of `(event kind, handler)` pairs; a
//! [`Dispatcher`] reads that table once when the subscriber is registered and
//! routes every dispatched event to the matching handlers in registration
//! order.

use std::fmt;
use std::sync::Arc;

use chainsync_domain::{Job, PayloadStatus, SchedulerRef};
use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::engine::ReconciliationEngine;
use crate::error::SyncError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    CreatePost,
    FetchPost,
    UpdateValid,
    DeletePost,
    CollectionFetchPost,
    CollectionFetchError,
}

impl EventKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreatePost => "job_chain.create.post",
            Self::FetchPost => "job_chain.fetch.post",
            Self::UpdateValid => "job_chain.update.valid",
            Self::DeletePost => "job_chain.delete.post",
            Self::CollectionFetchPost => "job_chain_collection.fetch.post",
            Self::CollectionFetchError => "job_chain_collection.fetch.error",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Collection fetch context. Handlers rewrite `rows` and `status` in place.
#[derive(Debug, Clone)]
pub struct CollectionFetched {
    pub scheduler: SchedulerRef,
    pub rows: Vec<Job>,
    pub status: PayloadStatus,
}

#[derive(Debug, Clone)]
pub enum Event {
    RecordCreatedOrFetched(Job),
    RecordUpdateValidated(Job),
    RecordDeleted(Job),
    CollectionFetched(CollectionFetched),
}

impl Event {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::RecordCreatedOrFetched(_) => "record-created-or-fetched",
            Self::RecordUpdateValidated(_) => "record-update-validated",
            Self::RecordDeleted(_) => "record-deleted",
            Self::CollectionFetched(_) => "collection-fetched",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    OnCreate,
    OnUpdate,
    OnDelete,
    OnCollectionFetch,
}

impl Handler {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OnCreate => "on_create",
            Self::OnUpdate => "on_update",
            Self::OnDelete => "on_delete",
            Self::OnCollectionFetch => "on_collection_fetch",
        }
    }
}

pub trait Subscriber: Send + Sync {
    fn subscribed_events(&self) -> &'static [(EventKind, Handler)];

    fn handle(&self, handler: Handler, event: &mut Event) -> Result<(), SyncError>;
}

struct Route {
    handler: Handler,
    subscriber: Arc<dyn Subscriber>,
}

#[derive(Default)]
pub struct Dispatcher {
    routes: IndexMap<EventKind, Vec<Route>>,
}

impl Dispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, subscriber: Arc<dyn Subscriber>) {
        for &(kind, handler) in subscriber.subscribed_events() {
            trace!(event = %kind, handler = handler.as_str(), "registered handler");
            self.routes.entry(kind).or_default().push(Route {
                handler,
                subscriber: Arc::clone(&subscriber),
            });
        }
    }

    #[must_use]
    pub fn has_listeners(&self, kind: EventKind) -> bool {
        self.routes.get(&kind).is_some_and(|routes| !routes.is_empty())
    }

    /// Runs every handler registered for `kind`, stopping at the first error.
    /// Returns how many handlers ran.
    pub fn dispatch(&self, kind: EventKind, event: &mut Event) -> Result<usize, SyncError> {
        let Some(routes) = self.routes.get(&kind) else {
            debug!(event = %kind, "no handlers registered");
            return Ok(0);
        };
        for route in routes {
            debug!(event = %kind, handler = route.handler.as_str(), "dispatching");
            route.subscriber.handle(route.handler, event)?;
        }
        Ok(routes.len())
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (kind, routes) in &self.routes {
            let handlers: Vec<_> = routes.iter().map(|route| route.handler.as_str()).collect();
            map.entry(&kind.as_str(), &handlers);
        }
        map.finish()
    }
}

/// Keeps the live folder in step with job chain events.
pub struct JobChainSubscriber {
    engine: ReconciliationEngine,
}

impl JobChainSubscriber {
    const SUBSCRIPTIONS: &'static [(EventKind, Handler)] = &[
        (EventKind::CreatePost, Handler::OnCreate),
        (EventKind::FetchPost, Handler::OnCreate),
        (EventKind::UpdateValid, Handler::OnUpdate),
        (EventKind::DeletePost, Handler::OnDelete),
        (EventKind::CollectionFetchError, Handler::OnCollectionFetch),
        (EventKind::CollectionFetchPost, Handler::OnCollectionFetch),
    ];

    #[must_use]
    pub fn new(engine: ReconciliationEngine) -> Self {
        Self { engine }
    }

    #[must_use]
    pub fn engine(&self) -> &ReconciliationEngine {
        &self.engine
    }

    fn on_update(&self, job: &Job) -> Result<(), SyncError> {
        let original_name = self
            .engine
            .store()
            .original_fields(job)
            .map_or_else(|| job.name.clone(), |snapshot| snapshot.name);
        self.engine.on_update(job, &original_name)
    }

    /// Rewrites rows and status only once reconciliation succeeded.
    fn on_collection_fetch(&self, fetched: &mut CollectionFetched) -> Result<(), SyncError> {
        let result = self.engine.on_collection_fetch(
            &fetched.scheduler,
            fetched.rows.clone(),
            fetched.status,
        )?;
        fetched.rows = result.jobs;
        fetched.status = result.status;
        Ok(())
    }
}

impl Subscriber for JobChainSubscriber {
    fn subscribed_events(&self) -> &'static [(EventKind, Handler)] {
        Self::SUBSCRIPTIONS
    }

    fn handle(&self, handler: Handler, event: &mut Event) -> Result<(), SyncError> {
        match (handler, event) {
            (Handler::OnCreate, Event::RecordCreatedOrFetched(job)) => {
                self.engine.on_create(job).map(drop)
            }
            (Handler::OnUpdate, Event::RecordUpdateValidated(job)) => self.on_update(job),
            (Handler::OnDelete, Event::RecordDeleted(job)) => self.engine.on_delete(job),
            (Handler::OnCollectionFetch, Event::CollectionFetched(fetched)) => {
                self.on_collection_fetch(fetched)
            }
            (handler, event) => Err(SyncError::UnexpectedEvent {
                handler: handler.as_str(),
                event: event.name(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::CodecRegistry;
    use crate::config::Config;
    use camino::Utf8PathBuf;
    use chainsync_domain::{JobStore, MemoryStore};

    fn dispatcher(store: Arc<MemoryStore>) -> (tempfile::TempDir, Utf8PathBuf, Dispatcher) {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf-8 tempdir");
        let engine =
            ReconciliationEngine::new(&Config::new(root.clone()), CodecRegistry::with_defaults(), store);
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(Arc::new(JobChainSubscriber::new(engine)));
        (temp, root, dispatcher)
    }

    #[test]
    fn registers_every_subscribed_event() {
        let (_temp, _root, dispatcher) = dispatcher(Arc::new(MemoryStore::new()));
        for kind in [
            EventKind::CreatePost,
            EventKind::FetchPost,
            EventKind::UpdateValid,
            EventKind::DeletePost,
            EventKind::CollectionFetchPost,
            EventKind::CollectionFetchError,
        ] {
            assert!(dispatcher.has_listeners(kind), "{kind}");
        }
    }

    #[test]
    fn fetch_post_materializes_file() {
        let (_temp, root, dispatcher) = dispatcher(Arc::new(MemoryStore::new()));
        let mut event = Event::RecordCreatedOrFetched(Job::new("nightly", "sched1"));
        let ran = dispatcher
            .dispatch(EventKind::FetchPost, &mut event)
            .expect("dispatch");
        assert_eq!(ran, 1);
        assert!(root.join("sched1").join("nightly.job_chain.xml").exists());
    }

    #[test]
    fn update_valid_uses_persisted_name_to_detect_rename() {
        let store = Arc::new(MemoryStore::with_jobs([Job::new("old", "sched1")]));
        let (_temp, root, dispatcher) = dispatcher(store.clone());
        let mut job = store.list("sched1").expect("rows").remove(0);

        dispatcher
            .dispatch(EventKind::CreatePost, &mut Event::RecordCreatedOrFetched(job.clone()))
            .expect("create");
        job.name = "new".into();
        dispatcher
            .dispatch(EventKind::UpdateValid, &mut Event::RecordUpdateValidated(job))
            .expect("update");

        let scope = root.join("sched1");
        assert!(!scope.join("old.job_chain.xml").exists());
        assert!(scope.join("new.job_chain.xml").exists());
    }

    #[test]
    fn collection_fetch_error_rewrites_outcome_and_rows() {
        let store = Arc::new(MemoryStore::new());
        let (_temp, root, dispatcher) = dispatcher(store.clone());
        std::fs::create_dir_all(root.join("sched1")).expect("scope dir");
        std::fs::write(
            root.join("sched1").join("found.job_chain.xml"),
            "<job_chain title=\"on disk\"/>",
        )
        .expect("seed orphan");

        let mut event = Event::CollectionFetched(CollectionFetched {
            scheduler: SchedulerRef::new("sched1"),
            rows: Vec::new(),
            status: PayloadStatus::NotFound,
        });
        dispatcher
            .dispatch(EventKind::CollectionFetchError, &mut event)
            .expect("dispatch");

        let Event::CollectionFetched(fetched) = event else {
            panic!("event kind changed");
        };
        assert_eq!(fetched.status, PayloadStatus::Found);
        assert_eq!(fetched.rows.len(), 1);
        assert_eq!(fetched.rows[0].title.as_deref(), Some("on disk"));
        assert_eq!(store.list("sched1").expect("rows").len(), 1);
    }

    #[test]
    fn mismatched_event_shape_is_rejected() {
        let (_temp, _root, dispatcher) = dispatcher(Arc::new(MemoryStore::new()));
        let mut event = Event::RecordDeleted(Job::new("nightly", "sched1"));
        let err = dispatcher
            .dispatch(EventKind::CreatePost, &mut event)
            .expect_err("mismatch");
        assert!(matches!(err, SyncError::UnexpectedEvent { .. }), "{err}");
    }

    #[test]
    fn failed_collection_fetch_leaves_event_untouched() {
        let store = Arc::new(MemoryStore::with_jobs([Job::new("a", "sched1")]));
        let (_temp, root, dispatcher) = dispatcher(store.clone());
        std::fs::create_dir_all(root.join("sched1")).expect("scope dir");
        std::fs::write(
            root.join("sched1").join("broken.job_chain.xml"),
            "<job_chain max_orders=\"many\"/>",
        )
        .expect("seed malformed");

        let rows = store.list("sched1").expect("rows");
        let mut event = Event::CollectionFetched(CollectionFetched {
            scheduler: SchedulerRef::new("sched1"),
            rows: rows.clone(),
            status: PayloadStatus::Found,
        });
        let err = dispatcher
            .dispatch(EventKind::CollectionFetchPost, &mut event)
            .expect_err("malformed orphan aborts");
        assert!(matches!(err, SyncError::Decode { .. }), "{err}");

        let Event::CollectionFetched(fetched) = event else {
            panic!("event kind changed");
        };
        assert_eq!(fetched.status, PayloadStatus::Found);
        let names: Vec<_> = fetched.rows.iter().map(|job| job.name.as_str()).collect();
        assert_eq!(names, ["a"]);
        assert_eq!(fetched.rows[0].id, rows[0].id);
    }
}
