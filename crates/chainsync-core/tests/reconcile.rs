use std::collections::BTreeSet;
use std::fs;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use chainsync_core::{
    CodecRegistry, CollectionFetched, Config, Dispatcher, Event, EventKind, Job,
    JobChainNode, JobChainSubscriber, JobChainXmlCodec, JobStore, JsonFileStore, PayloadStatus,
    RecordCodec, ReconciliationEngine, SchedulerRef,
};

struct LiveFolder {
    _temp: tempfile::TempDir,
    root: Utf8PathBuf,
    store_path: Utf8PathBuf,
}

impl LiveFolder {
    fn new() -> Self {
        let temp = tempfile::tempdir().expect("tempdir");
        let base = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf-8 tempdir");
        Self {
            root: base.join("live"),
            store_path: base.join("store.json"),
            _temp: temp,
        }
    }

    fn scope(&self, scheduler: &str) -> Utf8PathBuf {
        self.root.join(scheduler)
    }

    fn wire(&self) -> (Arc<JsonFileStore>, Dispatcher) {
        let store = Arc::new(JsonFileStore::open(&self.store_path).expect("open store"));
        let engine = ReconciliationEngine::new(
            &Config::new(self.root.clone()),
            CodecRegistry::with_defaults(),
            store.clone(),
        );
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(Arc::new(JobChainSubscriber::new(engine)));
        (store, dispatcher)
    }
}

fn files_in(dir: &Utf8Path) -> BTreeSet<String> {
    fs::read_dir(dir)
        .expect("read scope")
        .map(|entry| {
            entry
                .expect("entry")
                .file_name()
                .into_string()
                .expect("utf-8 name")
        })
        .collect()
}

fn fetch(dispatcher: &Dispatcher, store: &dyn JobStore, scheduler: &str) -> CollectionFetched {
    let rows = store.list(scheduler).expect("rows");
    let (kind, status) = if rows.is_empty() {
        (EventKind::CollectionFetchError, PayloadStatus::NotFound)
    } else {
        (EventKind::CollectionFetchPost, PayloadStatus::Found)
    };
    let mut event = Event::CollectionFetched(CollectionFetched {
        scheduler: SchedulerRef::new(scheduler),
        rows,
        status,
    });
    dispatcher.dispatch(kind, &mut event).expect("dispatch");
    match event {
        Event::CollectionFetched(fetched) => fetched,
        other => panic!("unexpected event {}", other.name()),
    }
}

#[test]
fn rows_and_orphans_converge_and_persist() {
    let live = LiveFolder::new();
    let (store, dispatcher) = live.wire();
    for name in ["A", "B"] {
        let payload = store.create(Job::new(name, "sched1"));
        assert_eq!(payload.status, PayloadStatus::Created);
    }
    let scope = live.scope("sched1");
    fs::create_dir_all(&scope).expect("scope dir");
    fs::write(scope.join("B.job_chain.xml"), "<job_chain/>").expect("seed B");
    let orphan = Job::default()
        .with_title("Imported")
        .with_node(JobChainNode::step("1", "copy", "done", "done"))
        .with_node(JobChainNode::end("done"));
    fs::write(
        scope.join("C.job_chain.xml"),
        JobChainXmlCodec.encode(&orphan).expect("encode"),
    )
    .expect("seed C");

    let fetched = fetch(&dispatcher, &*store, "sched1");
    let names: Vec<_> = fetched.rows.iter().map(|job| job.name.as_str()).collect();
    assert_eq!(names, ["A", "B", "C"]);
    assert_eq!(fetched.status, PayloadStatus::Found);
    assert_eq!(
        files_in(&scope),
        BTreeSet::from([
            "A.job_chain.xml".to_string(),
            "B.job_chain.xml".to_string(),
            "C.job_chain.xml".to_string(),
        ])
    );

    drop(dispatcher);
    let reopened = JsonFileStore::open(&live.store_path).expect("reopen");
    let imported = reopened
        .list("sched1")
        .expect("rows")
        .into_iter()
        .find(|job| job.name == "C")
        .expect("C persisted");
    assert_eq!(imported.title.as_deref(), Some("Imported"));
    assert_eq!(imported.nodes.len(), 2);
}

#[test]
fn scenario_create_then_rename_then_delete() {
    let live = LiveFolder::new();
    let (store, dispatcher) = live.wire();
    let created = store
        .create(Job::new("nightly", "sched1").with_title("v1"))
        .job
        .expect("created");
    let path = live.scope("sched1").join("nightly.job_chain.xml");

    dispatcher
        .dispatch(EventKind::CreatePost, &mut Event::RecordCreatedOrFetched(created.clone()))
        .expect("create event");
    let first = fs::read_to_string(&path).expect("written");

    let mut mutated = created.clone();
    mutated.title = Some("v2".into());
    dispatcher
        .dispatch(EventKind::FetchPost, &mut Event::RecordCreatedOrFetched(mutated))
        .expect("fetch event");
    assert_eq!(fs::read_to_string(&path).expect("still there"), first);

    let mut renamed = created;
    renamed.name = "nightly-v2".into();
    renamed.title = Some("v2".into());
    dispatcher
        .dispatch(EventKind::UpdateValid, &mut Event::RecordUpdateValidated(renamed.clone()))
        .expect("update event");
    store.update(&renamed).expect("persist rename");
    assert!(!path.exists());
    let moved = live.scope("sched1").join("nightly-v2.job_chain.xml");
    assert!(fs::read_to_string(&moved).expect("moved").contains("title=\"v2\""));

    let removed = store.delete(renamed.id.expect("id")).expect("delete row");
    dispatcher
        .dispatch(EventKind::DeletePost, &mut Event::RecordDeleted(removed.clone()))
        .expect("delete event");
    dispatcher
        .dispatch(EventKind::DeletePost, &mut Event::RecordDeleted(removed))
        .expect("delete event again");
    assert!(files_in(&live.scope("sched1")).is_empty());
}

#[test]
fn second_fetch_is_stable() {
    let live = LiveFolder::new();
    let (store, dispatcher) = live.wire();
    let scope = live.scope("sched1");
    fs::create_dir_all(&scope).expect("scope dir");
    fs::write(scope.join("only.job_chain.xml"), "<job_chain/>").expect("seed");

    let first = fetch(&dispatcher, &*store, "sched1");
    let second = fetch(&dispatcher, &*store, "sched1");
    assert_eq!(first.rows.len(), 1);
    assert_eq!(second.rows.len(), 1);
    assert_eq!(first.rows[0].id, second.rows[0].id);
    assert_eq!(store.list("sched1").expect("rows").len(), 1);
}
