use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use tasky_core::db::LocalStore;
use tasky_core::model::sync_op::{EntityKind, SyncOperation, SyncOperationType};
use tasky_core::sync::processor::LAST_SYNC_AT_SETTING;
use tasky_core::{
    ActionType, Goal, GoalType, LocalActions, NetworkMonitor, NewNote, NewTaskOptions, Note,
    RemoteCollection, RemoteError, RemoteStore, SyncPass, SyncProcessor, SyncQueue, SyncReport,
    Task,
};

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Upsert(RemoteCollection, String, Map<String, Value>),
    Delete(RemoteCollection, String),
}

#[derive(Default)]
struct RecordingRemote {
    calls: Mutex<Vec<Call>>,
    failing_ids: Mutex<HashSet<String>>,
}

impl RecordingRemote {
    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn fail_for(&self, id: &str) {
        self.failing_ids.lock().unwrap().insert(id.to_string());
    }

    fn heal(&self) {
        self.failing_ids.lock().unwrap().clear();
    }

    fn check(&self, id: &str) -> Result<(), RemoteError> {
        if self.failing_ids.lock().unwrap().contains(id) {
            return Err(RemoteError::new("unavailable", "injected failure", true));
        }
        Ok(())
    }
}

impl RemoteStore for RecordingRemote {
    fn upsert_merge(
        &self,
        collection: RemoteCollection,
        id: &str,
        document: &Map<String, Value>,
    ) -> Result<(), RemoteError> {
        self.check(id)?;
        self.calls
            .lock()
            .unwrap()
            .push(Call::Upsert(collection, id.to_string(), document.clone()));
        Ok(())
    }

    fn delete(&self, collection: RemoteCollection, id: &str) -> Result<(), RemoteError> {
        self.check(id)?;
        self.calls
            .lock()
            .unwrap()
            .push(Call::Delete(collection, id.to_string()));
        Ok(())
    }
}

struct Fixture {
    store: Arc<LocalStore>,
    remote: Arc<RecordingRemote>,
    monitor: Arc<NetworkMonitor>,
    processor: SyncProcessor,
    actions: LocalActions,
}

fn fixture() -> Fixture {
    let store = Arc::new(LocalStore::open_in_memory().unwrap());
    let remote = Arc::new(RecordingRemote::default());
    let monitor = Arc::new(NetworkMonitor::new(true));
    let processor = SyncProcessor::new(
        Arc::clone(&store),
        Arc::clone(&remote) as Arc<dyn RemoteStore>,
        Arc::clone(&monitor) as Arc<dyn tasky_core::Connectivity>,
    );
    Fixture {
        actions: LocalActions::new(Arc::clone(&store)),
        store,
        remote,
        monitor,
        processor,
    }
}

fn task(title: &str) -> Task {
    Task::create("user-1", title, "inbox", NewTaskOptions::default(), 1)
}

fn queue_len(store: &Arc<LocalStore>) -> usize {
    SyncQueue::new(Arc::clone(store)).len().unwrap()
}

#[test]
fn operations_are_applied_in_enqueue_order_across_entity_types() {
    let fx = fixture();
    let a = task("A");
    let b = Goal::create("user-1", "B", GoalType::Monthly, 0, 1, 2);
    let c = Note::create("user-1", NewNote::titled("C"), 3);

    fx.actions.perform_local_action(&a, ActionType::Create);
    fx.actions.perform_local_action(&b, ActionType::Create);
    fx.actions.perform_local_action(&c, ActionType::Create);
    fx.actions.perform_local_delete::<Task>(&a.id);

    let pass = fx.processor.process_queue().unwrap();
    assert_eq!(
        pass,
        SyncPass::Drained(SyncReport {
            attempted: 4,
            applied: 4,
            failed: 0,
            skipped: 0,
        })
    );

    let order: Vec<(RemoteCollection, String, bool)> = fx
        .remote
        .calls()
        .into_iter()
        .map(|call| match call {
            Call::Upsert(collection, id, _) => (collection, id, false),
            Call::Delete(collection, id) => (collection, id, true),
        })
        .collect();
    assert_eq!(
        order,
        vec![
            (RemoteCollection::Tasks, a.id.clone(), false),
            (RemoteCollection::Goals, b.id.clone(), false),
            (RemoteCollection::Notes, c.id.clone(), false),
            (RemoteCollection::Tasks, a.id.clone(), true),
        ]
    );
    assert_eq!(queue_len(&fx.store), 0);
    assert!(fx.store.get_setting(LAST_SYNC_AT_SETTING).unwrap().is_some());
}

#[test]
fn empty_queue_makes_no_remote_calls() {
    let fx = fixture();
    assert_eq!(fx.processor.process_queue().unwrap(), SyncPass::Empty);
    assert!(fx.remote.calls().is_empty());
    assert!(fx.store.get_setting(LAST_SYNC_AT_SETTING).unwrap().is_none());
}

#[test]
fn offline_pass_makes_no_remote_calls_and_keeps_queue() {
    let fx = fixture();
    fx.actions.perform_local_action(&task("A"), ActionType::Create);
    fx.monitor.set_online(false);

    assert_eq!(fx.processor.process_queue().unwrap(), SyncPass::Offline);
    assert!(fx.remote.calls().is_empty());
    assert_eq!(queue_len(&fx.store), 1);
}

#[test]
fn unavailable_store_skips_the_pass() {
    let remote = Arc::new(RecordingRemote::default());
    let processor = SyncProcessor::new(
        Arc::new(LocalStore::unavailable()),
        Arc::clone(&remote) as Arc<dyn RemoteStore>,
        Arc::new(NetworkMonitor::new(true)),
    );
    assert_eq!(processor.process_queue().unwrap(), SyncPass::StoreUnavailable);
    assert!(remote.calls().is_empty());
}

#[test]
fn failed_operation_stays_queued_and_later_ones_still_run() {
    let fx = fixture();
    let failing = task("flaky");
    let healthy = task("fine");
    fx.actions.perform_local_action(&failing, ActionType::Create);
    fx.actions.perform_local_action(&healthy, ActionType::Create);
    fx.remote.fail_for(&failing.id);

    let first = fx.processor.process_queue().unwrap();
    assert_eq!(
        first,
        SyncPass::Drained(SyncReport {
            attempted: 2,
            applied: 1,
            failed: 1,
            skipped: 0,
        })
    );
    let left: Vec<SyncOperation> = SyncQueue::new(Arc::clone(&fx.store)).pending().unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].entity_id, failing.id);
    assert_eq!(left[0].retry_count, 0);

    fx.remote.heal();
    let second = fx.processor.process_queue().unwrap();
    assert!(matches!(second, SyncPass::Drained(report) if report.applied == 1));
    assert_eq!(queue_len(&fx.store), 0);
}

#[test]
fn unknown_entity_kind_is_skipped_and_dropped() {
    let fx = fixture();
    fx.store
        .put(&SyncOperation {
            id: "op-unknown".to_string(),
            op_type: SyncOperationType::Create,
            entity: EntityKind::Unknown,
            entity_id: "x".to_string(),
            payload: Map::new(),
            timestamp: 1,
            retry_count: 0,
        })
        .unwrap();

    let pass = fx.processor.process_queue().unwrap();
    assert!(matches!(pass, SyncPass::Drained(report) if report.skipped == 1));
    assert!(fx.remote.calls().is_empty());
    assert_eq!(queue_len(&fx.store), 0);
}

#[test]
fn unset_optional_fields_are_uploaded_as_null() {
    let fx = fixture();
    let record = task("plain");
    fx.actions.perform_local_action(&record, ActionType::Create);
    fx.processor.process_queue().unwrap();

    let Call::Upsert(_, _, document) = &fx.remote.calls()[0] else {
        panic!("expected upsert");
    };
    for field in ["parentId", "dueDate", "repeat", "goalId", "note", "completedAt"] {
        assert_eq!(document.get(field), Some(&Value::Null), "{field}");
    }
    assert_eq!(document.get("title"), Some(&Value::from("plain")));
}

struct BlockingRemote {
    entered: Mutex<Sender<()>>,
    release: Mutex<Receiver<()>>,
}

impl RemoteStore for BlockingRemote {
    fn upsert_merge(
        &self,
        _collection: RemoteCollection,
        _id: &str,
        _document: &Map<String, Value>,
    ) -> Result<(), RemoteError> {
        self.entered.lock().unwrap().send(()).unwrap();
        self.release.lock().unwrap().recv().unwrap();
        Ok(())
    }

    fn delete(&self, _collection: RemoteCollection, _id: &str) -> Result<(), RemoteError> {
        Ok(())
    }
}

#[test]
fn second_pass_during_a_drain_is_rejected() {
    let store = Arc::new(LocalStore::open_in_memory().unwrap());
    LocalActions::new(Arc::clone(&store)).perform_local_action(&task("slow"), ActionType::Create);

    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let remote = BlockingRemote {
        entered: Mutex::new(entered_tx),
        release: Mutex::new(release_rx),
    };
    let processor = Arc::new(SyncProcessor::new(
        Arc::clone(&store),
        Arc::new(remote),
        Arc::new(NetworkMonitor::new(true)),
    ));

    let worker = {
        let processor = Arc::clone(&processor);
        thread::spawn(move || processor.process_queue().unwrap())
    };
    entered_rx.recv().unwrap();

    assert!(processor.is_running());
    assert_eq!(processor.process_queue().unwrap(), SyncPass::AlreadyRunning);

    release_tx.send(()).unwrap();
    let first = worker.join().unwrap();
    assert!(matches!(first, SyncPass::Drained(report) if report.applied == 1));
    assert!(!processor.is_running());
}

#[test]
fn undecodable_queue_row_does_not_block_valid_operations() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tasky.sqlite3");
    let store = Arc::new(LocalStore::open(&path).unwrap());
    let remote = Arc::new(RecordingRemote::default());
    let processor = SyncProcessor::new(
        Arc::clone(&store),
        Arc::clone(&remote) as Arc<dyn RemoteStore>,
        Arc::new(NetworkMonitor::new(true)),
    );
    let good = task("good");
    LocalActions::new(Arc::clone(&store)).perform_local_action(&good, ActionType::Create);

    let raw = rusqlite::Connection::open(&path).unwrap();
    raw.execute(
        "INSERT INTO sync_queue (id, timestamp, body) VALUES ('future-op', 0, ?1)",
        [r#"{"id":"future-op","type":"PATCH","entity":"TASK","entityId":"x","payload":{},"timestamp":0,"retryCount":0}"#],
    )
    .unwrap();
    raw.execute(
        "INSERT INTO sync_queue (id, timestamp, body) VALUES ('corrupt-op', 1, 'not json')",
        [],
    )
    .unwrap();
    drop(raw);

    let pass = processor.process_queue().unwrap();
    assert!(matches!(
        pass,
        SyncPass::Drained(report) if report.applied == 1 && report.failed == 0
    ));
    assert_eq!(
        upserted_ids(&remote),
        vec![good.id.clone()],
        "the valid operation is uploaded"
    );
    // Unreadable rows stay for a build that understands them.
    assert_eq!(queue_len(&store), 2);
    assert_eq!(processor.process_queue().unwrap(), SyncPass::Empty);
}

fn upserted_ids(remote: &RecordingRemote) -> Vec<String> {
    remote
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            Call::Upsert(_, id, _) => Some(id),
            Call::Delete(..) => None,
        })
        .collect()
}
