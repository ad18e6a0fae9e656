use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tasky_core::config::DEFAULT_SYNC_INTERVAL;
use tasky_core::{
    logging_status, BackRef, ConfigError, CoreConfig, GoalType, LoggingError, MemoryRemoteStore,
    NetworkMonitor, NewNote, NewTaskOptions, RemoteCollection, RemoteStore, SyncPass, TaskyCore,
};

fn open_core(dir: &tempfile::TempDir) -> (TaskyCore, Arc<MemoryRemoteStore>) {
    open_core_with(&CoreConfig::in_data_dir(dir.path()))
}

fn open_core_with(config: &CoreConfig) -> (TaskyCore, Arc<MemoryRemoteStore>) {
    let remote = Arc::new(MemoryRemoteStore::new());
    let core = TaskyCore::open(
        config,
        Arc::clone(&remote) as Arc<dyn RemoteStore>,
        Arc::new(NetworkMonitor::new(true)),
    )
    .unwrap();
    (core, remote)
}

#[test]
fn mutations_survive_restart_and_sync_to_remote() {
    let dir = tempfile::tempdir().unwrap();
    let (mut core, remote) = open_core(&dir);
    core.load_all();

    let goal = core.goals_mut().add("Fitness", GoalType::Monthly, 0, 1);
    let task = core.tasks_mut().add(
        "Run",
        None,
        NewTaskOptions {
            goal_id: Some(goal.id.clone()),
            ..NewTaskOptions::default()
        },
    );
    let note = core.notes_mut().add(NewNote {
        task_id: Some(task.id.clone()),
        ..NewNote::titled("Route")
    });

    let pass = core.trigger_sync().unwrap();
    assert!(matches!(pass, SyncPass::Drained(report) if report.applied == 3));
    assert!(remote.document(RemoteCollection::Tasks, &task.id).is_some());
    assert!(core.last_sync_at().unwrap().is_some());
    drop(core);

    let (mut reopened, _remote) = open_core(&dir);
    reopened.load_all();
    assert_eq!(reopened.tasks().len(), 1);
    assert_eq!(reopened.goals().len(), 1);
    assert_eq!(reopened.notes().len(), 1);

    let task = reopened.tasks().get(&task.id).unwrap();
    assert!(matches!(reopened.goal_of(task), BackRef::Resolved(found) if found.id == goal.id));
    let note = reopened.notes().get(&note.id).unwrap();
    assert!(matches!(reopened.task_of(note), BackRef::Resolved(found) if found.id == task.id));
}

#[test]
fn headless_config_runs_without_storage() {
    let remote: Arc<dyn RemoteStore> = Arc::new(MemoryRemoteStore::new());
    let mut core = TaskyCore::open(
        &CoreConfig::default(),
        remote,
        Arc::new(NetworkMonitor::new(true)),
    )
    .unwrap();

    assert!(!core.store().is_available());
    let task = core
        .tasks_mut()
        .add("Ephemeral", None, NewTaskOptions::default());
    assert!(core.tasks().get(&task.id).is_some());
    assert_eq!(core.trigger_sync().unwrap(), SyncPass::StoreUnavailable);
    assert_eq!(core.last_sync_at().unwrap(), None);
}

#[test]
fn signed_in_user_owns_new_records() {
    let dir = tempfile::tempdir().unwrap();
    let (mut core, _remote) = open_core(&dir);
    core.session().set_user("user-42");

    let task = core.tasks_mut().add("Mine", None, NewTaskOptions::default());
    assert_eq!(task.user_id, "user-42");

    core.session().clear_user();
    let task = core.tasks_mut().add("Guest", None, NewTaskOptions::default());
    assert_eq!(task.user_id, "guest");
}

#[test]
fn background_scheduler_uploads_new_edits() {
    let dir = tempfile::tempdir().unwrap();
    let (mut core, remote) = open_core_with(&CoreConfig {
        sync_interval_ms: 20,
        ..CoreConfig::in_data_dir(dir.path())
    });
    assert_eq!(core.sync_interval(), Duration::from_millis(20));
    core.start_sync_scheduler().unwrap();
    core.start_sync_scheduler().unwrap();

    let task = core.tasks_mut().add("Background", None, NewTaskOptions::default());

    let deadline = Instant::now() + Duration::from_secs(5);
    while remote.document(RemoteCollection::Tasks, &task.id).is_none()
        && Instant::now() < deadline
    {
        thread::sleep(Duration::from_millis(10));
    }
    assert!(remote.document(RemoteCollection::Tasks, &task.id).is_some());

    core.stop_sync_scheduler();
    assert!(core.scheduler().is_none());
}

#[test]
fn database_file_lands_in_the_data_dir() {
    let dir = tempfile::tempdir().unwrap();
    let (mut core, _remote) = open_core(&dir);
    core.tasks_mut().add("On disk", None, NewTaskOptions::default());

    assert!(core.store().is_available());
    assert!(dir.path().join(tasky_core::config::DB_FILE_NAME).is_file());
    assert_eq!(core.sync_interval(), DEFAULT_SYNC_INTERVAL);
}

#[test]
fn open_starts_logging_from_config() {
    let data = tempfile::tempdir().unwrap();
    let logs = tempfile::tempdir().unwrap();
    let config = CoreConfig {
        log_level: "warn".to_string(),
        log_dir: Some(logs.path().to_path_buf()),
        ..CoreConfig::in_data_dir(data.path())
    };

    let (_core, _remote) = open_core_with(&config);
    let (level, dir) = logging_status().unwrap();
    assert_eq!(level, "warn");
    assert_eq!(dir, logs.path());

    let relocated = CoreConfig {
        log_dir: Some(data.path().join("elsewhere")),
        ..config
    };
    let rejected = TaskyCore::open(
        &relocated,
        Arc::new(MemoryRemoteStore::new()) as Arc<dyn RemoteStore>,
        Arc::new(NetworkMonitor::new(true)),
    );
    assert!(matches!(
        rejected,
        Err(ConfigError::Logging(LoggingError::AlreadyInitialized { .. }))
    ));
}
